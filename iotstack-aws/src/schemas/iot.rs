//! AWS IoT resource schemas

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const CERTIFICATE_STATUS: &[&str] = &[
    "ACTIVE",
    "INACTIVE",
    "REVOKED",
    "PENDING_TRANSFER",
    "PENDING_ACTIVATION",
];

const CERTIFICATE_MODE: &[&str] = &["DEFAULT", "SNI_ONLY"];

fn enum_of(values: &[&str]) -> AttributeType {
    AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
}

/// AWS::IoT::Thing
pub fn thing_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IoT::Thing")
        .with_description("A device registered in the IoT thing registry")
        .attribute(
            AttributeSchema::new("thing_name", types::resource_name())
                .with_description("Name of the thing"),
        )
        .attribute(
            AttributeSchema::new("attribute_payload", AttributeType::Document)
                .with_description("Searchable thing attributes"),
        )
}

/// AWS::IoT::Certificate
pub fn certificate_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IoT::Certificate")
        .with_description("X.509 certificate minted from a certificate signing request")
        .attribute(AttributeSchema::new("status", enum_of(CERTIFICATE_STATUS)).required())
        .attribute(AttributeSchema::new("certificate_mode", enum_of(CERTIFICATE_MODE)))
        .attribute(
            AttributeSchema::new("certificate_signing_request", types::non_empty_string())
                .with_description("PEM-encoded certificate signing request"),
        )
        .attribute(AttributeSchema::new("certificate_pem", types::non_empty_string()))
        .attribute(AttributeSchema::new("ca_certificate_pem", types::non_empty_string()))
}

/// AWS::IoT::Policy
pub fn policy_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IoT::Policy")
        .with_description("Permissions granted to principals attached to it")
        .attribute(AttributeSchema::new("policy_name", types::resource_name()))
        .attribute(AttributeSchema::new("policy_document", AttributeType::Document).required())
}

/// AWS::IoT::PolicyPrincipalAttachment
pub fn policy_principal_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IoT::PolicyPrincipalAttachment")
        .with_description("Grants a policy to a principal (certificate ARN)")
        .attribute(AttributeSchema::new("policy_name", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("principal", types::non_empty_string()).required())
}

/// AWS::IoT::ThingPrincipalAttachment
pub fn thing_principal_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IoT::ThingPrincipalAttachment")
        .with_description("Binds a principal (certificate ARN) to a thing")
        .attribute(AttributeSchema::new("thing_name", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("principal", types::non_empty_string()).required())
}
