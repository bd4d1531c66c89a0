//! Schema of the SDK-call custom resource
//!
//! The engine invokes the function behind `service_token`, which performs
//! the named API call and returns the response fields as attributes.

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

pub const AWS_SDK_CALL_TYPE: &str = "Custom::AWS";

/// Custom::AWS
pub fn aws_sdk_call_schema() -> ResourceSchema {
    ResourceSchema::new(AWS_SDK_CALL_TYPE)
        .with_description("Provider API call performed at provisioning time")
        .attribute(AttributeSchema::new("service_token", types::non_empty_string()).required())
        .attribute(
            AttributeSchema::new("service", types::non_empty_string())
                .required()
                .with_description("SDK client name (e.g., iot)"),
        )
        .attribute(
            AttributeSchema::new("action", types::non_empty_string())
                .required()
                .with_description("SDK method name (e.g., describe_endpoint)"),
        )
        .attribute(
            AttributeSchema::new("parameters", AttributeType::String)
                .with_description("JSON-encoded call parameters"),
        )
        .attribute(AttributeSchema::new("physical_resource_id", AttributeType::String))
}
