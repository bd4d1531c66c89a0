//! AWS IAM resource schemas

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// AWS::IAM::Role
pub fn role_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::IAM::Role")
        .attribute(
            AttributeSchema::new("assume_role_policy_document", AttributeType::Document)
                .required()
                .with_description("Trust policy naming who may assume the role"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(AttributeSchema::new(
            "managed_policy_arns",
            AttributeType::List(Box::new(AttributeType::String)),
        ))
        .attribute(
            AttributeSchema::new(
                "policies",
                AttributeType::List(Box::new(AttributeType::Document)),
            )
            .with_description("Inline policies"),
        )
}
