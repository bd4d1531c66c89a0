//! AWS Lambda resource schemas

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// AWS::Lambda::Function
pub fn function_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Lambda::Function")
        .attribute(
            AttributeSchema::new("code", AttributeType::Document)
                .required()
                .with_description("Inline source (ZipFile) or an S3 location"),
        )
        .attribute(AttributeSchema::new("role", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("runtime", types::non_empty_string()))
        .attribute(AttributeSchema::new("handler", types::non_empty_string()))
        .attribute(AttributeSchema::new("timeout", types::positive_int()))
        .attribute(AttributeSchema::new("description", AttributeType::String))
}
