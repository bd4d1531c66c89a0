//! AWS Amplify resource schemas

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// AWS::Amplify::App
pub fn app_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Amplify::App")
        .with_description("Hosted frontend application")
        .attribute(AttributeSchema::new("name", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("build_spec", types::non_empty_string())
                .with_description("Build specification (YAML)"),
        )
        .attribute(
            AttributeSchema::new(
                "environment_variables",
                AttributeType::List(Box::new(AttributeType::Map(Box::new(AttributeType::String)))),
            )
            .with_description("Build-time environment variables as Name/Value pairs"),
        )
        .attribute(
            AttributeSchema::new("repository", types::non_empty_string())
                .with_description("Git repository URL"),
        )
        .attribute(
            AttributeSchema::new("oauth_token", types::non_empty_string())
                .with_description("Token used to register the repository webhook"),
        )
        .attribute(
            AttributeSchema::new("iam_service_role", AttributeType::String)
                .with_provider_name("IAMServiceRole"),
        )
}

const STAGES: &[&str] = &[
    "PRODUCTION",
    "BETA",
    "DEVELOPMENT",
    "EXPERIMENTAL",
    "PULL_REQUEST",
];

/// AWS::Amplify::Branch
pub fn branch_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Amplify::Branch")
        .attribute(AttributeSchema::new("app_id", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("branch_name", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("enable_auto_build", AttributeType::Bool))
        .attribute(AttributeSchema::new(
            "stage",
            AttributeType::Enum(STAGES.iter().map(|s| s.to_string()).collect()),
        ))
}
