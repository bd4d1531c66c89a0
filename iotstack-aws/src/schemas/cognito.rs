//! Amazon Cognito resource schemas

use iotstack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// AWS::Cognito::UserPool
pub fn user_pool_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Cognito::UserPool")
        .with_description("User directory")
        .attribute(AttributeSchema::new("user_pool_name", AttributeType::String))
        .attribute(
            AttributeSchema::new("admin_create_user_config", AttributeType::Document)
                .with_description("Whether users may sign themselves up"),
        )
        .attribute(
            AttributeSchema::new(
                "username_attributes",
                AttributeType::List(Box::new(AttributeType::Enum(vec![
                    "email".to_string(),
                    "phone_number".to_string(),
                ]))),
            )
            .with_description("Attributes accepted as the user name at sign-in"),
        )
        .attribute(AttributeSchema::new("auto_verified_attributes", string_list()))
        .attribute(
            AttributeSchema::new("policies", AttributeType::Document)
                .with_description("Password policy"),
        )
        .attribute(AttributeSchema::new(
            "account_recovery_setting",
            AttributeType::Document,
        ))
}

/// AWS::Cognito::UserPoolClient
pub fn user_pool_client_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Cognito::UserPoolClient")
        .attribute(AttributeSchema::new("user_pool_id", types::non_empty_string()).required())
        .attribute(AttributeSchema::new("client_name", AttributeType::String))
        .attribute(AttributeSchema::new("generate_secret", AttributeType::Bool))
        .attribute(AttributeSchema::new("explicit_auth_flows", string_list()))
        .attribute(AttributeSchema::new("supported_identity_providers", string_list()))
}

/// AWS::Cognito::IdentityPool
pub fn identity_pool_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Cognito::IdentityPool")
        .with_description("Federates directory identities into temporary credentials")
        .attribute(AttributeSchema::new("identity_pool_name", AttributeType::String))
        .attribute(
            AttributeSchema::new("allow_unauthenticated_identities", AttributeType::Bool)
                .required(),
        )
        .attribute(AttributeSchema::new(
            "cognito_identity_providers",
            AttributeType::List(Box::new(AttributeType::Map(Box::new(AttributeType::String)))),
        ))
}

/// AWS::Cognito::IdentityPoolRoleAttachment
pub fn identity_pool_role_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("AWS::Cognito::IdentityPoolRoleAttachment")
        .attribute(AttributeSchema::new("identity_pool_id", types::non_empty_string()).required())
        .attribute(AttributeSchema::new(
            "roles",
            AttributeType::Map(Box::new(AttributeType::String)),
        ))
        .attribute(
            AttributeSchema::new("role_mappings", AttributeType::Document)
                .with_description("Per-provider role mapping rules"),
        )
}
