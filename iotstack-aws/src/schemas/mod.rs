//! CloudFormation resource schemas
//!
//! Attribute names are snake_case; `provider_name` is only set where the
//! CloudFormation property name is not the UpperCamelCase form of it.

use iotstack_core::schema::{ResourceSchema, SchemaRegistry};

pub mod amplify;
pub mod cognito;
pub mod custom;
pub mod iam;
pub mod iot;
pub mod lambda;

/// Returns all resource schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        iot::thing_schema(),
        iot::certificate_schema(),
        iot::policy_schema(),
        iot::policy_principal_attachment_schema(),
        iot::thing_principal_attachment_schema(),
        cognito::user_pool_schema(),
        cognito::user_pool_client_schema(),
        cognito::identity_pool_schema(),
        cognito::identity_pool_role_attachment_schema(),
        iam::role_schema(),
        lambda::function_schema(),
        custom::aws_sdk_call_schema(),
        amplify::app_schema(),
        amplify::branch_schema(),
    ]
}

/// Returns a registry of all resource schemas
pub fn registry() -> SchemaRegistry {
    all_schemas().into_iter().collect()
}
