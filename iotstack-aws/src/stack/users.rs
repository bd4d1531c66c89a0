//! User identity: user pool, client, identity pool and its two roles

use iotstack_core::resource::{DeletionPolicy, PseudoParameter, Resource, Value, logical_id};
use iotstack_core::stack::{GraphError, ResourceHandle, Stack};

pub const USER_POOL_NAME: &str = "cdk-ttgo-user-pool";
pub const IDENTITY_POOL_NAME: &str = "cdk_ttgo_identity_pool";
pub const IOT_DATA_ACCESS_POLICY: &str = "AWSIoTDataAccess";

const FEDERATED_PRINCIPAL: &str = "cognito-identity.amazonaws.com";
const AUDIENCE_CLAIM: &str = "cognito-identity.amazonaws.com:aud";
const AMR_CLAIM: &str = "cognito-identity.amazonaws.com:amr";

/// Authentication state a federated role is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    /// Value of the `amr` claim and key in the identity pool's role map
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Authenticated => "authenticated",
            AuthState::Unauthenticated => "unauthenticated",
        }
    }
}

/// Handles to the declared user identity resources
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_pool: ResourceHandle,
    pub user_pool_client: ResourceHandle,
    pub identity_pool: ResourceHandle,
    pub authenticated_role: ResourceHandle,
    pub unauthenticated_role: ResourceHandle,
    pub role_attachment: ResourceHandle,
}

/// Declare the user identity group
pub fn declare(stack: &mut Stack) -> Result<UserIdentity, GraphError> {
    let user_pool = stack.add(
        Resource::new("AWS::Cognito::UserPool", logical_id("cdk-ttgo-user-pool"))
            .with_attribute("user_pool_name", USER_POOL_NAME)
            .with_attribute(
                "admin_create_user_config",
                Value::map([("AllowAdminCreateUserOnly", false)]),
            )
            .with_attribute("username_attributes", Value::list(["email"]))
            .with_attribute("auto_verified_attributes", Value::list(["email"]))
            .with_attribute("policies", password_policy())
            .with_attribute(
                "account_recovery_setting",
                Value::map([(
                    "RecoveryMechanisms",
                    Value::list([Value::map([
                        ("Name", Value::from("verified_email")),
                        ("Priority", Value::Int(1)),
                    ])]),
                )]),
            )
            .with_deletion_policy(DeletionPolicy::Delete),
    )?;

    let user_pool_client = stack.add(
        Resource::new(
            "AWS::Cognito::UserPoolClient",
            logical_id("cdk-ttgo-user-pool-client"),
        )
        .with_attribute("user_pool_id", user_pool.reference())
        .with_attribute("generate_secret", false)
        .with_attribute(
            "explicit_auth_flows",
            Value::list([
                "ALLOW_ADMIN_USER_PASSWORD_AUTH",
                "ALLOW_CUSTOM_AUTH",
                "ALLOW_USER_SRP_AUTH",
                "ALLOW_REFRESH_TOKEN_AUTH",
            ]),
        )
        .with_attribute("supported_identity_providers", Value::list(["COGNITO"]))
        .depends_on(user_pool.logical_id()),
    )?;

    let identity_pool = stack.add(
        Resource::new(
            "AWS::Cognito::IdentityPool",
            logical_id("cdk-ttgo-identity-pool"),
        )
        .with_attribute("identity_pool_name", IDENTITY_POOL_NAME)
        .with_attribute("allow_unauthenticated_identities", true)
        .with_attribute(
            "cognito_identity_providers",
            Value::list([Value::map([
                ("ClientId", user_pool_client.reference()),
                ("ProviderName", user_pool.attr("ProviderName")),
            ])]),
        )
        .depends_on(user_pool.logical_id())
        .depends_on(user_pool_client.logical_id()),
    )?;

    let unauthenticated_role = stack.add(federated_role(
        "cdk-ttgo-unauthenticated-role",
        &identity_pool,
        AuthState::Unauthenticated,
    ))?;

    let authenticated_role = stack.add(federated_role(
        "cdk-ttgo-authenticated-role",
        &identity_pool,
        AuthState::Authenticated,
    ))?;

    let role_attachment = stack.add(
        Resource::new(
            "AWS::Cognito::IdentityPoolRoleAttachment",
            logical_id("cdk-ttgo-identity-pool-role-attachment"),
        )
        .with_attribute("identity_pool_id", identity_pool.reference())
        .with_attribute(
            "roles",
            Value::map([
                (AuthState::Authenticated.as_str(), authenticated_role.attr("Arn")),
                (
                    AuthState::Unauthenticated.as_str(),
                    unauthenticated_role.attr("Arn"),
                ),
            ]),
        )
        .with_attribute(
            "role_mappings",
            Value::map([(
                "cognito-user-pool",
                Value::map([
                    ("Type", Value::from("Token")),
                    ("AmbiguousRoleResolution", Value::from("AuthenticatedRole")),
                    ("IdentityProvider", token_issuer(&user_pool, &user_pool_client)),
                ]),
            )]),
        )
        .depends_on(user_pool.logical_id())
        .depends_on(user_pool_client.logical_id())
        .depends_on(identity_pool.logical_id())
        .depends_on(authenticated_role.logical_id())
        .depends_on(unauthenticated_role.logical_id()),
    )?;

    Ok(UserIdentity {
        user_pool,
        user_pool_client,
        identity_pool,
        authenticated_role,
        unauthenticated_role,
        role_attachment,
    })
}

/// Lowercase and digits required, uppercase and symbols not, at least 6 characters
fn password_policy() -> Value {
    Value::map([(
        "PasswordPolicy",
        Value::map([
            ("MinimumLength", Value::Int(6)),
            ("RequireLowercase", Value::Bool(true)),
            ("RequireNumbers", Value::Bool(true)),
            ("RequireUppercase", Value::Bool(false)),
            ("RequireSymbols", Value::Bool(false)),
        ]),
    )])
}

/// `cognito-idp.<region>.amazonaws.com/<user pool id>:<client id>`
fn token_issuer(user_pool: &ResourceHandle, client: &ResourceHandle) -> Value {
    Value::join(
        "",
        [
            Value::from("cognito-idp."),
            PseudoParameter::Region.into(),
            Value::from(".amazonaws.com/"),
            user_pool.reference(),
            Value::from(":"),
            client.reference(),
        ],
    )
}

/// Role assumable through the identity pool by principals in one auth state
fn federated_role(construct_id: &str, identity_pool: &ResourceHandle, state: AuthState) -> Resource {
    let trust_policy = Value::map([
        ("Version", Value::from("2012-10-17")),
        (
            "Statement",
            Value::list([Value::map([
                ("Effect", Value::from("Allow")),
                (
                    "Principal",
                    Value::map([("Federated", FEDERATED_PRINCIPAL)]),
                ),
                ("Action", Value::from("sts:AssumeRoleWithWebIdentity")),
                (
                    "Condition",
                    Value::map([
                        (
                            "StringEquals",
                            Value::map([(AUDIENCE_CLAIM, identity_pool.reference())]),
                        ),
                        (
                            "ForAnyValue:StringLike",
                            Value::map([(AMR_CLAIM, state.as_str())]),
                        ),
                    ]),
                ),
            ])]),
        ),
    ]);

    Resource::new("AWS::IAM::Role", logical_id(construct_id))
        .depends_on(identity_pool.logical_id())
        .with_attribute("assume_role_policy_document", trust_policy)
        .with_attribute(
            "description",
            format!("IoT data access for {} identities", state.as_str()),
        )
        .with_attribute(
            "managed_policy_arns",
            Value::list([managed_policy_arn(IOT_DATA_ACCESS_POLICY)]),
        )
}

/// ARN of an AWS managed policy in the deployment partition
pub fn managed_policy_arn(name: &str) -> Value {
    Value::join(
        "",
        [
            Value::from("arn:"),
            PseudoParameter::Partition.into(),
            Value::from(format!(":iam::aws:policy/{}", name)),
        ],
    )
}
