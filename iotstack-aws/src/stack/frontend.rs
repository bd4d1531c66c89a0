//! Frontend delivery: hosted app built from a git repository

use iotstack_core::resource::{PseudoParameter, Resource, Value, logical_id};
use iotstack_core::stack::{GraphError, ResourceHandle, Stack};

use super::buildspec::BuildSpec;
use super::config::SourceRepository;
use super::sdk_call::{self, AwsSdkCall, SdkCallHandles};
use super::users::UserIdentity;

pub const APP_NAME: &str = "cdk-ttgo-frontend";

pub const ENV_IDENTITY_POOL_ID: &str = "IDENTITY_POOL_ID";
pub const ENV_REGION: &str = "REGION";
pub const ENV_USER_POOL_ID: &str = "USER_POOL_ID";
pub const ENV_USER_POOL_CLIENT_ID: &str = "USER_POOL_CLIENT_ID";
pub const ENV_IOT_ENDPOINT: &str = "IOT_ENDPOINT";

#[derive(Debug, Clone)]
pub struct FrontendDelivery {
    pub endpoint_lookup: SdkCallHandles,
    pub service_role: ResourceHandle,
    pub app: ResourceHandle,
    pub branch: ResourceHandle,
}

/// Values the frontend is configured with at build time
///
/// Every value is resolved by the engine, none is known at declaration time.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEnvironment {
    pub identity_pool_id: Value,
    pub region: Value,
    pub user_pool_id: Value,
    pub user_pool_client_id: Value,
    pub iot_endpoint: Value,
}

impl AppEnvironment {
    pub fn new(users: &UserIdentity, iot_endpoint: Value) -> Self {
        Self {
            identity_pool_id: users.identity_pool.reference(),
            region: PseudoParameter::Region.into(),
            user_pool_id: users.user_pool.reference(),
            user_pool_client_id: users.user_pool_client.reference(),
            iot_endpoint,
        }
    }

    /// Variables in declaration order
    pub fn entries(&self) -> [(&'static str, &Value); 5] {
        [
            (ENV_IDENTITY_POOL_ID, &self.identity_pool_id),
            (ENV_REGION, &self.region),
            (ENV_USER_POOL_ID, &self.user_pool_id),
            (ENV_USER_POOL_CLIENT_ID, &self.user_pool_client_id),
            (ENV_IOT_ENDPOINT, &self.iot_endpoint),
        ]
    }

    fn to_value(&self) -> Value {
        Value::list(self.entries().into_iter().map(|(name, value)| {
            Value::map([("Name", Value::from(name)), ("Value", value.clone())])
        }))
    }
}

/// Declare the endpoint lookup, the hosted app and its tracked branch
pub fn declare(
    stack: &mut Stack,
    source: &SourceRepository,
    branch_name: &str,
    users: &UserIdentity,
) -> Result<FrontendDelivery, GraphError> {
    let endpoint_lookup = sdk_call::declare(stack, "iot-endpoint", &AwsSdkCall::iot_data_endpoint())?;
    let environment = AppEnvironment::new(users, endpoint_lookup.output());

    let service_role = stack.add(
        Resource::new("AWS::IAM::Role", logical_id("cdk-ttgo-frontend-role"))
            .with_attribute(
                "assume_role_policy_document",
                Value::from(serde_json::json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "amplify.amazonaws.com" },
                        "Action": "sts:AssumeRole"
                    }]
                })),
            )
            .with_attribute("description", "Builds and hosts the frontend"),
    )?;

    // An empty build spec is rejected by schema validation
    let build_spec = BuildSpec::node_frontend().render().unwrap_or_default();

    let app = stack.add(
        Resource::new("AWS::Amplify::App", logical_id(APP_NAME))
            .with_attribute("name", APP_NAME)
            .with_attribute("description", "Web console for the cdk-ttgo device")
            .with_attribute("build_spec", build_spec)
            .with_attribute("environment_variables", environment.to_value())
            .with_attribute("repository", source.url())
            .with_attribute("oauth_token", source.access_token.as_str())
            .with_attribute("iam_service_role", service_role.attr("Arn"))
            .depends_on(users.user_pool.logical_id())
            .depends_on(users.user_pool_client.logical_id())
            .depends_on(users.identity_pool.logical_id())
            .depends_on(service_role.logical_id())
            .depends_on(endpoint_lookup.call.logical_id())
            .depends_on(users.role_attachment.logical_id()),
    )?;

    let branch = stack.add(
        Resource::new("AWS::Amplify::Branch", logical_id("cdk-ttgo-frontend-branch"))
            .with_attribute("app_id", app.attr("AppId"))
            .with_attribute("branch_name", branch_name)
            .with_attribute("enable_auto_build", true)
            .depends_on(app.logical_id()),
    )?;

    Ok(FrontendDelivery {
        endpoint_lookup,
        service_role,
        app,
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::config::tests::sample_config;
    use crate::stack::users;

    fn declared() -> (Stack, FrontendDelivery) {
        let config = sample_config();
        let mut stack = Stack::new("IoTStack").unwrap();
        let users = users::declare(&mut stack).unwrap();
        let frontend = declare(&mut stack, &config.source, &config.branch, &users).unwrap();
        (stack, frontend)
    }

    #[test]
    fn app_tracks_the_configured_repository() {
        let (stack, frontend) = declared();
        let app = stack.get(frontend.app.logical_id()).unwrap();
        assert_eq!(
            app.attributes.get("repository"),
            Some(&Value::from("https://github.com/octo/ttgo-frontend"))
        );
        assert_eq!(
            app.attributes.get("oauth_token"),
            Some(&Value::from("ghp_example"))
        );

        let branch = stack.get(frontend.branch.logical_id()).unwrap();
        assert_eq!(branch.attributes.get("branch_name"), Some(&Value::from("master")));
        assert_eq!(branch.attributes.get("app_id"), Some(&frontend.app.attr("AppId")));
    }

    #[test]
    fn app_receives_the_endpoint_as_an_unresolved_reference() {
        let (stack, frontend) = declared();
        let app = stack.get(frontend.app.logical_id()).unwrap();
        let Some(Value::List(variables)) = app.attributes.get("environment_variables") else {
            panic!("Expected environment variables");
        };
        let endpoint = variables
            .iter()
            .find(|v| v.to_json()["Name"] == ENV_IOT_ENDPOINT)
            .unwrap();
        assert_eq!(
            endpoint.to_json()["Value"],
            serde_json::json!({ "Fn::GetAtt": ["IotEndpoint", "endpointAddress"] })
        );
        assert!(
            stack
                .dependencies(frontend.app.logical_id())
                .contains(frontend.endpoint_lookup.call.logical_id())
        );
    }

    #[test]
    fn app_carries_the_rendered_build_spec() {
        let (stack, frontend) = declared();
        let app = stack.get(frontend.app.logical_id()).unwrap();
        let Some(Value::String(spec)) = app.attributes.get("build_spec") else {
            panic!("Expected build spec text");
        };
        assert_eq!(spec, &BuildSpec::node_frontend().render().unwrap());
    }
}
