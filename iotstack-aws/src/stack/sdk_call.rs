//! Provider API calls performed at provisioning time
//!
//! A `Custom::AWS` resource hands the call to a small function which runs it
//! with the provider SDK and returns the response fields as resource
//! attributes. Those attributes only exist once the engine has run the call,
//! so they are always referenced as unresolved values.

use heck::{ToSnakeCase, ToUpperCamelCase};
use serde_json::{Map, json};

use iotstack_core::resource::{Resource, Value, logical_id};
use iotstack_core::stack::{GraphError, ResourceHandle, Stack};

use super::policy::{PolicyDocument, PolicyStatement};
use super::users::managed_policy_arn;
use crate::schemas::custom::AWS_SDK_CALL_TYPE;

const HANDLER_SOURCE: &str = include_str!("sdk_call_handler.py");
const HANDLER_RUNTIME: &str = "python3.12";
const HANDLER_TIMEOUT_SECONDS: i64 = 120;
const LAMBDA_BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// A single SDK call and the response field to read back
#[derive(Debug, Clone, PartialEq)]
pub struct AwsSdkCall {
    /// Service name as it appears in IAM actions (e.g., "Iot")
    pub service: String,
    /// API name in camelCase (e.g., "describeEndpoint")
    pub action: String,
    pub parameters: Map<String, serde_json::Value>,
    pub physical_resource_id: String,
    pub output_field: String,
}

impl AwsSdkCall {
    /// Account-specific ATS data endpoint for devices and browsers
    pub fn iot_data_endpoint() -> Self {
        let mut parameters = Map::new();
        parameters.insert("endpointType".to_string(), json!("iot:Data-ATS"));
        Self {
            service: "Iot".to_string(),
            action: "describeEndpoint".to_string(),
            parameters,
            physical_resource_id: "IoTEndpoint".to_string(),
            output_field: "endpointAddress".to_string(),
        }
    }

    /// e.g., "iot:DescribeEndpoint"
    pub fn iam_action(&self) -> String {
        format!(
            "{}:{}",
            self.service.to_lowercase(),
            self.action.to_upper_camel_case()
        )
    }

    /// SDK client name, e.g., "iot"
    pub fn client_name(&self) -> String {
        self.service.to_lowercase()
    }

    /// SDK method name, e.g., "describe_endpoint"
    pub fn method_name(&self) -> String {
        self.action.to_snake_case()
    }

    /// Only permission the backing function is granted
    pub fn policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![PolicyStatement::allow([self.iam_action()], ["*"])])
    }
}

/// Handles to a declared SDK call
#[derive(Debug, Clone)]
pub struct SdkCallHandles {
    pub role: ResourceHandle,
    pub function: ResourceHandle,
    pub call: ResourceHandle,
    output_field: String,
}

impl SdkCallHandles {
    /// Response field named by the call, resolved by the engine
    pub fn output(&self) -> Value {
        self.call.attr(self.output_field.as_str())
    }
}

/// Declare the role, function and custom resource performing `call`
pub fn declare(
    stack: &mut Stack,
    construct_id: &str,
    call: &AwsSdkCall,
) -> Result<SdkCallHandles, GraphError> {
    let role = stack.add(
        Resource::new(
            "AWS::IAM::Role",
            logical_id(&format!("{}-handler-role", construct_id)),
        )
        .with_attribute("assume_role_policy_document", lambda_trust_policy())
        .with_attribute("description", format!("Performs {}", call.iam_action()))
        .with_attribute(
            "managed_policy_arns",
            Value::list([managed_policy_arn(LAMBDA_BASIC_EXECUTION_POLICY)]),
        )
        .with_attribute(
            "policies",
            Value::list([Value::map([
                (
                    "PolicyName",
                    Value::from(format!("{}-call", construct_id)),
                ),
                ("PolicyDocument", call.policy().to_value()),
            ])]),
        ),
    )?;

    let function = stack.add(
        Resource::new(
            "AWS::Lambda::Function",
            logical_id(&format!("{}-handler", construct_id)),
        )
        .with_attribute("code", Value::map([("ZipFile", HANDLER_SOURCE)]))
        .with_attribute("handler", "index.handler")
        .with_attribute("runtime", HANDLER_RUNTIME)
        .with_attribute("timeout", HANDLER_TIMEOUT_SECONDS)
        .with_attribute("role", role.attr("Arn"))
        .depends_on(role.logical_id()),
    )?;

    let resource = stack.add(
        Resource::new(AWS_SDK_CALL_TYPE, logical_id(construct_id))
            .with_attribute("service_token", function.attr("Arn"))
            .with_attribute("service", call.client_name())
            .with_attribute("action", call.method_name())
            .with_attribute(
                "parameters",
                serde_json::Value::Object(call.parameters.clone()).to_string(),
            )
            .with_attribute("physical_resource_id", call.physical_resource_id.as_str())
            .depends_on(function.logical_id())
            .depends_on(role.logical_id()),
    )?;

    Ok(SdkCallHandles {
        role,
        function,
        call: resource,
        output_field: call.output_field.clone(),
    })
}

fn lambda_trust_policy() -> Value {
    Value::from(json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": "lambda.amazonaws.com" },
            "Action": "sts:AssumeRole"
        }]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> (Stack, SdkCallHandles) {
        let mut stack = Stack::new("IoTStack").unwrap();
        let handles = declare(&mut stack, "iot-endpoint", &AwsSdkCall::iot_data_endpoint()).unwrap();
        (stack, handles)
    }

    #[test]
    fn names_follow_sdk_and_iam_conventions() {
        let call = AwsSdkCall::iot_data_endpoint();
        assert_eq!(call.iam_action(), "iot:DescribeEndpoint");
        assert_eq!(call.client_name(), "iot");
        assert_eq!(call.method_name(), "describe_endpoint");
    }

    #[test]
    fn requests_the_ats_data_endpoint() {
        let (stack, handles) = declared();
        let lookup = stack.get(handles.call.logical_id()).unwrap();
        let Some(Value::String(parameters)) = lookup.attributes.get("parameters") else {
            panic!("Expected JSON parameters");
        };
        let parameters: serde_json::Value = serde_json::from_str(parameters).unwrap();
        assert_eq!(parameters, json!({ "endpointType": "iot:Data-ATS" }));
        assert_eq!(
            lookup.attributes.get("action"),
            Some(&Value::from("describe_endpoint"))
        );
    }

    #[test]
    fn endpoint_is_unresolved_until_provisioning() {
        let (_, handles) = declared();
        let endpoint = handles.output();
        assert!(endpoint.is_unresolved());
        assert_eq!(
            endpoint.to_json(),
            json!({ "Fn::GetAtt": ["IotEndpoint", "endpointAddress"] })
        );
    }

    #[test]
    fn handler_may_only_describe_the_endpoint() {
        let (stack, handles) = declared();
        let role = stack.get(handles.role.logical_id()).unwrap();
        let Some(Value::List(policies)) = role.attributes.get("policies") else {
            panic!("Expected inline policies");
        };
        assert_eq!(policies.len(), 1);
        assert_eq!(
            policies[0].to_json()["PolicyDocument"]["Statement"],
            json!([{ "Effect": "Allow", "Action": ["iot:DescribeEndpoint"], "Resource": ["*"] }])
        );
    }

    #[test]
    fn call_waits_for_its_function() {
        let (stack, handles) = declared();
        let deps = stack.dependencies(handles.call.logical_id());
        assert!(deps.contains(handles.function.logical_id()));
        assert!(deps.contains(handles.role.logical_id()));

        let order: Vec<&str> = stack.sorted().iter().map(|r| r.id.name.as_str()).collect();
        assert_eq!(order, vec!["IotEndpointHandlerRole", "IotEndpointHandler", "IotEndpoint"]);
    }
}
