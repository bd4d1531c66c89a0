//! Template - Synthesize a stack into the engine's template document
//!
//! The template is the only artifact handed to the provisioning engine.
//! Attribute names are converted from snake_case to the engine's property
//! names through the schema registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceId;
use crate::schema::SchemaRegistry;
use crate::stack::Stack;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

/// A synthesized stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Engine template document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default = "default_format_version")]
    pub format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

fn default_format_version() -> String {
    FORMAT_VERSION.to_string()
}

impl Template {
    /// Build the template for a stack
    pub fn synthesize(stack: &Stack, schemas: &SchemaRegistry) -> Self {
        let mut resources = BTreeMap::new();

        for resource in stack.resources() {
            let properties = resource
                .attributes
                .iter()
                .map(|(name, value)| {
                    (
                        schemas.property_name(&resource.id.resource_type, name),
                        value.to_json(),
                    )
                })
                .collect();

            let policy = resource.deletion_policy.map(|p| p.as_str().to_string());

            resources.insert(
                resource.id.name.clone(),
                TemplateResource {
                    resource_type: resource.id.resource_type.clone(),
                    properties,
                    depends_on: resource.depends_on.iter().cloned().collect(),
                    deletion_policy: policy.clone(),
                    update_replace_policy: policy,
                },
            );
        }

        let outputs = stack
            .outputs()
            .iter()
            .map(|output| {
                (
                    output.name.clone(),
                    TemplateOutput {
                        value: output.value.to_json(),
                        description: output.description.clone(),
                    },
                )
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: stack.description().map(str::to_string),
            resources,
            outputs,
        }
    }

    /// Parse a template body returned by the engine
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .map(|(name, r)| ResourceId::new(r.resource_type.clone(), name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{DeletionPolicy, Resource, Value};
    use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};
    use serde_json::json;

    fn sample_stack() -> Stack {
        let mut stack = Stack::new("IoTStack").unwrap().with_description("sample");
        let thing = stack
            .add(Resource::new("AWS::IoT::Thing", "CdkTtgo").with_attribute("thing_name", "cdk-ttgo"))
            .unwrap();
        let cert = stack
            .add(
                Resource::new("AWS::IoT::Certificate", "CdkTtgoCertificate")
                    .with_attribute("status", "ACTIVE")
                    .depends_on(thing.logical_id()),
            )
            .unwrap();
        stack
            .add(
                Resource::new("AWS::Cognito::UserPool", "Pool")
                    .with_deletion_policy(DeletionPolicy::Delete),
            )
            .unwrap();
        stack
            .add_output("CertificateArn", cert.attr("Arn"), Some("certificate"))
            .unwrap();
        stack
    }

    #[test]
    fn synthesizes_resources_with_engine_property_names() {
        let schemas: SchemaRegistry = vec![
            ResourceSchema::new("AWS::IoT::Thing")
                .attribute(AttributeSchema::new("thing_name", AttributeType::String)),
        ]
        .into_iter()
        .collect();

        let template = Template::synthesize(&sample_stack(), &schemas);
        let json = serde_json::to_value(&template).unwrap();

        assert_eq!(json["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(json["Description"], json!("sample"));
        assert_eq!(
            json["Resources"]["CdkTtgo"],
            json!({ "Type": "AWS::IoT::Thing", "Properties": { "ThingName": "cdk-ttgo" } })
        );
        assert_eq!(
            json["Resources"]["CdkTtgoCertificate"]["DependsOn"],
            json!(["CdkTtgo"])
        );
        assert_eq!(
            json["Outputs"]["CertificateArn"]["Value"],
            json!({ "Fn::GetAtt": ["CdkTtgoCertificate", "Arn"] })
        );
    }

    #[test]
    fn deletion_policy_applies_to_replacement_too() {
        let template = Template::synthesize(&sample_stack(), &SchemaRegistry::new());
        let pool = &template.resources["Pool"];
        assert_eq!(pool.deletion_policy.as_deref(), Some("Delete"));
        assert_eq!(pool.update_replace_policy.as_deref(), Some("Delete"));
        assert!(template.resources["CdkTtgo"].deletion_policy.is_none());
    }

    #[test]
    fn parses_template_returned_by_engine() {
        let body = r#"{
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "CdkTtgo": { "Type": "AWS::IoT::Thing", "Properties": { "ThingName": "cdk-ttgo" } }
            }
        }"#;
        let template = Template::from_json(body).unwrap();
        assert_eq!(template.resources.len(), 1);
        assert_eq!(
            template.resources["CdkTtgo"].properties["ThingName"],
            json!("cdk-ttgo")
        );
        assert!(template.outputs.is_empty());
    }

    #[test]
    fn join_values_keep_their_parts() {
        let mut stack = Stack::new("IoTStack").unwrap();
        stack
            .add(Resource::new("AWS::IAM::Role", "Role").with_attribute(
                "managed_policy_arns",
                Value::list([Value::join(
                    "",
                    [
                        Value::from("arn:"),
                        crate::resource::PseudoParameter::Partition.into(),
                        Value::from(":iam::aws:policy/AWSIoTDataAccess"),
                    ],
                )]),
            ))
            .unwrap();

        let template = Template::synthesize(&stack, &SchemaRegistry::new());
        assert_eq!(
            template.resources["Role"].properties["ManagedPolicyArns"],
            json!([{ "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }, ":iam::aws:policy/AWSIoTDataAccess"]] }])
        );
    }
}
