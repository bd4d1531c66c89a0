//! Differ - Compare the synthesized template with the deployed one
//!
//! Compares the "desired template" produced by the stack definition with the
//! template currently deployed by the engine, and generates the list of
//! per-resource Effects (Plan) the engine would carry out. Output and
//! description changes are recorded on the Plan as stack-level changes.

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::ResourceId;
use crate::template::{Template, TemplateResource};

/// Result of comparing one resource
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource is not deployed -> needs creation
    Create(ResourceId),
    /// Resource is deployed with differences -> needs update
    Update {
        id: ResourceId,
        changed_attributes: Vec<String>,
    },
    /// Resource type changed under the same logical id
    Replace { from: ResourceId, to: ResourceId },
    /// Resource is deployed with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare a desired resource entry with the deployed entry of the same logical id
pub fn diff(logical_id: &str, desired: &TemplateResource, current: Option<&TemplateResource>) -> Diff {
    let id = ResourceId::new(desired.resource_type.clone(), logical_id);

    let Some(current) = current else {
        return Diff::Create(id);
    };

    if current.resource_type != desired.resource_type {
        return Diff::Replace {
            from: ResourceId::new(current.resource_type.clone(), logical_id),
            to: id,
        };
    }

    let changed = find_changed_attributes(desired, current);

    if changed.is_empty() {
        Diff::NoChange(id)
    } else {
        Diff::Update {
            id,
            changed_attributes: changed,
        }
    }
}

/// Find changed properties (and resource options) between desired and deployed entries
fn find_changed_attributes(desired: &TemplateResource, current: &TemplateResource) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in &desired.properties {
        match current.properties.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    for key in current.properties.keys() {
        if !desired.properties.contains_key(key) {
            changed.push(key.clone());
        }
    }

    if desired.depends_on != current.depends_on {
        changed.push("DependsOn".to_string());
    }
    if desired.deletion_policy != current.deletion_policy {
        changed.push("DeletionPolicy".to_string());
    }
    if desired.update_replace_policy != current.update_replace_policy {
        changed.push("UpdateReplacePolicy".to_string());
    }

    changed
}

/// Stack-level fields that differ between desired and deployed templates
fn find_stack_changes(desired: &Template, current: Option<&Template>) -> Vec<String> {
    let mut changed = Vec::new();
    let Some(current) = current else {
        if desired.description.is_some() {
            changed.push("Description".to_string());
        }
        changed.extend(desired.outputs.keys().map(|name| format!("Outputs.{}", name)));
        return changed;
    };

    if desired.description != current.description {
        changed.push("Description".to_string());
    }
    for (name, output) in &desired.outputs {
        if current.outputs.get(name) != Some(output) {
            changed.push(format!("Outputs.{}", name));
        }
    }
    for name in current.outputs.keys() {
        if !desired.outputs.contains_key(name) {
            changed.push(format!("Outputs.{}", name));
        }
    }
    changed
}

/// Compute Diffs for every resource and generate a Plan
///
/// Resources only present in the deployed template become deletions.
pub fn create_plan(desired: &Template, current: Option<&Template>) -> Plan {
    let mut plan = Plan::new();

    for (logical_id, resource) in &desired.resources {
        let deployed = current.and_then(|t| t.resources.get(logical_id));

        match diff(logical_id, resource, deployed) {
            Diff::Create(id) => plan.add(Effect::Create(id)),
            Diff::Update {
                id,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                changed_attributes,
            }),
            Diff::Replace { from, to } => plan.add(Effect::Replace { from, to }),
            Diff::NoChange(_) => {}
        }
    }

    if let Some(current) = current {
        for (logical_id, resource) in &current.resources {
            if !desired.resources.contains_key(logical_id) {
                plan.add(Effect::Delete(ResourceId::new(
                    resource.resource_type.clone(),
                    logical_id.clone(),
                )));
            }
        }
    }

    for field in find_stack_changes(desired, current) {
        plan.add_stack_change(field);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateOutput;
    use serde_json::json;

    fn entry(resource_type: &str, properties: serde_json::Value) -> TemplateResource {
        TemplateResource {
            resource_type: resource_type.to_string(),
            properties: properties.as_object().cloned().unwrap_or_default(),
            depends_on: vec![],
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    fn template(resources: Vec<(&str, TemplateResource)>) -> Template {
        Template {
            format_version: "2010-09-09".to_string(),
            description: None,
            resources: resources
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            outputs: Default::default(),
        }
    }

    #[test]
    fn diff_create_when_not_deployed() {
        let desired = entry("AWS::IoT::Thing", json!({ "ThingName": "cdk-ttgo" }));
        assert!(matches!(diff("Thing", &desired, None), Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = entry("AWS::IoT::Thing", json!({ "ThingName": "cdk-ttgo" }));
        let current = desired.clone();
        let result = diff("Thing", &desired, Some(&current));
        assert!(!result.is_change());
    }

    #[test]
    fn diff_update_when_different() {
        let desired = entry("AWS::IoT::Policy", json!({ "PolicyName": "a", "PolicyDocument": {} }));
        let current = entry("AWS::IoT::Policy", json!({ "PolicyName": "b", "Extra": 1 }));

        match diff("Policy", &desired, Some(&current)) {
            Diff::Update {
                mut changed_attributes,
                ..
            } => {
                changed_attributes.sort();
                assert_eq!(
                    changed_attributes,
                    vec![
                        "Extra".to_string(),
                        "PolicyDocument".to_string(),
                        "PolicyName".to_string()
                    ]
                );
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_detects_new_dependency_edges() {
        let desired = TemplateResource {
            depends_on: vec!["Thing".to_string()],
            ..entry("AWS::IoT::Certificate", json!({ "Status": "ACTIVE" }))
        };
        let current = entry("AWS::IoT::Certificate", json!({ "Status": "ACTIVE" }));

        match diff("Cert", &desired, Some(&current)) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["DependsOn".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_type_changes() {
        let desired = entry("AWS::IoT::Thing", json!({}));
        let current = entry("AWS::IoT::Policy", json!({}));
        assert!(matches!(
            diff("X", &desired, Some(&current)),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn create_plan_against_nothing_deployed() {
        let desired = template(vec![
            ("Thing", entry("AWS::IoT::Thing", json!({}))),
            ("Policy", entry("AWS::IoT::Policy", json!({}))),
        ]);

        let plan = create_plan(&desired, None);
        assert_eq!(plan.summary().create, 2);
    }

    #[test]
    fn create_plan_includes_deletions() {
        let desired = template(vec![(
            "Thing",
            entry("AWS::IoT::Thing", json!({ "ThingName": "new" })),
        )]);
        let current = template(vec![
            ("Thing", entry("AWS::IoT::Thing", json!({ "ThingName": "old" }))),
            ("Stale", entry("AWS::IoT::Policy", json!({}))),
        ]);

        let plan = create_plan(&desired, Some(&current));

        assert_eq!(plan.effects().len(), 2);
        assert!(matches!(plan.effects()[0], Effect::Update { .. }));
        assert!(matches!(plan.effects()[1], Effect::Delete(_)));
    }

    #[test]
    fn create_plan_is_empty_when_in_sync() {
        let desired = template(vec![(
            "Thing",
            entry("AWS::IoT::Thing", json!({ "ThingName": "cdk-ttgo" })),
        )]);
        let plan = create_plan(&desired, Some(&desired.clone()));
        assert!(plan.is_empty());
    }

    #[test]
    fn create_plan_reports_output_and_description_changes() {
        let deployed = template(vec![("Thing", entry("AWS::IoT::Thing", json!({})))]);
        let mut desired = deployed.clone();
        desired.description = Some("IoT device identity".to_string());
        desired.outputs.insert(
            "IotEndpoint".to_string(),
            TemplateOutput {
                value: json!({ "Fn::GetAtt": ["IotEndpoint", "endpointAddress"] }),
                description: Some("IOT_ENDPOINT".to_string()),
            },
        );

        let plan = create_plan(&desired, Some(&deployed));

        assert!(plan.effects().is_empty());
        assert!(!plan.is_empty());
        assert_eq!(
            plan.stack_changes(),
            &["Description".to_string(), "Outputs.IotEndpoint".to_string()]
        );

        let plan = create_plan(&deployed, Some(&desired));
        assert_eq!(plan.summary().stack, 2);
    }
}
