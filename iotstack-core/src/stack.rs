//! Stack - A graph of declared resources and their dependency edges
//!
//! Resources are added in declaration order. Every reference (implicit via an
//! attribute value, or explicit via `depends_on`) must name a resource that is
//! already part of the stack, so the graph never contains dangling or forward
//! edges and is acyclic by construction.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::resource::{Resource, ResourceId, Value};
use crate::schema::{SchemaRegistry, TypeError};

static STACK_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("valid stack pattern"));

static LOGICAL_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,255}$").expect("valid logical id pattern"));

/// Errors raised while assembling a stack
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid stack name '{0}': must start with a letter and contain only letters, digits and '-'")]
    InvalidStackName(String),

    #[error("Invalid logical id '{0}': must be alphanumeric")]
    InvalidLogicalId(String),

    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("Duplicate {attribute} '{value}' for {resource_type}")]
    DuplicateName {
        resource_type: String,
        attribute: String,
        value: String,
    },

    #[error("{from} references {to}, which has not been declared")]
    DanglingReference { from: String, to: String },

    #[error("{0} depends on itself")]
    SelfReference(String),

    #[error("Duplicate output: {0}")]
    DuplicateOutput(String),

    #[error("Validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
}

/// Handle to a resource already added to a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub id: ResourceId,
}

impl ResourceHandle {
    pub fn logical_id(&self) -> &str {
        &self.id.name
    }

    /// The resource's primary identifier, resolved by the engine
    pub fn reference(&self) -> Value {
        Value::Ref(self.id.name.clone())
    }

    /// One of the resource's attributes, resolved by the engine
    pub fn attr(&self, attribute: impl Into<String>) -> Value {
        Value::ResourceRef(self.id.name.clone(), attribute.into())
    }
}

/// Value exported by the stack once provisioned
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
}

/// Declared stack
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    outputs: Vec<Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if !STACK_NAME_PATTERN.is_match(&name) {
            return Err(GraphError::InvalidStackName(name));
        }
        Ok(Self {
            name,
            description: None,
            resources: Vec::new(),
            index: HashMap::new(),
            outputs: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Add a resource, rejecting duplicates and references to undeclared resources
    pub fn add(&mut self, resource: Resource) -> Result<ResourceHandle, GraphError> {
        let logical_id = resource.id.name.clone();

        if !LOGICAL_ID_PATTERN.is_match(&logical_id) {
            return Err(GraphError::InvalidLogicalId(logical_id));
        }
        if self.index.contains_key(&logical_id) {
            return Err(GraphError::DuplicateLogicalId(logical_id));
        }

        for dep in resource.dependencies() {
            if dep == logical_id {
                return Err(GraphError::SelfReference(logical_id));
            }
            if !self.index.contains_key(&dep) {
                return Err(GraphError::DanglingReference {
                    from: logical_id,
                    to: dep,
                });
            }
        }

        self.check_literal_names(&resource)?;

        debug!(
            "declared {} ({} attributes, depends on {:?})",
            resource.id,
            resource.attributes.len(),
            resource.depends_on
        );

        let handle = ResourceHandle {
            id: resource.id.clone(),
        };
        self.index.insert(logical_id, self.resources.len());
        self.resources.push(resource);
        Ok(handle)
    }

    /// Literal `*_name` attributes must be unique per resource type
    fn check_literal_names(&self, resource: &Resource) -> Result<(), GraphError> {
        for (key, value) in &resource.attributes {
            let Value::String(name) = value else {
                continue;
            };
            if !key.ends_with("_name") {
                continue;
            }
            let clash = self.resources.iter().any(|existing| {
                existing.id.resource_type == resource.id.resource_type
                    && existing.attributes.get(key) == Some(value)
            });
            if clash {
                return Err(GraphError::DuplicateName {
                    resource_type: resource.id.resource_type.clone(),
                    attribute: key.clone(),
                    value: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Export a value from the stack
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        value: Value,
        description: Option<&str>,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if !LOGICAL_ID_PATTERN.is_match(&name) {
            return Err(GraphError::InvalidLogicalId(name));
        }
        if self.outputs.iter().any(|o| o.name == name) {
            return Err(GraphError::DuplicateOutput(name));
        }
        let mut refs = BTreeSet::new();
        value.collect_references(&mut refs);
        if let Some(missing) = refs.into_iter().find(|r| !self.index.contains_key(r)) {
            return Err(GraphError::DanglingReference {
                from: format!("output {}", name),
                to: missing,
            });
        }
        self.outputs.push(Output {
            name,
            value,
            description: description.map(str::to_string),
        });
        Ok(())
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.index.get(logical_id).map(|&i| &self.resources[i])
    }

    /// Logical ids the given resource depends on (explicit and implicit)
    pub fn dependencies(&self, logical_id: &str) -> BTreeSet<String> {
        self.get(logical_id)
            .map(Resource::dependencies)
            .unwrap_or_default()
    }

    /// Logical ids of resources that depend on the given resource
    pub fn dependents(&self, logical_id: &str) -> BTreeSet<String> {
        self.resources
            .iter()
            .filter(|r| r.dependencies().contains(logical_id))
            .map(|r| r.id.name.clone())
            .collect()
    }

    /// Resources sorted topologically (dependencies first)
    pub fn sorted(&self) -> Vec<&Resource> {
        let mut sorted = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();

        fn visit<'a>(
            resource: &'a Resource,
            stack: &'a Stack,
            visited: &mut HashSet<&'a str>,
            sorted: &mut Vec<&'a Resource>,
        ) {
            if !visited.insert(resource.id.name.as_str()) {
                return;
            }

            // Visit dependencies first
            for dep in resource.dependencies() {
                if let Some(dep_resource) = stack.get(&dep) {
                    visit(dep_resource, stack, visited, sorted);
                }
            }

            sorted.push(resource);
        }

        for resource in &self.resources {
            visit(resource, self, &mut visited, &mut sorted);
        }

        sorted
    }

    /// Validate every resource against its schema
    pub fn validate(&self, schemas: &SchemaRegistry) -> Result<(), GraphError> {
        let mut all_errors = Vec::new();

        for resource in &self.resources {
            if let Err(errors) = schemas.validate(resource) {
                for error in errors {
                    all_errors.push(format_error(resource, &error));
                }
            }
        }

        if all_errors.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Validation(all_errors))
        }
    }

    /// Count resources per type
    pub fn type_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in &self.resources {
            *counts.entry(resource.id.resource_type.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

fn format_error(resource: &Resource, error: &TypeError) -> String {
    format!("{}: {}", resource.id, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType, ResourceSchema};

    fn thing() -> Resource {
        Resource::new("AWS::IoT::Thing", "Thing").with_attribute("thing_name", "cdk-ttgo")
    }

    #[test]
    fn rejects_invalid_stack_name() {
        assert!(Stack::new("IoTStack").is_ok());
        assert!(matches!(
            Stack::new("1stack"),
            Err(GraphError::InvalidStackName(_))
        ));
        assert!(Stack::new("io_stack").is_err());
    }

    #[test]
    fn rejects_duplicate_logical_id() {
        let mut stack = Stack::new("IoTStack").unwrap();
        stack.add(thing()).unwrap();
        let err = stack
            .add(Resource::new("AWS::IoT::Thing", "Thing").with_attribute("thing_name", "other"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateLogicalId(_)));
    }

    #[test]
    fn rejects_duplicate_literal_name() {
        let mut stack = Stack::new("IoTStack").unwrap();
        stack.add(thing()).unwrap();
        let err = stack
            .add(Resource::new("AWS::IoT::Thing", "Other").with_attribute("thing_name", "cdk-ttgo"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { .. }));
    }

    #[test]
    fn rejects_forward_reference() {
        let mut stack = Stack::new("IoTStack").unwrap();
        let err = stack
            .add(
                Resource::new("AWS::IoT::Certificate", "Cert")
                    .with_attribute("status", "ACTIVE")
                    .depends_on("Thing"),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }));
        assert!(stack.resources().is_empty());
    }

    #[test]
    fn rejects_dangling_attribute_reference() {
        let mut stack = Stack::new("IoTStack").unwrap();
        let err = stack
            .add(
                Resource::new("AWS::IoT::ThingPrincipalAttachment", "Attach")
                    .with_attribute("principal", Value::ResourceRef("Cert".into(), "Arn".into())),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }));
    }

    #[test]
    fn rejects_self_reference() {
        let mut stack = Stack::new("IoTStack").unwrap();
        let err = stack
            .add(Resource::new("AWS::IoT::Thing", "Thing").depends_on("Thing"))
            .unwrap_err();
        assert!(matches!(err, GraphError::SelfReference(_)));
    }

    #[test]
    fn tracks_dependencies_and_dependents() {
        let mut stack = Stack::new("IoTStack").unwrap();
        let thing = stack.add(thing()).unwrap();
        let cert = stack
            .add(Resource::new("AWS::IoT::Certificate", "Cert").depends_on(thing.logical_id()))
            .unwrap();
        stack
            .add(
                Resource::new("AWS::IoT::ThingPrincipalAttachment", "Attach")
                    .with_attribute("principal", cert.attr("Arn"))
                    .depends_on(thing.logical_id()),
            )
            .unwrap();

        assert_eq!(
            stack.dependencies("Attach").into_iter().collect::<Vec<_>>(),
            vec!["Cert".to_string(), "Thing".to_string()]
        );
        assert_eq!(
            stack.dependents("Thing").into_iter().collect::<Vec<_>>(),
            vec!["Attach".to_string(), "Cert".to_string()]
        );
    }

    #[test]
    fn sorted_places_dependencies_first() {
        let mut stack = Stack::new("IoTStack").unwrap();
        stack.add(thing()).unwrap();
        stack
            .add(Resource::new("AWS::IoT::Certificate", "Cert").depends_on("Thing"))
            .unwrap();
        stack
            .add(Resource::new("AWS::IoT::Policy", "Policy").depends_on("Thing"))
            .unwrap();

        let order: Vec<&str> = stack.sorted().iter().map(|r| r.id.name.as_str()).collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(position("Thing") < position("Cert"));
        assert!(position("Thing") < position("Policy"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn outputs_must_reference_declared_resources() {
        let mut stack = Stack::new("IoTStack").unwrap();
        stack.add(thing()).unwrap();
        assert!(
            stack
                .add_output("ThingName", Value::Ref("Thing".into()), None)
                .is_ok()
        );
        assert!(matches!(
            stack.add_output("ThingName", Value::Ref("Thing".into()), None),
            Err(GraphError::DuplicateOutput(_))
        ));
        assert!(matches!(
            stack.add_output("Missing", Value::Ref("Nope".into()), None),
            Err(GraphError::DanglingReference { .. })
        ));
    }

    #[test]
    fn validate_reports_every_schema_violation() {
        let registry: SchemaRegistry = vec![
            ResourceSchema::new("AWS::IoT::Thing")
                .attribute(AttributeSchema::new("thing_name", AttributeType::String).required()),
        ]
        .into_iter()
        .collect();

        let mut stack = Stack::new("IoTStack").unwrap();
        stack.add(thing()).unwrap();
        assert!(stack.validate(&registry).is_ok());

        stack.add(Resource::new("AWS::IoT::Thing", "Bare")).unwrap();
        match stack.validate(&registry) {
            Err(GraphError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("AWS::IoT::Thing.Bare"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }
}
