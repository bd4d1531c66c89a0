//! Schema - Define type schemas for resources
//!
//! Each resource type declares the attributes it accepts, enabling
//! validation of a stack before anything is handed to the engine.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use heck::ToUpperCamelCase;

use crate::resource::{Resource, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Free-form document passed through verbatim (e.g., a policy document)
    Document,
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // Unresolved values become strings at provisioning time
            (
                AttributeType::String | AttributeType::Enum(_),
                Value::Ref(_) | Value::ResourceRef(_, _) | Value::Pseudo(_) | Value::Join(_, _),
            ) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                if v.is_unresolved() {
                    return Ok(());
                }
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Document, Value::Map(_)) => Ok(()),

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Document => "Document".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("No schema registered for resource type '{resource_type}'")]
    UnknownResourceType { resource_type: String },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Ref(id) => format!("Ref({})", id),
            Value::ResourceRef(id, attr) => format!("ResourceRef({}.{})", id, attr),
            Value::Pseudo(param) => format!("Pseudo({})", param.name()),
            Value::Join(_, _) => "Join".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub description: Option<String>,
    /// Engine-side property name (e.g., "CertificateSigningRequest")
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Property name used in the synthesized template
    pub fn property_name(&self) -> String {
        self.provider_name
            .clone()
            .unwrap_or_else(|| self.name.to_upper_camel_case())
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Template property name for an attribute
    pub fn property_name(&self, attribute: &str) -> String {
        self.attributes
            .get(attribute)
            .map(AttributeSchema::property_name)
            .unwrap_or_else(|| attribute.to_upper_camel_case())
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &BTreeMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        let mut required: Vec<&AttributeSchema> =
            self.attributes.values().filter(|s| s.required).collect();
        required.sort_by(|a, b| a.name.cmp(&b.name));
        for schema in required {
            if !attributes.contains_key(&schema.name) {
                errors.push(TypeError::MissingRequired {
                    name: schema.name.clone(),
                });
            }
        }

        // Type check each attribute
        for (name, value) in attributes {
            match self.attributes.get(name) {
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Schemas indexed by resource type
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ResourceSchema) {
        self.schemas.insert(schema.resource_type.clone(), schema);
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.schemas.get(resource_type)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Template property name for an attribute of the given resource type
    pub fn property_name(&self, resource_type: &str, attribute: &str) -> String {
        match self.get(resource_type) {
            Some(schema) => schema.property_name(attribute),
            None => attribute.to_upper_camel_case(),
        }
    }

    /// Validate a resource against its registered schema
    pub fn validate(&self, resource: &Resource) -> Result<(), Vec<TypeError>> {
        match self.get(&resource.id.resource_type) {
            Some(schema) => schema.validate(&resource.attributes),
            None => Err(vec![TypeError::UnknownResourceType {
                resource_type: resource.id.resource_type.clone(),
            }]),
        }
    }
}

impl FromIterator<ResourceSchema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = ResourceSchema>>(iter: I) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}

/// Helper functions for common types
pub mod types {
    use std::sync::LazyLock;

    use regex::Regex;

    use super::*;

    static NAME_PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9:_-]+$").expect("valid name pattern"));

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Non-empty string type
    pub fn non_empty_string() -> AttributeType {
        AttributeType::Custom {
            name: "NonEmptyString".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if value.is_empty() {
                    Err("Value must not be empty".to_string())
                } else {
                    Ok(())
                }
            },
        }
    }

    /// Resource name type (letters, digits, ':', '_' and '-', at most 128 characters)
    pub fn resource_name() -> AttributeType {
        AttributeType::Custom {
            name: "ResourceName".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_resource_name(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Validate a resource name (e.g., a thing or policy name)
    pub fn validate_resource_name(name: &str) -> Result<(), String> {
        if name.len() > 128 {
            return Err(format!(
                "Invalid name '{}': must be at most 128 characters",
                name
            ));
        }
        if NAME_PATTERN.is_match(name) {
            Ok(())
        } else {
            Err(format!(
                "Invalid name '{}': only letters, digits, ':', '_' and '-' are allowed",
                name
            ))
        }
    }
}
