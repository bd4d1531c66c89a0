//! Resource - Representing declared resources and their attribute values

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use heck::ToUpperCamelCase;

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type (e.g., "AWS::IoT::Thing", "Custom::AWS")
    pub resource_type: String,
    /// Logical id of the resource within its stack (e.g., "CdkTtgo")
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Derive a template logical id from a construct id
/// e.g., "cdk-ttgo-certificate" -> "CdkTtgoCertificate"
pub fn logical_id(construct_id: &str) -> String {
    construct_id.to_upper_camel_case()
}

/// Parameters supplied by the provisioning engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    AccountId,
    Partition,
    Region,
    StackName,
    UrlSuffix,
}

impl PseudoParameter {
    pub fn name(&self) -> &'static str {
        match self {
            PseudoParameter::AccountId => "AWS::AccountId",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::StackName => "AWS::StackName",
            PseudoParameter::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// Attribute value of a resource
///
/// Concrete values (`String`, `Int`, `Bool`, `List`, `Map`) are known at
/// declaration time. `Ref`, `ResourceRef`, `Pseudo` and `Join` are unresolved:
/// they only become concrete once the provisioning engine substitutes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Primary identifier of another resource (logical id)
    Ref(String),
    /// Reference to another resource's attribute (logical id, attribute name)
    ResourceRef(String, String),
    /// Engine-supplied parameter such as the deployment region
    Pseudo(PseudoParameter),
    /// Concatenation of values with a separator, resolved by the engine
    Join(String, Vec<Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn join<I, V>(separator: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Join(separator.into(), parts.into_iter().map(Into::into).collect())
    }

    /// Returns true if this value (or anything nested in it) is only known
    /// once the provisioning engine resolves it
    pub fn is_unresolved(&self) -> bool {
        match self {
            Value::Ref(_) | Value::ResourceRef(_, _) | Value::Pseudo(_) | Value::Join(_, _) => {
                true
            }
            Value::List(items) => items.iter().any(Value::is_unresolved),
            Value::Map(map) => map.values().any(Value::is_unresolved),
            _ => false,
        }
    }

    /// Returns true for empty concrete strings, lists and maps
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Ref(id) | Value::ResourceRef(id, _) => id.is_empty(),
            Value::Join(_, parts) => parts.iter().all(Value::is_empty),
            _ => false,
        }
    }

    /// Collect logical ids of every resource this value refers to
    pub fn collect_references(&self, refs: &mut BTreeSet<String>) {
        match self {
            Value::Ref(id) | Value::ResourceRef(id, _) => {
                refs.insert(id.clone());
            }
            Value::List(items) | Value::Join(_, items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Value::Map(map) => {
                for v in map.values() {
                    v.collect_references(refs);
                }
            }
            _ => {}
        }
    }

    /// Render this value in the engine's template notation
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            Value::String(s) => json!(s),
            Value::Int(n) => json!(n),
            Value::Bool(b) => json!(b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Ref(id) => json!({ "Ref": id }),
            Value::ResourceRef(id, attr) => json!({ "Fn::GetAtt": [id, attr] }),
            Value::Pseudo(param) => json!({ "Ref": param.name() }),
            Value::Join(sep, parts) => {
                let parts: Vec<serde_json::Value> = parts.iter().map(Value::to_json).collect();
                json!({ "Fn::Join": [sep, parts] })
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<PseudoParameter> for Value {
    fn from(param: PseudoParameter) -> Self {
        Value::Pseudo(param)
    }
}

/// Convert a plain JSON document (e.g., a policy document) into a value.
/// Floats have no counterpart and are rendered as strings.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::String(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// What the engine does with the physical resource when it leaves the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl DeletionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionPolicy::Delete => "Delete",
            DeletionPolicy::Retain => "Retain",
            DeletionPolicy::Snapshot => "Snapshot",
        }
    }
}

/// Desired resource declared by a stack definition
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    /// Attributes keyed by snake_case name
    pub attributes: BTreeMap<String, Value>,
    /// Explicit dependency edges (logical ids)
    pub depends_on: BTreeSet<String>,
    pub deletion_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Logical ids referenced by attribute values
    pub fn implicit_dependencies(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        for value in self.attributes.values() {
            value.collect_references(&mut refs);
        }
        refs
    }

    /// Every logical id this resource needs to exist first
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = self.implicit_dependencies();
        deps.extend(self.depends_on.iter().cloned());
        deps
    }
}
