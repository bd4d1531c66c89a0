//! Policy documents shared by IoT and IAM resources

use serde::{Deserialize, Serialize};

use iotstack_core::resource::Value;

use super::config::ConfigError;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEffect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: PolicyEffect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

impl PolicyStatement {
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: PolicyEffect::Allow,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
        }
    }
}

/// Permission document (effect/action/resource statements)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: statements,
        }
    }

    /// Every IoT action on every resource
    pub fn iot_full_access() -> Self {
        Self::new(vec![PolicyStatement::allow(["iot:*"], ["*"])])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.statement.is_empty() {
            return Err(ConfigError::InvalidPolicy(
                "at least one statement is required".to_string(),
            ));
        }
        for (i, statement) in self.statement.iter().enumerate() {
            if statement.action.is_empty() || statement.action.iter().any(|a| a.trim().is_empty())
            {
                return Err(ConfigError::InvalidPolicy(format!(
                    "statement {} has an empty action",
                    i
                )));
            }
            if statement.resource.is_empty()
                || statement.resource.iter().any(|r| r.trim().is_empty())
            {
                return Err(ConfigError::InvalidPolicy(format!(
                    "statement {} has an empty resource",
                    i
                )));
            }
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        // Only strings and sequences, so serialization cannot fail
        Value::from(serde_json::to_value(self).unwrap_or_default())
    }
}
