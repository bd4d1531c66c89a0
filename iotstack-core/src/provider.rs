//! Provider - Trait abstracting the provisioning engine
//!
//! A Provider hands synthesized templates to an engine (e.g., CloudFormation)
//! and reports what the engine has deployed. Provisioning, rollback and
//! retries are the engine's business; errors are surfaced as-is.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::template::Template;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub stack_name: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref stack) = self.stack_name {
            write!(f, "[{}] {}", stack, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_name: None,
            cause: None,
        }
    }

    pub fn for_stack(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = Some(stack_name.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Deployed state of a stack as reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct StackState {
    pub stack_name: String,
    /// Whether the stack exists
    pub exists: bool,
    /// Engine status (e.g., "CREATE_COMPLETE")
    pub status: Option<String>,
    /// Template the engine last accepted
    pub template: Option<Template>,
    /// Resolved stack outputs
    pub outputs: BTreeMap<String, String>,
}

impl StackState {
    pub fn not_found(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            exists: false,
            status: None,
            template: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn existing(stack_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            exists: true,
            status: Some(status.into()),
            template: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Returns true if the engine finished its last operation successfully
    ///
    /// Rolled back, failed and in-progress stacks are not settled, even when
    /// the engine still reports the last submitted template.
    pub fn is_settled(&self) -> bool {
        self.exists
            && self
                .status
                .as_deref()
                .is_some_and(|s| s.ends_with("_COMPLETE") && !s.contains("ROLLBACK"))
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects on the engine.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "cloudformation")
    fn name(&self) -> &'static str;

    /// Get the deployed state of a stack
    ///
    /// Returns `StackState::not_found()` if the stack does not exist.
    fn read(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<StackState>>;

    /// Create or update a stack from a template and wait for a terminal status
    fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> BoxFuture<'_, ProviderResult<StackState>>;

    /// Delete a stack and wait until it is gone
    fn destroy(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<StackState>> {
        (**self).read(stack_name)
    }

    fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> BoxFuture<'_, ProviderResult<StackState>> {
        (**self).deploy(stack_name, template)
    }

    fn destroy(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).destroy(stack_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_stack() {
        let err = ProviderError::new("Operation failed: ROLLBACK_COMPLETE").for_stack("IoTStack");
        assert_eq!(err.to_string(), "[IoTStack] Operation failed: ROLLBACK_COMPLETE");
        assert_eq!(ProviderError::new("boom").to_string(), "boom");
    }

    #[test]
    fn only_successful_terminal_statuses_are_settled() {
        for status in ["CREATE_COMPLETE", "UPDATE_COMPLETE", "IMPORT_COMPLETE"] {
            assert!(StackState::existing("IoTStack", status).is_settled(), "{}", status);
        }
        for status in [
            "ROLLBACK_COMPLETE",
            "ROLLBACK_FAILED",
            "UPDATE_ROLLBACK_COMPLETE",
            "UPDATE_ROLLBACK_FAILED",
            "CREATE_IN_PROGRESS",
            "DELETE_FAILED",
        ] {
            assert!(!StackState::existing("IoTStack", status).is_settled(), "{}", status);
        }
        assert!(!StackState::not_found("IoTStack").is_settled());
    }

    #[test]
    fn error_exposes_cause() {
        use std::error::Error;

        let io = std::io::Error::other("socket closed");
        let err = ProviderError::new("Failed to describe stack").with_cause(io);
        assert!(err.source().is_some());
    }
}
