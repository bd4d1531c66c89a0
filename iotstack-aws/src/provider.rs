//! CloudFormation Provider implementation
//!
//! Submits synthesized templates to AWS CloudFormation and polls the stack
//! until it reaches a terminal status. Engine failures are reported with the
//! engine's own status reason and are never retried.

use std::time::Duration;

use aws_config::Region;
use aws_sdk_cloudformation::Client as CloudFormationClient;
use aws_sdk_cloudformation::types::Capability;
use log::{debug, info};

use iotstack_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, StackState};
use iotstack_core::template::Template;

const MAX_ATTEMPTS: usize = 120;
const POLL_DELAY: Duration = Duration::from_secs(5);

/// Where a stack status leaves an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    InProgress,
    Succeeded,
    Failed,
}

/// Classify a CloudFormation stack status
pub fn classify_status(status: &str) -> StackProgress {
    if status.ends_with("_IN_PROGRESS") {
        StackProgress::InProgress
    } else if status.ends_with("_FAILED") || status.contains("ROLLBACK") {
        StackProgress::Failed
    } else if status.ends_with("_COMPLETE") {
        StackProgress::Succeeded
    } else {
        StackProgress::Failed
    }
}

/// AWS CloudFormation Provider
pub struct CloudFormationProvider {
    client: CloudFormationClient,
    region: Option<String>,
}

impl CloudFormationProvider {
    /// Create a provider for the given region, or the SDK's default chain
    pub async fn new(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        Self {
            client: CloudFormationClient::new(&config),
            region: config.region().map(|r| r.to_string()),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    // =========================================================================
    // CloudFormation API Methods
    // =========================================================================

    /// Describe a stack; `None` if it does not exist
    async fn describe_stack(
        &self,
        stack_name: &str,
    ) -> ProviderResult<Option<aws_sdk_cloudformation::types::Stack>> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response.stacks().first().cloned()),
            Err(e) => {
                let err_str = format!("{:?}", e);
                if err_str.contains("does not exist") {
                    Ok(None)
                } else {
                    Err(ProviderError::new(format!("Failed to describe stack: {:?}", e))
                        .for_stack(stack_name))
                }
            }
        }
    }

    async fn get_template(&self, stack_name: &str) -> ProviderResult<Option<Template>> {
        let response = self
            .client
            .get_template()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to get template: {:?}", e)).for_stack(stack_name)
            })?;

        match response.template_body() {
            Some(body) => match Template::from_json(body) {
                Ok(template) => Ok(Some(template)),
                Err(e) => {
                    // Deployed from a non-JSON template; treat as unknown
                    debug!("deployed template of {} is not JSON: {}", stack_name, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn read_stack(&self, stack_name: &str) -> ProviderResult<StackState> {
        let Some(stack) = self.describe_stack(stack_name).await? else {
            return Ok(StackState::not_found(stack_name));
        };

        let status = stack
            .stack_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        if status == "DELETE_COMPLETE" {
            return Ok(StackState::not_found(stack_name));
        }

        let mut state = StackState::existing(stack_name, status);
        for output in stack.outputs() {
            if let (Some(key), Some(value)) = (output.output_key(), output.output_value()) {
                state = state.with_output(key, value);
            }
        }

        if let Some(template) = self.get_template(stack_name).await? {
            state = state.with_template(template);
        }
        Ok(state)
    }

    async fn create_stack(&self, stack_name: &str, body: String) -> ProviderResult<()> {
        self.client
            .create_stack()
            .stack_name(stack_name)
            .template_body(body)
            .capabilities(Capability::CapabilityIam)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to create stack: {:?}", e)).for_stack(stack_name)
            })?;
        Ok(())
    }

    /// Returns false if the engine reports nothing to update
    async fn update_stack(&self, stack_name: &str, body: String) -> ProviderResult<bool> {
        let result = self
            .client
            .update_stack()
            .stack_name(stack_name)
            .template_body(body)
            .capabilities(Capability::CapabilityIam)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let err_str = format!("{:?}", e);
                if err_str.contains("No updates are to be performed") {
                    Ok(false)
                } else {
                    Err(ProviderError::new(format!("Failed to update stack: {:?}", e))
                        .for_stack(stack_name))
                }
            }
        }
    }

    async fn delete_stack(&self, stack_name: &str) -> ProviderResult<()> {
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!("Failed to delete stack: {:?}", e)).for_stack(stack_name)
            })?;
        Ok(())
    }

    /// Wait for the stack to reach a terminal status
    ///
    /// A stack that disappears while waiting counts as success, which is what
    /// a deletion ends in.
    async fn wait_for_stack(&self, stack_name: &str) -> ProviderResult<()> {
        for _ in 0..MAX_ATTEMPTS {
            let Some(stack) = self.describe_stack(stack_name).await? else {
                return Ok(());
            };
            let status = stack
                .stack_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default();

            match classify_status(&status) {
                StackProgress::Succeeded => return Ok(()),
                StackProgress::Failed => {
                    let reason = stack.stack_status_reason().unwrap_or("no reason given");
                    return Err(ProviderError::new(format!("{}: {}", status, reason))
                        .for_stack(stack_name));
                }
                StackProgress::InProgress => {
                    debug!("{} is {}", stack_name, status);
                    tokio::time::sleep(POLL_DELAY).await;
                }
            }
        }

        Err(ProviderError::new("Timed out waiting for a terminal status").for_stack(stack_name))
    }

    // =========================================================================
    // Stack Operations
    // =========================================================================

    pub async fn deploy_stack(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> ProviderResult<StackState> {
        let body = template.to_json_pretty().map_err(|e| {
            ProviderError::new("Failed to serialize template")
                .for_stack(stack_name)
                .with_cause(e)
        })?;

        let current = self.describe_stack(stack_name).await?;
        let status = current
            .as_ref()
            .and_then(|s| s.stack_status())
            .map(|s| s.as_str().to_string());

        match status.as_deref() {
            None | Some("DELETE_COMPLETE") => {
                info!("creating stack {}", stack_name);
                self.create_stack(stack_name, body).await?;
                self.wait_for_stack(stack_name).await?;
            }
            Some("ROLLBACK_COMPLETE") => {
                return Err(ProviderError::new(
                    "ROLLBACK_COMPLETE: the stack failed to create and must be destroyed first",
                )
                .for_stack(stack_name));
            }
            Some(_) => {
                info!("updating stack {}", stack_name);
                if self.update_stack(stack_name, body).await? {
                    self.wait_for_stack(stack_name).await?;
                } else {
                    info!("{} is already up to date", stack_name);
                }
            }
        }

        self.read_stack(stack_name).await
    }

    pub async fn destroy_stack(&self, stack_name: &str) -> ProviderResult<()> {
        info!("deleting stack {}", stack_name);
        self.delete_stack(stack_name).await?;
        self.wait_for_stack(stack_name).await
    }
}

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for CloudFormationProvider {
    fn name(&self) -> &'static str {
        "cloudformation"
    }

    fn read(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<StackState>> {
        let stack_name = stack_name.to_string();
        Box::pin(async move { self.read_stack(&stack_name).await })
    }

    fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> BoxFuture<'_, ProviderResult<StackState>> {
        let stack_name = stack_name.to_string();
        let template = template.clone();
        Box::pin(async move { self.deploy_stack(&stack_name, &template).await })
    }

    fn destroy(&self, stack_name: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let stack_name = stack_name.to_string();
        Box::pin(async move { self.destroy_stack(&stack_name).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_statuses_keep_polling() {
        for status in [
            "CREATE_IN_PROGRESS",
            "UPDATE_IN_PROGRESS",
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            "DELETE_IN_PROGRESS",
            "ROLLBACK_IN_PROGRESS",
        ] {
            assert_eq!(classify_status(status), StackProgress::InProgress, "{}", status);
        }
    }

    #[test]
    fn completed_statuses_succeed() {
        for status in ["CREATE_COMPLETE", "UPDATE_COMPLETE", "DELETE_COMPLETE"] {
            assert_eq!(classify_status(status), StackProgress::Succeeded, "{}", status);
        }
    }

    #[test]
    fn rollbacks_and_failures_are_terminal_errors() {
        for status in [
            "CREATE_FAILED",
            "ROLLBACK_COMPLETE",
            "ROLLBACK_FAILED",
            "UPDATE_ROLLBACK_COMPLETE",
            "DELETE_FAILED",
        ] {
            assert_eq!(classify_status(status), StackProgress::Failed, "{}", status);
        }
    }
}
