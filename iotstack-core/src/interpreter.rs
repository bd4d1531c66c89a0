//! Interpreter - Hand a synthesized template to a Provider
//!
//! The Interpreter reads the deployed state, computes the Plan, and submits
//! the template when there is something to change. This is where side
//! effects actually occur.

use log::info;

use crate::differ::create_plan;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderResult, StackState};
use crate::template::Template;

/// Result of a deployment
#[derive(Debug)]
pub enum DeployOutcome {
    /// Deployed template already matches
    NoChanges { state: StackState },
    /// Engine reached a successful terminal status
    Deployed { plan: Plan, state: StackState },
    /// Skipped (e.g., dry-run)
    Skipped { plan: Plan, reason: String },
}

/// Result of a teardown
#[derive(Debug, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Stack was not deployed
    NotFound,
    Destroyed,
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
}

/// Interpreter that submits templates using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Compute the Plan against the deployed stack
    pub async fn plan(&self, stack_name: &str, template: &Template) -> ProviderResult<Plan> {
        let current = self.provider.read(stack_name).await?;
        Ok(create_plan(template, current.template.as_ref()))
    }

    /// Deploy a template, skipping the engine when nothing changed
    pub async fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
    ) -> ProviderResult<DeployOutcome> {
        let current = self.provider.read(stack_name).await?;
        let plan = create_plan(template, current.template.as_ref());

        if current.is_settled() && plan.is_empty() && current.template.as_ref() == Some(template)
        {
            return Ok(DeployOutcome::NoChanges { state: current });
        }

        if self.config.dry_run {
            return Ok(DeployOutcome::Skipped {
                plan,
                reason: "dry-run mode".to_string(),
            });
        }

        info!(
            "submitting {} to {} ({})",
            stack_name,
            self.provider.name(),
            plan.summary()
        );
        let state = self.provider.deploy(stack_name, template).await?;
        Ok(DeployOutcome::Deployed { plan, state })
    }

    /// Delete a deployed stack
    pub async fn destroy(&self, stack_name: &str) -> ProviderResult<DestroyOutcome> {
        let current = self.provider.read(stack_name).await?;
        if !current.exists {
            return Ok(DestroyOutcome::NotFound);
        }

        if self.config.dry_run {
            return Ok(DestroyOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        info!("deleting {} via {}", stack_name, self.provider.name());
        self.provider.destroy(stack_name).await?;
        Ok(DestroyOutcome::Destroyed)
    }
}
