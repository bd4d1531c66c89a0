//! Plan - Collection of Effects
//!
//! A Plan lists the per-resource changes a deployment would make, plus
//! stack-level changes (outputs, description) that touch no resource.
//! No side effects occur until the template is handed to the engine.

use crate::effect::Effect;

/// Plan containing Effects the engine would carry out
#[derive(Debug, Clone, Default)]
pub struct Plan {
    effects: Vec<Effect>,
    stack_changes: Vec<String>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Record a changed stack-level field (e.g., "Outputs.IotEndpoint")
    pub fn add_stack_change(&mut self, field: impl Into<String>) {
        self.stack_changes.push(field.into());
    }

    pub fn stack_changes(&self) -> &[String] {
        &self.stack_changes
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.stack_changes.is_empty()
    }

    /// Number of Effects that remove a physical resource
    pub fn destructive_count(&self) -> usize {
        self.effects.iter().filter(|e| e.is_destructive()).count()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            stack: self.stack_changes.len(),
            ..Default::default()
        };
        for effect in &self.effects {
            match effect {
                Effect::Create(_) => summary.create += 1,
                Effect::Update { .. } => summary.update += 1,
                Effect::Replace { .. } => summary.replace += 1,
                Effect::Delete(_) => summary.delete += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    /// Changed outputs and description
    pub stack: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )?;
        if self.stack > 0 {
            write!(f, ", {} stack-level changes", self.stack)?;
        }
        Ok(())
    }
}
