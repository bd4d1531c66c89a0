//! Effect - A change the engine will make to one resource

use crate::resource::ResourceId;

/// Change to a single resource of a deployed stack
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Resource is new to the stack
    Create(ResourceId),
    /// Resource exists with different properties
    Update {
        id: ResourceId,
        changed_attributes: Vec<String>,
    },
    /// Resource type changed, so the engine replaces it
    Replace { from: ResourceId, to: ResourceId },
    /// Resource is no longer declared
    Delete(ResourceId),
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Create(id) | Effect::Delete(id) => id,
            Effect::Update { id, .. } => id,
            Effect::Replace { to, .. } => to,
        }
    }

    /// Returns true if this effect removes a physical resource
    pub fn is_destructive(&self) -> bool {
        matches!(self, Effect::Delete(_) | Effect::Replace { .. })
    }
}
