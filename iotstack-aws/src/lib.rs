//! IoT Stack AWS
//!
//! AWS side of the IoT stack.
//!
//! ## Module Structure
//!
//! - `schemas` - CloudFormation resource schemas used for validation and synthesis
//! - `stack` - Configuration loading and the stack definition itself
//! - `provider` - CloudFormationProvider implementation

pub mod provider;
pub mod schemas;
pub mod stack;

// Re-export main types
pub use provider::CloudFormationProvider;
pub use stack::config::{ConfigError, StackConfig};
pub use stack::{StackError, define_stack};
