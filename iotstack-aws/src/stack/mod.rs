//! Stack definition
//!
//! Declares the three resource groups of the IoT stack in dependency order:
//!
//! - `device` - thing, certificate, policy and their attachments
//! - `users` - user pool, client, identity pool and its roles
//! - `frontend` - endpoint lookup, hosted app and branch
//!
//! Nothing here reads files or the environment; everything external comes in
//! through an already validated [`StackConfig`].

pub mod buildspec;
pub mod config;
pub mod device;
pub mod frontend;
pub mod policy;
pub mod sdk_call;
pub mod users;

use log::{debug, info};

use iotstack_core::resource::PseudoParameter;
use iotstack_core::stack::{GraphError, Stack};
use iotstack_core::template::Template;

use crate::schemas;
use config::{ConfigError, StackConfig};

pub const STACK_DESCRIPTION: &str = "IoT device identity, user identity and web frontend";

/// Errors raised while defining the stack
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Build the complete resource graph for a configuration
pub fn define_stack(config: &StackConfig) -> Result<Stack, StackError> {
    config.device_policy.validate()?;

    let mut stack = Stack::new(config.stack_name.as_str())?.with_description(STACK_DESCRIPTION);

    let device = device::declare(&mut stack, &config.csr, &config.device_policy)?;
    debug!("declared device identity around {}", device.thing.id);

    let users = users::declare(&mut stack)?;
    debug!("declared user identity around {}", users.identity_pool.id);

    let frontend = frontend::declare(&mut stack, &config.source, &config.branch, &users)?;
    debug!("declared frontend {}", frontend.app.id);

    let outputs = [
        (
            "IdentityPoolId",
            users.identity_pool.reference(),
            frontend::ENV_IDENTITY_POOL_ID,
        ),
        ("Region", PseudoParameter::Region.into(), frontend::ENV_REGION),
        (
            "UserPoolId",
            users.user_pool.reference(),
            frontend::ENV_USER_POOL_ID,
        ),
        (
            "UserPoolClientId",
            users.user_pool_client.reference(),
            frontend::ENV_USER_POOL_CLIENT_ID,
        ),
        (
            "IotEndpoint",
            frontend.endpoint_lookup.output(),
            frontend::ENV_IOT_ENDPOINT,
        ),
    ];
    for (name, value, variable) in outputs {
        stack.add_output(name, value, Some(variable))?;
    }
    stack.add_output(
        "AppDefaultDomain",
        frontend.app.attr("DefaultDomain"),
        Some("Domain the frontend is served from"),
    )?;

    stack.validate(&schemas::registry())?;

    info!(
        "defined stack {} with {} resources",
        stack.name(),
        stack.resources().len()
    );
    Ok(stack)
}

/// Define the stack and synthesize its template
pub fn synthesize(config: &StackConfig) -> Result<Template, StackError> {
    let stack = define_stack(config)?;
    Ok(Template::synthesize(&stack, &schemas::registry()))
}
