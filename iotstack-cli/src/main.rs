use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::debug;
use similar::{ChangeTag, TextDiff};

use iotstack_aws::CloudFormationProvider;
use iotstack_aws::schemas;
use iotstack_aws::stack::config::{DEFAULT_CSR_PATH, DEFAULT_STACK_NAME, StackConfig};
use iotstack_aws::stack::define_stack;
use iotstack_aws::stack::policy::{PolicyDocument, PolicyStatement};
use iotstack_core::differ::create_plan;
use iotstack_core::effect::Effect;
use iotstack_core::interpreter::{DeployOutcome, DestroyOutcome, Interpreter};
use iotstack_core::plan::Plan;
use iotstack_core::provider::{Provider, StackState};
use iotstack_core::stack::Stack;
use iotstack_core::template::Template;

/// Resource properties masked whenever a template is printed
const SECRET_PROPERTIES: &[&str] = &["OauthToken"];
const MASK: &str = "****";

#[derive(Parser)]
#[command(name = "iotstack")]
#[command(about = "Provision an IoT device, its users and their web frontend", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: StackOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StackOptions {
    /// Name of the deployed stack
    #[arg(long, global = true, default_value = DEFAULT_STACK_NAME)]
    stack_name: String,

    /// Path to the device's certificate signing request
    #[arg(long, global = true, default_value = DEFAULT_CSR_PATH)]
    csr: PathBuf,

    /// AWS region (defaults to the SDK's configuration chain)
    #[arg(long, global = true)]
    region: Option<String>,

    /// IoT action granted to the device (repeatable, default iot:*)
    #[arg(long = "policy-action", global = true)]
    policy_actions: Vec<String>,

    /// IoT resource the device may act on (repeatable, default *)
    #[arg(long = "policy-resource", global = true)]
    policy_resources: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the synthesized template (repository token masked)
    Synth {
        /// Write the deployable <stack>.template.json into this directory
        /// instead. The file contains the repository token.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate the configuration and the resource graph
    Validate,
    /// Show what a deployment would change
    Plan,
    /// Create or update the stack
    Deploy,
    /// Delete the stack
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Synth { output } => run_synth(&cli.options, output.as_deref()),
        Commands::Validate => run_validate(&cli.options),
        Commands::Plan => run_plan(&cli.options).await,
        Commands::Deploy => run_deploy(&cli.options).await,
        Commands::Destroy { auto_approve } => run_destroy(&cli.options, auto_approve).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Device policy from `--policy-action` / `--policy-resource`, if any was given
fn device_policy_override(options: &StackOptions) -> Option<PolicyDocument> {
    if options.policy_actions.is_empty() && options.policy_resources.is_empty() {
        return None;
    }
    let actions = if options.policy_actions.is_empty() {
        vec!["iot:*".to_string()]
    } else {
        options.policy_actions.clone()
    };
    let resources = if options.policy_resources.is_empty() {
        vec!["*".to_string()]
    } else {
        options.policy_resources.clone()
    };
    Some(PolicyDocument::new(vec![PolicyStatement::allow(
        actions, resources,
    )]))
}

fn load_config(options: &StackOptions) -> Result<StackConfig, String> {
    let mut config = StackConfig::load(&options.stack_name, &options.csr)
        .map_err(|e| format!("Configuration error: {}", e))?;
    if let Some(policy) = device_policy_override(options) {
        config = config
            .with_device_policy(policy)
            .map_err(|e| format!("Configuration error: {}", e))?;
    }
    Ok(config)
}

fn load_stack(options: &StackOptions) -> Result<Stack, String> {
    let config = load_config(options)?;
    define_stack(&config).map_err(|e| e.to_string())
}

fn synthesize(stack: &Stack) -> Template {
    Template::synthesize(stack, &schemas::registry())
}

fn template_path(dir: &Path, stack_name: &str) -> PathBuf {
    dir.join(format!("{}.template.json", stack_name))
}

/// Copy of a template with secret properties replaced by a mask
fn redact_secrets(template: &Template) -> Template {
    let mut redacted = template.clone();
    for resource in redacted.resources.values_mut() {
        for property in SECRET_PROPERTIES {
            if let Some(value) = resource.properties.get_mut(*property) {
                *value = MASK.into();
            }
        }
    }
    redacted
}

fn run_synth(options: &StackOptions, output: Option<&Path>) -> Result<(), String> {
    let stack = load_stack(options)?;
    let template = synthesize(&stack);

    match output {
        Some(dir) => {
            let body = template
                .to_json_pretty()
                .map_err(|e| format!("Failed to serialize template: {}", e))?;
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
            let path = template_path(dir, stack.name());
            fs::write(&path, body)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!(
                "{}",
                format!("✓ Wrote {}", path.display()).green().bold()
            );
        }
        None => {
            let body = redact_secrets(&template)
                .to_json_pretty()
                .map_err(|e| format!("Failed to serialize template: {}", e))?;
            println!("{}", body);
        }
    }
    Ok(())
}

fn run_validate(options: &StackOptions) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let stack = load_stack(options)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            stack.resources().len()
        )
        .green()
        .bold()
    );

    for resource in stack.sorted() {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(options: &StackOptions) -> Result<(), String> {
    let stack = load_stack(options)?;
    let template = synthesize(&stack);

    let provider = CloudFormationProvider::new(options.region.as_deref()).await;
    let current = provider
        .read(stack.name())
        .await
        .map_err(|e| format!("Failed to read stack: {}", e))?;

    let plan = create_plan(&template, current.template.as_ref());
    print_plan(&plan);

    if let Some(deployed) = &current.template
        && !plan.is_empty()
    {
        print_diff(stack.name(), deployed, &template)?;
    }
    Ok(())
}

async fn run_deploy(options: &StackOptions) -> Result<(), String> {
    let stack = load_stack(options)?;
    let template = synthesize(&stack);

    let provider = CloudFormationProvider::new(options.region.as_deref()).await;
    debug!("deploying to region {:?}", provider.region());
    let interpreter = Interpreter::new(provider);

    let plan = interpreter
        .plan(stack.name(), &template)
        .await
        .map_err(|e| format!("Failed to read stack: {}", e))?;
    if !plan.is_empty() {
        print_plan(&plan);
        println!("{}", "Deploying...".cyan().bold());
    }

    let outcome = interpreter
        .deploy(stack.name(), &template)
        .await
        .map_err(|e| format!("Deployment failed: {}", e))?;

    match outcome {
        DeployOutcome::NoChanges { state } => {
            println!("{}", "No changes. Stack is up-to-date.".green());
            print_outputs(&state);
        }
        DeployOutcome::Deployed { plan, state } => {
            println!(
                "{}",
                format!(
                    "✓ {} is {}. {}.",
                    state.stack_name,
                    state.status.as_deref().unwrap_or("deployed"),
                    plan.summary()
                )
                .green()
                .bold()
            );
            print_outputs(&state);
        }
        DeployOutcome::Skipped { reason, .. } => {
            println!("{}", format!("Skipped: {}", reason).yellow());
        }
    }
    Ok(())
}

async fn run_destroy(options: &StackOptions, auto_approve: bool) -> Result<(), String> {
    let provider = CloudFormationProvider::new(options.region.as_deref()).await;
    let current = provider
        .read(&options.stack_name)
        .await
        .map_err(|e| format!("Failed to read stack: {}", e))?;

    if !current.exists {
        println!("{}", "No stack to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    if let Some(template) = &current.template {
        for id in template.resource_ids() {
            println!("  {} {}", "-".red().bold(), format_effect(&Effect::Delete(id)));
        }
    } else {
        println!("  {} stack {}", "-".red().bold(), options.stack_name);
    }
    println!();

    if !auto_approve {
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    println!("{}", "Destroying...".red().bold());
    let interpreter = Interpreter::new(provider);
    let outcome = interpreter
        .destroy(&options.stack_name)
        .await
        .map_err(|e| format!("Destroy failed: {}", e))?;

    match outcome {
        DestroyOutcome::Destroyed => println!(
            "{}",
            format!("✓ {} destroyed.", options.stack_name).green().bold()
        ),
        DestroyOutcome::NotFound => println!("{}", "No stack to destroy.".green()),
        DestroyOutcome::Skipped { reason } => {
            println!("{}", format!("Skipped: {}", reason).yellow())
        }
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Stack is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let marker = match effect {
            Effect::Create(_) => "+".green().bold(),
            Effect::Update { .. } => "~".yellow().bold(),
            Effect::Replace { .. } => "-/+".magenta().bold(),
            Effect::Delete(_) => "-".red().bold(),
        };
        println!("  {} {}", marker, format_effect(effect));

        if let Effect::Update {
            changed_attributes, ..
        } = effect
        {
            for attribute in changed_attributes {
                println!("      {} {}", "~".yellow(), attribute);
            }
        }
    }

    for field in plan.stack_changes() {
        println!("  {} {}", "~".yellow().bold(), field);
    }

    println!();
    let summary = plan.summary();
    print!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
    if summary.stack > 0 {
        print!(", {} stack-level changes", summary.stack.to_string().yellow());
    }
    println!(".");
    println!();
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(id) => format!("Create {}", id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Replace { from, to } => format!("Replace {} with {}", from, to),
        Effect::Delete(id) => format!("Delete {}", id),
    }
}

fn print_outputs(state: &StackState) {
    if state.outputs.is_empty() {
        return;
    }
    println!();
    println!("{}", "Outputs:".cyan().bold());
    for (key, value) in &state.outputs {
        println!("  {} = {}", key.bold(), value);
    }
}

fn print_diff(stack_name: &str, deployed: &Template, desired: &Template) -> Result<(), String> {
    let original = redact_secrets(deployed)
        .to_json_pretty()
        .map_err(|e| e.to_string())?;
    let updated = redact_secrets(desired)
        .to_json_pretty()
        .map_err(|e| e.to_string())?;

    println!("{} {}:", "Template diff for".cyan().bold(), stack_name);

    let diff = TextDiff::from_lines(&original, &updated);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => continue,
        };
        print!("{}{}", sign, change);
    }
    Ok(())
}
