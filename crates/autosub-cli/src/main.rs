//! Autosub - automation subscription deployer
//!
//! Usage:
//!   autosub precompute            # Show the deployment target and setup fee
//!   autosub deploy --fund 1000    # Deploy a subscription for the wallet's account
//!   autosub status <task-id>      # Query a deployment task
//!   autosub balances              # List asset balances of the target
//!   autosub config set <key> <v>  # Edit autosub.toml

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autosub_core::commands::{
    BalancesCommand, BalancesOptions, ConfigCommand, ConfigReport, DeployCommand, DeployOptions,
    DeployReport, PrecomputeCommand, PrecomputeOptions, StatusCommand, StatusOptions,
};
use autosub_core::config::ConfigScope;
use autosub_core::context::AppContext;
use autosub_core::deploy::ToggleMode;
use autosub_core::orchestration::SessionOutcome;
use autosub_core::policy::FundingInput;
use autosub_core::types::amount::{format_units, parse_amount};
use autosub_core::types::{Address, NATIVE_TOKEN};

#[derive(Parser)]
#[command(name = "autosub")]
#[command(about = "Automation subscription deployer", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the precomputed deployment target and setup fee
    Precompute {
        /// Subscription owner (defaults to the wallet's first account)
        #[arg(long)]
        owner: Option<Address>,

        /// Fee token (defaults to the configured fee token)
        #[arg(long)]
        fee_token: Option<Address>,

        /// Skip reading the target's balance
        #[arg(long)]
        no_balance: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Deploy an automation subscription
    Deploy(DeployArgs),

    /// Query the status of a deployment task
    Status {
        /// Task id returned by `deploy`
        task_id: String,

        /// Poll until the task settles
        #[arg(short, long)]
        watch: bool,

        /// Open the explorer link once the task settled
        #[arg(long)]
        open: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List asset balances
    Balances {
        /// Address to list (defaults to the owner's deployment target)
        #[arg(long)]
        holder: Option<Address>,

        /// Owner whose deployment target is listed
        #[arg(long)]
        owner: Option<Address>,

        /// Include zero balances and likely-scam tokens
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Read or edit autosub.toml
    Config(ConfigArgs),
}

#[derive(Args)]
struct DeployArgs {
    /// Subscription owner (defaults to the wallet's first account)
    #[arg(long)]
    owner: Option<Address>,

    /// Deposit into the sub-account, as `<amount>` for native currency or
    /// `<token>:<amount>` (amounts in the token's smallest unit)
    #[arg(long = "fund", value_parser = parse_funding)]
    funding: Vec<FundingInput>,

    /// When to grant the operator permission
    #[arg(long)]
    toggle_mode: Option<ToggleMode>,

    /// Open the explorer link after a successful deployment
    #[arg(long)]
    open: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration scope
    #[arg(long, default_value = "project", global = true)]
    scope: ConfigScope,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print one key
    Get { key: String },
    /// Set one key
    Set { key: String, value: String },
    /// Remove one key
    Unset { key: String },
    /// Print every key of the scope
    Show,
    /// Print the config file path of the scope
    Path,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// No output; the exit code reports the result
    Quiet,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "autosub=debug,autosub_core=debug,info"
    } else {
        "autosub=info,autosub_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = AppContext::from_current_dir()?;
    run_cli(ctx, cli.command).await
}

async fn run_cli(ctx: AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Precompute {
            owner,
            fee_token,
            no_balance,
            format,
        } => {
            let mut options = PrecomputeOptions::new().with_skip_balance(no_balance);
            if let Some(owner) = owner {
                options = options.with_owner(owner);
            }
            if let Some(fee_token) = fee_token {
                options = options.with_fee_token(fee_token);
            }
            run_precompute(ctx, options, format).await
        }
        Commands::Deploy(args) => run_deploy(ctx, args).await,
        Commands::Status {
            task_id,
            watch,
            open,
            format,
        } => run_status(ctx, task_id, watch, open, format).await,
        Commands::Balances {
            holder,
            owner,
            all,
            format,
        } => {
            let mut options = BalancesOptions::new().with_all(all);
            if let Some(holder) = holder {
                options = options.with_holder(holder);
            }
            if let Some(owner) = owner {
                options = options.with_owner(owner);
            }
            run_balances(ctx, options, format).await
        }
        Commands::Config(args) => run_config(ctx, args),
    }
}

// =============================================================================
// Precompute
// =============================================================================

async fn run_precompute(ctx: AppContext, options: PrecomputeOptions, format: OutputFormat) -> Result<()> {
    let report = PrecomputeCommand::new(ctx).execute(&options).await?;

    match format {
        OutputFormat::Table => {
            println!("Owner:    {}", report.owner);
            println!("Chain:    {}", report.chain_id);
            println!("Target:   {}", report.target);
            println!("Fee:      {} ({} wei)", report.fee_display, report.fee_estimate);
            match (report.target_balance, report.covered) {
                (Some(balance), Some(true)) => {
                    println!("Balance:  {} ✓ covers fee", format_units(balance, 18))
                }
                (Some(balance), _) => {
                    println!("Balance:  {} ⚠ below fee", format_units(balance, 18))
                }
                (None, _) => println!("Balance:  -"),
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

// =============================================================================
// Deploy
// =============================================================================

async fn run_deploy(ctx: AppContext, args: DeployArgs) -> Result<()> {
    let mut options = DeployOptions::new();
    if let Some(owner) = args.owner {
        options = options.with_owner(owner);
    }
    if let Some(mode) = args.toggle_mode {
        options = options.with_toggle_mode(mode);
    }
    for input in args.funding {
        options = options.with_funding(input);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, resetting session");
            interrupt.cancel();
        }
    });

    let report = DeployCommand::new(ctx)
        .with_cancel(cancel)
        .execute(&options)
        .await?;
    print_deploy_report(&report, args.format)?;

    if args.open
        && let Some(url) = report.explorer_url()
    {
        open::that(url).with_context(|| format!("Failed to open {}", url))?;
    }
    Ok(())
}

fn print_deploy_report(report: &DeployReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => match &report.outcome {
            SessionOutcome::Succeeded {
                task_id,
                tx_hash,
                explorer_url,
            } => {
                println!("✓ Automation deployed for {}", report.owner);
                if let Some(sub_account) = report.sub_account {
                    println!("  Sub-account: {}", sub_account);
                }
                println!("  Task:        {}", task_id);
                if let Some(hash) = tx_hash {
                    println!("  Transaction: {}", hash);
                }
                if let Some(url) = explorer_url {
                    println!("  Explorer:    {}", url);
                }
            }
            SessionOutcome::Declined => {
                println!("• Signature declined; nothing was deployed");
            }
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

// =============================================================================
// Status
// =============================================================================

async fn run_status(
    ctx: AppContext,
    task_id: String,
    watch: bool,
    open: bool,
    format: OutputFormat,
) -> Result<()> {
    let options = StatusOptions::new(task_id).with_watch(watch);
    let report = StatusCommand::new(ctx).execute(&options).await?;

    match format {
        OutputFormat::Table => {
            let marker = if report.terminal { "✓" } else { "•" };
            println!("{} Task {}: {}", marker, report.task_id, report.status);
            if let Some(hash) = report.tx_hash {
                println!("  Transaction: {}", hash);
            }
            if let Some(url) = &report.explorer_url {
                println!("  Explorer:    {}", url);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }

    if open
        && let Some(url) = &report.explorer_url
    {
        open::that(url).with_context(|| format!("Failed to open {}", url))?;
    }
    Ok(())
}

// =============================================================================
// Balances
// =============================================================================

async fn run_balances(ctx: AppContext, options: BalancesOptions, format: OutputFormat) -> Result<()> {
    let report = BalancesCommand::new(ctx).execute(&options).await?;

    match format {
        OutputFormat::Table => {
            println!("Balances of {}", report.holder);
            if report.assets.is_empty() {
                println!("  (none)");
            }
            for asset in &report.assets {
                println!(
                    "  {:<8} {:>24}  {}",
                    asset.symbol,
                    asset.display_value(),
                    asset.name
                );
            }
            if report.hidden > 0 {
                println!("  {} hidden (use --all to show)", report.hidden);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

// =============================================================================
// Config
// =============================================================================

fn run_config(ctx: AppContext, args: ConfigArgs) -> Result<()> {
    let cmd = ConfigCommand::new(ctx);
    let report = match &args.command {
        ConfigSubcommand::Get { key } => cmd.get(args.scope, key)?,
        ConfigSubcommand::Set { key, value } => cmd.set(args.scope, key, value)?,
        ConfigSubcommand::Unset { key } => cmd.unset(args.scope, key)?,
        ConfigSubcommand::Show | ConfigSubcommand::Path => cmd.show(args.scope)?,
    };

    if let ConfigSubcommand::Path = args.command {
        println!("{}", report.path.display());
        return Ok(());
    }
    print_config_report(&args.command, &report, args.format)
}

fn print_config_report(
    command: &ConfigSubcommand,
    report: &ConfigReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => match command {
            ConfigSubcommand::Set { key, .. } | ConfigSubcommand::Unset { key } => {
                if report.changed {
                    println!("✓ Updated '{}' in {} config", key, report.scope);
                } else {
                    println!("• '{}' unchanged in {} config", key, report.scope);
                }
            }
            _ => {
                for entry in &report.entries {
                    match &entry.value {
                        Some(value) => println!("{} = {}", entry.key, value),
                        None if report.entries.len() == 1 => println!("{} is not set", entry.key),
                        None => {}
                    }
                }
            }
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Parse `--fund` as `<amount>` (native currency) or `<token>:<amount>`.
fn parse_funding(raw: &str) -> Result<FundingInput, String> {
    let (token, amount) = match raw.split_once(':') {
        Some((token, amount)) => {
            let token = token
                .trim()
                .parse::<Address>()
                .map_err(|e| format!("invalid token address '{}': {}", token, e))?;
            (token, amount)
        }
        None => (NATIVE_TOKEN, raw),
    };
    let amount = parse_amount(amount)?;
    if amount.is_zero() {
        return Err("funding amount must be greater than zero".to_string());
    }
    Ok(FundingInput { token, amount })
}
