use clap::{Parser, Subcommand};
use cw_core::{ChainId, ChainRecord, DesiredState, NoopPersister, Plan, TracingContext};
use cw_ipt::{ChainManager, Executor, SaveFilePersister, SystemRunner};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cwarden")]
#[command(version, about = "Declarative iptables chain reconciliation", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chains currently defined on this host
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show planned changes without applying
    Plan {
        #[arg(short, long, default_value = "chains.yaml")]
        file: String,
    },
    /// Apply a chain document
    Apply {
        #[arg(short, long, default_value = "chains.yaml")]
        file: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the rules that purging a chain would remove
    Purge {
        /// Chain resource name, e.g. INPUT:filter:IPv4
        name: String,
        /// Comment pattern to keep (repeatable)
        #[arg(long)]
        ignore: Vec<String>,
        /// Keep rules without a numeric comment prefix
        #[arg(long)]
        ignore_foreign: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::List { json } => list_chains(json)?,
        Commands::Plan { file } => show_plan(&file)?,
        Commands::Apply { file, dry_run } => apply_chains(&file, dry_run)?,
        Commands::Purge {
            name,
            ignore,
            ignore_foreign,
        } => show_purge(&name, ignore, ignore_foreign)?,
    }

    Ok(())
}

fn read_only_manager() -> ChainManager<SystemRunner, NoopPersister> {
    ChainManager::new(SystemRunner::new(), NoopPersister)
}

fn list_chains(json: bool) -> anyhow::Result<()> {
    let records = read_only_manager().get(&TracingContext)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Chains ({}):", records.len());
    for record in &records {
        let policy = record.policy.map(|p| p.as_str()).unwrap_or("-");
        println!("  • {} [{}]", record.name, policy);
    }

    Ok(())
}

fn show_plan(file: &str) -> anyhow::Result<()> {
    let desired = DesiredState::from_file(Path::new(file))?;
    let current = read_only_manager().get(&TracingContext)?;

    let plan = Plan::build(&desired.chains, &current);
    if plan.is_empty() {
        println!("✅ All chains in sync");
    } else {
        plan.display();
    }

    Ok(())
}

fn apply_chains(file: &str, dry_run: bool) -> anyhow::Result<()> {
    let desired = DesiredState::from_file(Path::new(file))?;
    let manager = ChainManager::new(
        SystemRunner::new(),
        SaveFilePersister::new(SystemRunner::new(), desired.persist.clone()),
    );
    let ctx = TracingContext;

    let current = manager.get(&ctx)?;
    let plan = Plan::build(&desired.chains, &current);
    if plan.is_empty() {
        println!("✅ All chains in sync");
        return Ok(());
    }
    plan.display();

    let report = Executor::new(&manager, dry_run).execute(&ctx, &plan);

    if !report.purges.is_empty() {
        println!("\nRules to purge ({}):", report.purges.len());
        for purge in &report.purges {
            println!("  • {} '{}'", purge.chain, purge.name);
            println!("    {}", purge.rule);
        }
    }

    for (name, reason) in &report.failures {
        println!("❌ {}: {}", name, reason);
    }

    if !report.is_success() {
        anyhow::bail!("{} chain(s) failed to apply", report.failures.len());
    }

    println!("✅ Applied {} action(s)", report.applied);
    Ok(())
}

fn show_purge(name: &str, ignore: Vec<String>, ignore_foreign: bool) -> anyhow::Result<()> {
    let id: ChainId = name.parse()?;
    let mut should = ChainRecord::new(id);
    should.purge = true;
    should.ignore = ignore;
    should.ignore_foreign = ignore_foreign;

    let purges = read_only_manager().generate(&TracingContext, &should.name, None, &should)?;

    println!("Rules to purge from {} ({}):", should.name, purges.len());
    for purge in &purges {
        println!("  • {}", purge.name);
    }

    Ok(())
}
