//! cosmup is a CLI tool to deploy and wire up CosmWasm contracts from declarative recipes.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use strum::IntoEnumIterator;

use cli::{Cli, Command};
use cosmup_deploy::{
    Actor, CONFIG_FILENAME, DeployConfig, DryRunGateway, Gateway, Orchestrator, Recipe,
    RecipeKind, RpcGateway, RunReport, payload, summary_table,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Command::List => {
            for kind in RecipeKind::iter() {
                println!("{:<22}{}", kind.to_string(), kind.description());
            }
        }
        Command::Encode { json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("Message is not valid JSON")?;
            println!("{}", payload::encode(&value)?);
        }
        Command::Decode { data } => {
            let value = payload::decode(&data)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::InitConfig { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, pass --force to overwrite it",
                    path.display()
                );
            }
            DeployConfig::default().save_to_file(&path)?;
        }
        Command::Plan { recipe } => {
            let config = DeployConfig::load(cli.config.as_deref())?;
            let actor = config.actor()?;
            let recipe = build_recipe(&config, recipe, actor)?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        Command::Run {
            recipe,
            dry_run,
            resume,
        } => {
            let config = DeployConfig::load(cli.config.as_deref())?;
            run(&config, recipe, dry_run, resume).await?;
        }
    }

    Ok(())
}

fn build_recipe(config: &DeployConfig, kind: RecipeKind, actor: Actor) -> Result<Recipe> {
    kind.build(config, &config.recipe_context(actor))
        .with_context(|| format!("Failed to build recipe {kind}"))
}

async fn run(config: &DeployConfig, kind: RecipeKind, dry_run: bool, resume: bool) -> Result<()> {
    let actor = config.actor()?;
    let recipe = build_recipe(config, kind, actor.clone())?;

    // Dry runs keep their own report so they never shadow a real one.
    let report_path = if dry_run {
        config.report_path(&format!("{}.dry-run", recipe.name()))
    } else {
        config.report_path(recipe.name())
    };

    let previous = if resume {
        let previous = RunReport::load_from_file(&report_path)
            .context("Cannot resume without a previous report")?;
        tracing::info!(
            path = %report_path.display(),
            completed = previous.completed.len(),
            "Loaded previous run report"
        );
        Some(previous)
    } else {
        None
    };

    let report = if dry_run {
        let gateway = dry_run_gateway(config, &recipe, &actor);
        execute(Orchestrator::new(gateway, actor), &recipe, previous.as_ref()).await?
    } else {
        let gateway = RpcGateway::new(&config.network)?;
        tracing::info!(
            rpc_url = %config.network.rpc_url,
            chain_id = %config.network.chain_id,
            "Using remote execution client"
        );
        execute(Orchestrator::new(gateway, actor), &recipe, previous.as_ref()).await?
    };

    save_report(&report, &report_path)?;
    println!("{}", summary_table(&report));

    if let Some(failure) = &report.failure {
        anyhow::bail!(
            "Step {} ({}) of recipe {} failed: {}. Fix the cause and re-run with --resume to continue from it.",
            failure.index,
            failure.name,
            report.recipe,
            failure.error
        );
    }

    tracing::info!(recipe = %report.recipe, path = %report_path.display(), "Recipe completed");
    Ok(())
}

/// An in-memory ledger that already holds the configured code ids and every
/// contract the recipe targets, administered by the actor.
fn dry_run_gateway(config: &DeployConfig, recipe: &Recipe, actor: &Actor) -> DryRunGateway {
    let gateway =
        DryRunGateway::new(config.network.address_prefix.as_str()).with_codes(config.code_ids.all());

    recipe
        .external_contracts()
        .into_iter()
        .fold(gateway, |gateway, address| {
            gateway.with_contract(
                address.clone(),
                config.code_ids.presale,
                Some(actor.to_string()),
            )
        })
}

async fn execute<G: Gateway>(
    orchestrator: Orchestrator<G>,
    recipe: &Recipe,
    previous: Option<&RunReport>,
) -> Result<RunReport> {
    match previous {
        Some(previous) => orchestrator.resume(recipe, previous).await,
        None => Ok(orchestrator.run(recipe).await),
    }
}

fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create report directory {}", parent.display()))?;
    }
    report.save_to_file(path)?;
    tracing::debug!(path = %path.display(), "Run report saved");
    Ok(())
}
