use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use delivery_runner::host::{Container, HostConfig, MemoryContainer, ModuleCatalog, RunnerComponent};
use delivery_runner::providers::{AreaMap, MemoryDataHolder};
use delivery_runner::{ItemStage, PluginDefinition, RunnerFactory, RunnerProvider, Stage};

#[derive(Parser)]
#[command(name = "delivery-runner")]
#[command(about = "Test delivery runner orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a session with the built-in demo providers and walk through items
    Run {
        #[arg(short, long, help = "Host configuration file (json, toml or yaml)")]
        config: PathBuf,
        #[arg(help = "Item references to deliver")]
        items: Vec<String>,
    },
    /// Validate a host configuration and print the selected providers
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, items } => run_session(&config, &items).await?,
        Commands::Check { config } => check_config(&config)?,
    }

    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let config = HostConfig::from_path(path)?;

    println!("Service call: {}", config.service_call_id);
    for kind in config.providers.keys() {
        match config.selected_provider(kind) {
            Some(name) => println!("  {}: {}", kind, name),
            None => println!("  {}: <none>", kind),
        }
    }
    Ok(())
}

fn demo_catalog() -> ModuleCatalog {
    let provider = RunnerProvider::new()
        .area_broker(|_| Arc::new(AreaMap::new().with_area("content", "content-area")))
        .data_holder(|_| Arc::new(MemoryDataHolder::new()))
        .stage(Stage::Init, |runner| async move {
            println!("[{}] init", runner.id());
            Ok(())
        })
        .item(ItemStage::LoadItem, |_, item_ref, _| async move {
            Ok(json!({ "ref": item_ref, "body": format!("Content of {}", item_ref) }))
        })
        .item(ItemStage::RenderItem, |_, item_ref, data| async move {
            println!("Rendering {}: {}", item_ref, data["body"]);
            Ok(Value::Null)
        });

    let timer = PluginDefinition::new("timer").hook(Stage::Render, |context| async move {
        println!("Plugin {} config: {}", context.name(), context.config());
        Ok(())
    });

    ModuleCatalog::new()
        .with_runner("demo-runner", provider)
        .with_plugin("demo-timer", timer.factory())
}

async fn run_session(path: &Path, items: &[String]) -> Result<()> {
    let config = HostConfig::from_path(path)?;
    let container = Arc::new(MemoryContainer::new());
    let mount: Arc<dyn Container> = container.clone();

    let component = RunnerComponent::new(
        Some(mount),
        serde_json::to_value(&config)?,
        RunnerFactory::new(),
        Arc::new(demo_catalog()),
    )?;

    component
        .on("error", |_, event| async move {
            eprintln!("Error: {}", event.arg_str(0).unwrap_or("unknown"));
            Ok(())
        })
        .on("ready", |_, _| async move {
            println!("Runner ready");
            Ok(())
        });

    component.init().await;

    let runner = component
        .runner()
        .ok_or_else(|| anyhow!("The runner could not be started"))?;
    println!("Session {} mounted in {:?}", config.service_call_id, component.element());

    for item in items {
        runner.load_item(item).await;
        runner.unload_item(item).await;
    }

    runner.finish().await;
    component.destroy().await;
    println!("Session closed, {} element(s) left", container.elements().len());

    Ok(())
}
