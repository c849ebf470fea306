use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use facesort_core::bridge::BridgeClient;
use facesort_core::settings::{brackets, classify, SettingKind, SettingsPatch, SortSettings};
use facesort_host::config::HostConfig;
use facesort_host::engine::UnavailableEngine;
use facesort_host::service::spawn_host;

#[derive(Parser)]
#[command(name = "facesort", about = "Face-based photo sorter maintenance CLI")]
struct Cli {
    /// Base data directory (default: FACESORT_DATA_DIR or the XDG data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change the sorting settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print the preset bracket tables
    Presets,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show the current settings with their preset labels
    Show,
    /// Change one or more settings
    Set(SetArgs),
    /// Restore the built-in defaults
    Reset,
}

#[derive(Args)]
struct SetArgs {
    /// Clustering strictness in [0, 1]; lower groups more loosely
    #[arg(long)]
    similarity_threshold: Option<f64>,
    /// Working-resolution fraction in (0, 1]; lower is faster
    #[arg(long)]
    resize_scale: Option<f64>,
    /// Minimum members for a cluster to be retained as a person
    #[arg(long)]
    min_cluster_size: Option<u32>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove the embedding cache and the sorted output folders
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.data_dir {
        Some(base) => HostConfig::new(base),
        None => HostConfig::from_env(),
    };

    // The CLI drives the host over the same bridge an embedded surface
    // uses. No inference engine is wired here; none of these commands
    // starts a run.
    let (event_tx, _event_rx) = mpsc::unbounded_channel();
    let host = spawn_host(
        config,
        Box::new(UnavailableEngine),
        Box::new(|| None),
        event_tx,
    );
    let bridge = BridgeClient::new(Arc::new(host));

    match cli.command {
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = bridge.load_settings().await;
                print_settings(&settings);
            }
            SettingsAction::Set(args) => {
                let patch = SettingsPatch {
                    similarity_threshold: args.similarity_threshold,
                    resize_scale: args.resize_scale,
                    min_cluster_size: args.min_cluster_size,
                };
                if patch.is_empty() {
                    anyhow::bail!("nothing to set; pass at least one --option");
                }
                let settings = bridge.load_settings().await.merged(patch);
                bridge
                    .save_settings(&settings)
                    .await
                    .context("saving settings")?;
                println!("Settings saved.");
                print_settings(&settings);
            }
            SettingsAction::Reset => {
                let settings = SortSettings::default();
                bridge
                    .save_settings(&settings)
                    .await
                    .context("saving settings")?;
                println!("Settings restored to defaults.");
                print_settings(&settings);
            }
        },
        Commands::Cache { action } => match action {
            CacheAction::Clear => {
                bridge.clear_cache().await.context("clearing cache")?;
                println!("Cache and sorted output cleared.");
            }
        },
        Commands::Presets => print_presets(),
    }

    Ok(())
}

fn print_settings(settings: &SortSettings) {
    println!(
        "similarity_threshold = {:.2}  [{}]",
        settings.similarity_threshold,
        classify(SettingKind::SimilarityThreshold, settings.similarity_threshold)
            .unwrap_or("unrated")
    );
    println!(
        "resize_scale         = {:.2}  [{}]",
        settings.resize_scale,
        classify(SettingKind::ResizeScale, settings.resize_scale).unwrap_or("unrated")
    );
    println!(
        "min_cluster_size     = {}     [{}]",
        settings.min_cluster_size,
        classify(
            SettingKind::MinClusterSize,
            f64::from(settings.min_cluster_size)
        )
        .unwrap_or("unrated")
    );
}

fn print_presets() {
    let kinds = [
        ("similarity_threshold", SettingKind::SimilarityThreshold),
        ("resize_scale", SettingKind::ResizeScale),
        ("min_cluster_size", SettingKind::MinClusterSize),
    ];
    for (name, kind) in kinds {
        println!("{name}:");
        for bracket in brackets(kind) {
            println!("  <= {:<5} {}", bracket.upper, bracket.label);
        }
    }
}
