//! ytcluster CLI: cluster channels by content, engagement and subscriptions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use ytcluster::config::ClusteringConfig;
use ytcluster::entity::{load_edges, load_entities};
use ytcluster::export::format_count;
use ytcluster::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "ytcluster", version, about = "Feature-fusion clustering for channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a batch of channels and write the run record as JSON.
    Run {
        /// JSON array of channel records.
        #[arg(long)]
        entities: PathBuf,

        /// JSON array of subscription edges.
        #[arg(long)]
        edges: Option<PathBuf>,

        /// TOML run configuration. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file for the run record. Printed to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a configuration file.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            entities,
            edges,
            config,
            out,
        } => {
            let config = match config {
                Some(path) => ClusteringConfig::load(&path)?,
                None => ClusteringConfig::default(),
            };
            let entities = load_entities(&entities)?;
            let edges = match edges {
                Some(path) => load_edges(&path)?,
                None => Vec::new(),
            };

            let run = Pipeline::new(config)?.run(entities, &edges)?;
            let record = run.to_record();

            match &out {
                Some(path) => record.write_to(path)?,
                None => println!("{}", record.to_json_pretty()?),
            }

            eprintln!(
                "{} clusters, {} noise (radius {}, min {}){}",
                record.clusters.len(),
                record.noise.len(),
                record.selected_radius,
                record.selected_min_neighbors,
                if record.low_confidence { ", low confidence" } else { "" },
            );
            if let Some(score) = record.quality_score {
                eprintln!("  silhouette: {score:.3}");
            }
            for c in &record.clusters {
                eprintln!(
                    "  [{}] {} ({} channels, avg {} subscribers, {} views)",
                    c.cluster_id,
                    c.name,
                    c.size,
                    format_count(c.avg_subscriber_count),
                    format_count(c.avg_view_count),
                );
            }
            if let Some(path) = out {
                eprintln!("Run record written to {}", path.display());
            }
        }

        Commands::CheckConfig { config } => {
            let config = ClusteringConfig::load(&config)?;
            println!(
                "Config OK: {} radii x {} neighborhood sizes, seed {}",
                config.density_radius_grid.len(),
                config.min_neighborhood_grid.len(),
                config.random_seed,
            );
        }

        Commands::DefaultConfig => {
            let text = ClusteringConfig::default().to_toml_string()?;
            print!("{text}");
        }
    }

    Ok(())
}
