use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use weather_etl_core::transform::transform;
use weather_etl_core::{EnrichedObservation, EtlConfig, EtlPipeline, Loader, RawObservation};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "City weather ETL")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "etl.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, enrich and load in one invocation.
    Run,

    /// Fetch the configured cities and write the raw batch to a JSON file.
    Extract {
        /// Where to write the raw batch.
        #[arg(long)]
        output: PathBuf,
    },

    /// Enrich a raw batch file into a warehouse-ready one.
    Transform {
        /// Raw batch produced by `extract`.
        #[arg(long)]
        input: PathBuf,

        /// Where to write the enriched batch.
        #[arg(long)]
        output: PathBuf,
    },

    /// Load an enriched batch file into the warehouse.
    Load {
        /// Enriched batch produced by `transform`.
        #[arg(long)]
        input: PathBuf,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = EtlConfig::load(&self.config)?;

        match self.command {
            Command::Run => {
                let pipeline = EtlPipeline::new(&config)?;
                let summary = pipeline.run().await?;
                info!(
                    "run finished: {} facts loaded, {} skipped",
                    summary.facts_inserted, summary.facts_skipped
                );
            }
            Command::Extract { output } => {
                let pipeline = EtlPipeline::new(&config)?;
                let batch = pipeline.extract().await?;
                write_batch(&output, &batch)?;
                info!("wrote {} raw observations to {}", batch.len(), output.display());
            }
            Command::Transform { input, output } => {
                let raw: Vec<RawObservation> = read_batch(&input)?;
                let enriched = transform(raw);
                write_batch(&output, &enriched)?;
                info!("wrote {} enriched observations to {}", enriched.len(), output.display());
            }
            Command::Load { input } => {
                let batch: Vec<EnrichedObservation> = read_batch(&input)?;
                let summary = Loader::new(&config.database).load(&batch).await?;
                info!("loaded {} facts, {} skipped", summary.facts_inserted, summary.facts_skipped);
            }
        }

        Ok(())
    }
}

fn read_batch<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open batch file: {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse batch file: {}", path.display()))
}

fn write_batch<T: Serialize>(path: &Path, batch: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create batch file: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, batch)
        .with_context(|| format!("Failed to write batch file: {}", path.display()))?;

    writer.flush().with_context(|| format!("Failed to flush batch file: {}", path.display()))?;

    Ok(())
}
