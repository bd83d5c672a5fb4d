use anyhow::Result;

use crate::config::EtlConfig;
use crate::fetch::Fetcher;
use crate::load::{LoadSummary, Loader};
use crate::model::{EnrichedObservation, RawObservation};
use crate::provider::openweather::OpenWeatherProvider;
use crate::transform;

/// The three stages wired together from one config. `run` walks them in
/// order; each stage is also exposed on its own so an external scheduler
/// can run them as separate invocations and pass the batches between
/// them itself.
#[derive(Debug)]
pub struct EtlPipeline {
    fetcher: Fetcher,
    loader: Loader,
}

impl EtlPipeline {
    pub fn new(config: &EtlConfig) -> Result<Self> {
        let provider = OpenWeatherProvider::new(&config.api)?;
        let fetcher =
            Fetcher::new(Box::new(provider), config.cities.clone(), config.snapshot.path.clone());
        let loader = Loader::new(&config.database);

        Ok(Self { fetcher, loader })
    }

    pub async fn extract(&self) -> Result<Vec<RawObservation>> {
        self.fetcher.extract().await
    }

    pub fn transform(&self, batch: Vec<RawObservation>) -> Vec<EnrichedObservation> {
        transform::transform(batch)
    }

    pub async fn load(&self, batch: &[EnrichedObservation]) -> Result<LoadSummary> {
        self.loader.load(batch).await
    }

    /// One full pass: fetch, enrich, commit.
    pub async fn run(&self) -> Result<LoadSummary> {
        let raw = self.extract().await?;
        let enriched = self.transform(raw);
        self.load(&enriched).await
    }
}
