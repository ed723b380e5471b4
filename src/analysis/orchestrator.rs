use std::sync::Arc;

use tracing::{debug, info};

use super::{
    dto::SectorReport, news::NewsRetriever, synthesizer::ReportSynthesizer,
    validation::validate_sector,
};
use crate::{clock::Clock, error::ValidationError};

/// Retrieval followed by synthesis. Each call is independent; nothing is
/// kept between invocations.
pub struct Analyzer {
    retriever: NewsRetriever,
    synthesizer: ReportSynthesizer,
    clock: Arc<dyn Clock>,
}

impl Analyzer {
    pub fn new(
        retriever: NewsRetriever,
        synthesizer: ReportSynthesizer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            retriever,
            synthesizer,
            clock,
        }
    }

    /// Validation happens before any external call so malformed input
    /// never spends provider quota.
    pub async fn analyze(&self, sector: &str) -> Result<SectorReport, ValidationError> {
        let sector = validate_sector(sector)?;

        debug!(sector = %sector, stage = "retrieving", "analysis stage");
        let snippets = self.retriever.fetch(&sector).await;

        debug!(sector = %sector, stage = "synthesizing", snippets = snippets.len(), "analysis stage");
        let body = self.synthesizer.synthesize(&sector, &snippets).await;

        info!(sector = %sector, snippets = snippets.len(), "analysis done");
        Ok(SectorReport {
            sector,
            generated_at: self.clock.now(),
            body,
        })
    }
}
