use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use super::{generator::TextGenerator, news::NewsSnippet};
use crate::error::UpstreamError;

pub const NO_NEWS_TEXT: &str = "No relevant market news found.";
pub const ANALYSIS_ERROR_MARKDOWN: &str =
    "## Analysis Error\nAI analysis could not be completed at this time.";

/// Turns snippets into a markdown report. Always yields a non-empty
/// document, whatever the generator does.
pub struct ReportSynthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl ReportSynthesizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn synthesize(&self, sector: &str, snippets: &[NewsSnippet]) -> String {
        let market_data = format_market_data(snippets);

        let Some(generator) = &self.generator else {
            debug!(sector = %sector, "no generator configured; serving fallback report");
            return fallback_report(sector, &market_data);
        };

        let prompt = build_prompt(sector, &market_data);
        match self.try_generate(generator.as_ref(), &prompt).await {
            Ok(text) => text,
            Err(e @ UpstreamError::Timeout { .. }) => {
                warn!(sector = %sector, error = %e, "report generation timed out");
                ANALYSIS_ERROR_MARKDOWN.to_owned()
            }
            Err(e) => {
                error!(sector = %sector, error = %e, "report generation failed");
                ANALYSIS_ERROR_MARKDOWN.to_owned()
            }
        }
    }

    async fn try_generate(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
    ) -> Result<String, UpstreamError> {
        let text = tokio::time::timeout(self.timeout, generator.generate(prompt))
            .await
            .map_err(|_| UpstreamError::Timeout {
                provider: "generator",
                secs: self.timeout.as_secs(),
            })??;
        if text.trim().is_empty() {
            return Err(UpstreamError::Malformed {
                provider: "generator",
                message: "empty report".into(),
            });
        }
        Ok(text)
    }
}

pub fn format_market_data(snippets: &[NewsSnippet]) -> String {
    if snippets.is_empty() {
        return NO_NEWS_TEXT.to_owned();
    }
    snippets
        .iter()
        .map(|s| format!("- **{}**\n  {}\n  Source: {}\n\n", s.title, s.body, s.source_url))
        .collect()
}

pub fn fallback_report(sector: &str, market_data: &str) -> String {
    format!(
        "# {} Sector Analysis\n\n⚠️ **AI service unavailable.**\n\n## Collected Market Data\n{}",
        title_case(sector),
        market_data
    )
}

pub fn build_prompt(sector: &str, market_data: &str) -> String {
    format!(
        r#"
You are a financial analyst specializing in Indian markets.

Analyze the following information for the "{sector}" sector and produce
a professional investment analysis.

### Input Data
{market_data}

### Instructions
- Output strictly in Markdown
- Use the following sections, in this order:
  - Executive Summary
  - Key Trends
  - Trade Opportunities
  - Risks
  - Outlook
- Be factual and avoid hallucinated statistics
"#
    )
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
