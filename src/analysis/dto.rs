use serde::Serialize;
use time::{macros::format_description, OffsetDateTime};

/// Report assembled for one request; never persisted.
#[derive(Debug, Clone)]
pub struct SectorReport {
    pub sector: String,
    pub generated_at: OffsetDateTime,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub sector: String,
    pub timestamp: String,
    pub report_markdown: String,
}

impl From<SectorReport> for ReportResponse {
    fn from(report: SectorReport) -> Self {
        let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        Self {
            sector: report.sector,
            timestamp: report.generated_at.format(fmt).unwrap_or_default(),
            report_markdown: report.body,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
