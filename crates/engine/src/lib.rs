use crate::error::EngineError;
use api_client::AnalyticsClient;
use chrono::NaiveDateTime;
use core_types::{
    frame_from_records, resolve_report_time, Asset, Clock, CustomRange, Measurement, QueryRequest,
    ResultTable, Timeframe,
};
use report::{ReportArtifact, ReportExporter, TravelerReport, DEFAULT_GROUP_KEY};
use request::{resolve_ranges, QueryRequestBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod error;

/// The analyst's choices for one report cycle.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub asset: Asset,
    pub timeframes: Vec<Timeframe>,
    /// As-of time; the engine clock is used when absent.
    pub report_time: Option<NaiveDateTime>,
    pub scope_days: u32,
    pub ranges: Vec<CustomRange>,
    pub measurements: Vec<Measurement>,
}

/// What one successful cycle produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub request: QueryRequest,
    pub report_time: NaiveDateTime,
    /// Round-trip time of the remote query.
    pub elapsed: Duration,
    pub count: u64,
    pub hlc_records_processed: u64,
    /// The rows as returned, before grouping.
    pub results: ResultTable,
    /// `None` when the service found no traveler entries.
    pub report: Option<TravelerReport>,
    pub artifact: Option<ReportArtifact>,
}

impl ReportOutcome {
    pub fn has_entries(&self) -> bool {
        self.report.is_some()
    }
}

/// Drives one report cycle from analyst inputs to a finished workbook.
pub struct ReportEngine {
    client: Arc<dyn AnalyticsClient>,
    clock: Arc<dyn Clock>,
    exporter: ReportExporter,
    group_key: String,
}

impl ReportEngine {
    pub fn new(client: Arc<dyn AnalyticsClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            exporter: ReportExporter::new(),
            group_key: DEFAULT_GROUP_KEY.to_string(),
        }
    }

    /// Partitions results on `key` instead of the `Group` column.
    pub fn with_group_key(mut self, key: impl Into<String>) -> Self {
        self.group_key = key.into();
        self
    }

    /// Runs the cycle: resolve the report time and ranges, build and validate
    /// the request, query the service, then group and export the results.
    ///
    /// Validation failures return before the service is contacted.
    pub async fn run(&self, inputs: ReportInputs) -> Result<ReportOutcome, EngineError> {
        let report_time = resolve_report_time(inputs.report_time, self.clock.as_ref());
        let ranges = resolve_ranges(&inputs.ranges)?;
        let request = QueryRequestBuilder::new(inputs.asset, report_time.date())
            .timeframes(inputs.timeframes)
            .scope_days(inputs.scope_days)
            .ranges(ranges)
            .measurements(inputs.measurements)
            .build()?;

        tracing::info!(
            asset = %request.asset_id,
            report_date = %request.report_date,
            ranges = request.custom_ranges.len(),
            measurements = request.measurements.len(),
            "Submitting traveler report request."
        );

        let started = Instant::now();
        let response = self.client.query(&request).await?;
        let elapsed = started.elapsed();

        let results = frame_from_records(&response.data)?;
        tracing::info!(
            count = response.count,
            hlc_records_processed = response.hlc_records_processed,
            rows = results.height(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Analytics query completed."
        );

        let (report, artifact) = if response.count > 0 && results.height() > 0 {
            let report = TravelerReport::group(results.clone(), &self.group_key)?;
            let artifact = self
                .exporter
                .export(&report, report_time, Some(request.asset_id))?;
            (Some(report), Some(artifact))
        } else {
            tracing::info!("No traveler entries found.");
            (None, None)
        };

        Ok(ReportOutcome {
            request,
            report_time,
            elapsed,
            count: response.count,
            hlc_records_processed: response.hlc_records_processed,
            results,
            report,
            artifact,
        })
    }
}
