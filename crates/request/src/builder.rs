use crate::error::RequestError;
use crate::ranges::ResolvedRanges;
use chrono::NaiveDate;
use core_types::{Asset, Measurement, QueryRequest, Timeframe};

/// Shortest look-back window the analytics service accepts, in days.
pub const MIN_SCOPE_DAYS: u32 = 1;
/// Longest look-back window the analytics service accepts, in days.
pub const MAX_SCOPE_DAYS: u32 = 365;
pub const DEFAULT_SCOPE_DAYS: u32 = 20;

/// Assembles a [`QueryRequest`] from already-resolved inputs.
///
/// Building is pure: no I/O, and the same inputs always produce the same
/// request.
#[derive(Debug, Clone)]
pub struct QueryRequestBuilder {
    asset: Asset,
    report_date: NaiveDate,
    timeframes: Vec<Timeframe>,
    scope_days: u32,
    ranges: Option<ResolvedRanges>,
    measurements: Vec<Measurement>,
}

impl QueryRequestBuilder {
    pub fn new(asset: Asset, report_date: NaiveDate) -> Self {
        Self {
            asset,
            report_date,
            timeframes: Vec::new(),
            scope_days: DEFAULT_SCOPE_DAYS,
            ranges: None,
            measurements: Vec::new(),
        }
    }

    /// Sets the timeframes, keeping the first occurrence of each in the order
    /// given.
    pub fn timeframes(mut self, timeframes: impl IntoIterator<Item = Timeframe>) -> Self {
        self.timeframes.clear();
        for tf in timeframes {
            if !self.timeframes.contains(&tf) {
                self.timeframes.push(tf);
            }
        }
        self
    }

    pub fn scope_days(mut self, scope_days: u32) -> Self {
        self.scope_days = scope_days;
        self
    }

    pub fn ranges(mut self, ranges: ResolvedRanges) -> Self {
        self.ranges = Some(ranges);
        self
    }

    pub fn measurements(mut self, measurements: Vec<Measurement>) -> Self {
        self.measurements = measurements;
        self
    }

    /// Validates the inputs and produces the request.
    ///
    /// Checks run in a fixed order: timeframes, scope window, custom ranges.
    /// An empty measurement list is accepted.
    pub fn build(self) -> Result<QueryRequest, RequestError> {
        if self.timeframes.is_empty() {
            return Err(RequestError::NoTimeframe);
        }

        if !(MIN_SCOPE_DAYS..=MAX_SCOPE_DAYS).contains(&self.scope_days) {
            return Err(RequestError::ScopeOutOfBounds {
                value: self.scope_days,
                min: MIN_SCOPE_DAYS,
                max: MAX_SCOPE_DAYS,
            });
        }

        let ranges = match self.ranges {
            Some(ranges) if !ranges.is_empty() => ranges,
            _ => return Err(RequestError::NoActiveRange),
        };

        if self.measurements.is_empty() {
            tracing::warn!(asset = %self.asset, "Building a query with zero measurements.");
        }

        Ok(QueryRequest {
            asset_id: self.asset,
            timeframes: self.timeframes,
            report_date: self.report_date,
            scope_days: self.scope_days,
            custom_ranges: ranges.into_inner(),
            measurements: self.measurements,
        })
    }
}
