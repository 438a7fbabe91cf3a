pub mod clock;
pub mod enums;
pub mod error;
pub mod frame;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use clock::{resolve_report_time, Clock, FixedClock, SystemClock};
pub use enums::{Asset, Direction, FeedType, Timeframe};
pub use error::CoreError;
pub use structs::{CustomRange, Measurement, QueryRequest, RangeSetting, RangeSlot, RANGE_SPAN};
pub use frame::{
    frame_from_records, numeric_value, text_value, timestamp_column, timestamp_values,
    TIMESTAMP_UNIT,
};

/// The result set returned by the analytics service.
pub type ResultTable = polars::prelude::DataFrame;
