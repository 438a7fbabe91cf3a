use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The body of a successful query.
///
/// Every field is optional on the wire; absent fields mean "nothing found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Traveler entries, one JSON object per row. The row schema is not fixed.
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    /// Number of traveler entries the service reports.
    #[serde(default)]
    pub count: u64,
    /// Informational: how many HLC records the service scanned.
    #[serde(default)]
    pub hlc_records_processed: u64,
}
