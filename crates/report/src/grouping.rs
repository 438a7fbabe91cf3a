use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use core_types::{text_value, timestamp_column, timestamp_values};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsResult, SortMultipleOptions};
use std::collections::BTreeMap;

pub const ARRIVAL_COLUMN: &str = "Arrival";
/// When present, authoritative over `Arrival`.
pub const ARRIVAL_DATETIME_COLUMN: &str = "Arrival_datetime";
pub const DEFAULT_GROUP_KEY: &str = "Group";
/// Group for rows that carry no usable group key.
pub const DEFAULT_GROUP: &str = "Grp_All";

const RANGE_COLUMN: &str = "Range";
const OUTPUT_COLUMN: &str = "Output";

const SORT_WITH_RANGE: &[&str] = &[RANGE_COLUMN, DEFAULT_GROUP_KEY, OUTPUT_COLUMN, ARRIVAL_COLUMN];
const SORT_WITHOUT_RANGE: &[&str] = &[DEFAULT_GROUP_KEY, OUTPUT_COLUMN, ARRIVAL_COLUMN];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Best-effort timestamp parsing over the formats the service is known to
/// emit. Offsets in RFC 3339 input are dropped, keeping the wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Makes `Arrival` a datetime column.
///
/// `Arrival_datetime`, when present, is parsed into `Arrival` (which is
/// appended if missing); otherwise `Arrival` is parsed in place. Values that
/// do not parse become null, as does every value of a column that is neither
/// text nor datetime. Frames with neither column are left alone.
pub fn coerce_arrival(frame: &mut DataFrame) -> PolarsResult<()> {
    let source = if frame.get_column_index(ARRIVAL_DATETIME_COLUMN).is_some() {
        ARRIVAL_DATETIME_COLUMN
    } else if frame.get_column_index(ARRIVAL_COLUMN).is_some() {
        ARRIVAL_COLUMN
    } else {
        return Ok(());
    };

    let column = frame.column(source)?;
    let parsed: Vec<Option<NaiveDateTime>> = match column.dtype() {
        DataType::Datetime(_, _) => timestamp_values(column)?,
        DataType::String => column
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect(),
        _ => vec![None; column.len()],
    };
    let present = column.len() - column.null_count();
    let unparsed = present - parsed.iter().filter(|v| v.is_some()).count();

    frame.with_column(timestamp_column(ARRIVAL_COLUMN, &parsed)?)?;
    if unparsed > 0 {
        tracing::warn!(unparsed, source, "Some arrival values could not be parsed.");
    }
    Ok(())
}

/// Stable ascending sort by `Range, Group, Output, Arrival`, or by
/// `Group, Output, Arrival` when the frame has no `Range` column. Nulls sort
/// last. Key columns the frame lacks, or that hold only nulls, are skipped.
pub fn sort_table(frame: &DataFrame) -> PolarsResult<DataFrame> {
    let keys = if frame.get_column_index(RANGE_COLUMN).is_some() {
        SORT_WITH_RANGE
    } else {
        SORT_WITHOUT_RANGE
    };
    let by: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| {
            frame
                .column(k)
                .is_ok_and(|c| !matches!(c.dtype(), DataType::Null))
        })
        .collect();
    if by.is_empty() || frame.height() < 2 {
        return Ok(frame.clone());
    }

    frame.sort(
        by,
        SortMultipleOptions::default()
            .with_nulls_last(true)
            .with_maintain_order(true),
    )
}

fn group_labels(column: &Column) -> PolarsResult<Vec<String>> {
    (0..column.len())
        .map(|idx| -> PolarsResult<String> {
            let label = text_value(column.get(idx)?)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Ok(label.unwrap_or_else(|| DEFAULT_GROUP.to_string()))
        })
        .collect()
}

/// A result frame split into named groups, one per output sheet.
///
/// Groups iterate in ascending name order.
#[derive(Debug, Clone)]
pub struct TravelerReport {
    key: String,
    groups: BTreeMap<String, DataFrame>,
}

impl Default for TravelerReport {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_KEY)
    }
}

impl PartialEq for TravelerReport {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.groups.len() == other.groups.len()
            && self
                .groups
                .iter()
                .zip(&other.groups)
                .all(|((a, fa), (b, fb))| a == b && fa.equals_missing(fb))
    }
}

impl TravelerReport {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Coerces arrivals, sorts, then partitions `frame` on the `key` column.
    ///
    /// Rows whose key is null or blank, or every row when the column is
    /// missing, land in [`DEFAULT_GROUP`]. The key column is rewritten as text
    /// holding those labels.
    pub fn group(mut frame: DataFrame, key: &str) -> PolarsResult<Self> {
        coerce_arrival(&mut frame)?;
        let mut frame = sort_table(&frame)?;

        let mut report = Self::new(key);
        if frame.height() == 0 {
            return Ok(report);
        }

        if frame.get_column_index(key).is_none() {
            tracing::warn!(key, "Group column missing; exporting every row as one group.");
            report.groups.insert(DEFAULT_GROUP.to_string(), frame);
            return Ok(report);
        }

        let labels = group_labels(frame.column(key)?)?;
        frame.with_column(Column::new(key.into(), labels))?;

        for part in frame.partition_by_stable([key], true)? {
            let name = text_value(part.column(key)?.get(0)?)
                .unwrap_or_else(|| DEFAULT_GROUP.to_string());
            report.groups.insert(name, part);
        }
        tracing::debug!(groups = report.groups.len(), "Partitioned traveler entries.");
        Ok(report)
    }

    /// Replaces the named group.
    pub fn insert(&mut self, name: impl Into<String>, frame: DataFrame) -> Option<DataFrame> {
        self.groups.insert(name.into(), frame)
    }

    /// The column the report was partitioned on.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &DataFrame)> {
        self.groups.iter().map(|(name, frame)| (name.as_str(), frame))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Rows across every group, empty ones included.
    pub fn total_entries(&self) -> usize {
        self.groups.values().map(DataFrame::height).sum()
    }

    pub fn non_empty_groups(&self) -> usize {
        self.groups.values().filter(|f| f.height() > 0).count()
    }

    /// Re-applies arrival coercion and sorting to every group.
    pub fn normalize(mut self) -> PolarsResult<Self> {
        for frame in self.groups.values_mut() {
            coerce_arrival(frame)?;
            *frame = sort_table(frame)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::frame_from_records;
    use serde_json::{json, Value};

    fn frame(value: Value) -> DataFrame {
        let records: Vec<_> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        frame_from_records(&records).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn texts(frame: &DataFrame, name: &str) -> Vec<Option<String>> {
        let column = frame.column(name).unwrap();
        (0..column.len())
            .map(|r| text_value(column.get(r).unwrap()))
            .collect()
    }

    fn arrivals(frame: &DataFrame) -> Vec<Option<NaiveDateTime>> {
        timestamp_values(frame.column(ARRIVAL_COLUMN).unwrap()).unwrap()
    }

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn parses_known_timestamp_shapes() {
        let expected = at(2024, 3, 4, 10, 15);
        for raw in [
            "2024-03-04T10:15:00",
            "2024-03-04T10:15:00.000",
            "2024-03-04T10:15",
            "2024-03-04 10:15:00",
            "2024-03-04 10:15",
            "03/04/2024 10:15:00",
            "03/04/2024 10:15",
            "2024-03-04T10:15:00+00:00",
            " 2024-03-04 10:15 ",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw:?}");
        }
        assert_eq!(parse_timestamp("2024-03-04"), Some(at(2024, 3, 4, 0, 0)));
        assert_eq!(parse_timestamp("03/04/2024"), Some(at(2024, 3, 4, 0, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn iso_minutes_without_seconds() {
        assert_eq!(parse_timestamp("2024-03-05T18:00"), Some(at(2024, 3, 5, 18, 0)));

        let mut f = frame(json!([{ "Arrival": "2024-03-05T18:00" }]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(arrivals(&f), [Some(at(2024, 3, 5, 18, 0))]);
    }

    #[test]
    fn arrival_datetime_overrides_arrival() {
        let mut f = frame(json!([
            { "Arrival": "garbage", "Arrival_datetime": "2024-03-04 10:15:00" }
        ]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(arrivals(&f), [Some(at(2024, 3, 4, 10, 15))]);
    }

    #[test]
    fn arrival_is_created_from_arrival_datetime() {
        let mut f = frame(json!([{ "Group": "A", "Arrival_datetime": "2024-03-04 10:15" }]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(
            f.get_column_names_str(),
            ["Group", "Arrival_datetime", "Arrival"]
        );
        assert!(matches!(
            f.column(ARRIVAL_COLUMN).unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
    }

    #[test]
    fn unparsable_arrival_becomes_null() {
        let mut f = frame(json!([
            { "Arrival": "not a time" },
            { "Arrival": null },
            { "Arrival": "2024-03-04 10:15" }
        ]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(arrivals(&f), [None, None, Some(at(2024, 3, 4, 10, 15))]);
    }

    #[test]
    fn numeric_arrival_column_becomes_null() {
        let mut f = frame(json!([{ "Arrival": 17 }, { "Arrival": 18 }]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(arrivals(&f), [None, None]);
    }

    #[test]
    fn frames_without_arrival_are_untouched() {
        let mut f = frame(json!([{ "Group": "A" }]));
        coerce_arrival(&mut f).unwrap();
        assert_eq!(f.get_column_names_str(), ["Group"]);
    }

    #[test]
    fn sorts_by_range_first_when_present() {
        let f = frame(json!([
            { "Range": "Low 1", "Group": "A", "Output": 1 },
            { "Range": "High 1", "Group": "B", "Output": 2 },
            { "Range": "High 1", "Group": "A", "Output": 3 }
        ]));
        let sorted = sort_table(&f).unwrap();
        assert_eq!(texts(&sorted, "Output"), some(&["3", "2", "1"]));
    }

    #[test]
    fn sorts_by_group_output_arrival_without_range() {
        let mut f = frame(json!([
            { "Group": "B", "Output": 1, "Arrival": "2024-03-04 10:00" },
            { "Group": "A", "Output": 2, "Arrival": "2024-03-04 09:00" },
            { "Group": "A", "Output": 2, "Arrival": "2024-03-04 08:00" },
            { "Group": "A", "Output": 10, "Arrival": null }
        ]));
        coerce_arrival(&mut f).unwrap();
        let sorted = sort_table(&f).unwrap();
        assert_eq!(
            arrivals(&sorted),
            [
                Some(at(2024, 3, 4, 8, 0)),
                Some(at(2024, 3, 4, 9, 0)),
                None,
                Some(at(2024, 3, 4, 10, 0)),
            ]
        );
    }

    #[test]
    fn sorting_is_idempotent_and_stable() {
        let f = frame(json!([
            { "Group": "A", "Output": 1, "id": 1 },
            { "Group": "A", "Output": null, "id": 2 },
            { "Group": "A", "Output": 1, "id": 3 }
        ]));
        let once = sort_table(&f).unwrap();
        let twice = sort_table(&once).unwrap();
        assert!(twice.equals_missing(&once));
        assert_eq!(texts(&once, "id"), some(&["1", "3", "2"]));
    }

    #[test]
    fn groups_partition_on_key_in_name_order() {
        let report = TravelerReport::group(
            frame(json!([
                { "Group": "Grp B", "Output": 1 },
                { "Group": "Grp A", "Output": 2 },
                { "Group": "Grp B", "Output": 3 }
            ])),
            "Group",
        )
        .unwrap();

        let names: Vec<&str> = report.group_names().collect();
        assert_eq!(names, ["Grp A", "Grp B"]);
        let grp_b = report.get("Grp B").unwrap();
        assert_eq!(grp_b.height(), 2);
        assert_eq!(texts(grp_b, "Output"), some(&["1", "3"]));
        assert_eq!(report.total_entries(), 3);
        assert_eq!(report.key(), "Group");
    }

    #[test]
    fn rows_without_a_key_fall_into_default_group() {
        let report = TravelerReport::group(
            frame(json!([
                { "Group": "A", "Output": 1 },
                { "Group": null, "Output": 2 },
                { "Group": "  ", "Output": 3 },
                { "Output": 4 }
            ])),
            "Group",
        )
        .unwrap();
        assert_eq!(report.get(DEFAULT_GROUP).unwrap().height(), 3);
        assert_eq!(report.get("A").unwrap().height(), 1);

        let report = TravelerReport::group(frame(json!([{ "Output": 1 }])), "Bucket").unwrap();
        let names: Vec<&str> = report.group_names().collect();
        assert_eq!(names, [DEFAULT_GROUP]);
    }

    #[test]
    fn empty_frame_yields_empty_report() {
        let report = TravelerReport::group(DataFrame::empty(), "Group").unwrap();
        assert!(report.is_empty());
        assert_eq!(report.total_entries(), 0);
    }

    #[test]
    fn normalize_is_idempotent() {
        let report = TravelerReport::group(
            frame(json!([
                { "Group": "A", "Output": 2, "Arrival": "03/04/2024 10:15" },
                { "Group": "A", "Output": 1, "Arrival": "bad" },
                { "Group": "B", "Output": 1, "Arrival": "2024-03-05T09:30:00" }
            ])),
            "Group",
        )
        .unwrap();
        let once = report.clone().normalize().unwrap();
        assert_eq!(once.clone().normalize().unwrap(), once);
        assert_eq!(once, report);
    }

    #[test]
    fn normalize_sorts_inserted_groups() {
        let mut report = TravelerReport::default();
        report.insert("Manual", frame(json!([{ "Output": 2 }, { "Output": 1 }])));
        let report = report.normalize().unwrap();
        assert_eq!(
            texts(report.get("Manual").unwrap(), "Output"),
            some(&["1", "2"])
        );
        assert_eq!(report.non_empty_groups(), 1);
    }
}
