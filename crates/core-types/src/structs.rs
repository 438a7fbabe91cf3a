use crate::enums::{Asset, Direction, Timeframe};
use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Width of every custom range, in the units of its center value.
///
/// The analytics service applies the same span when it evaluates crossings, so
/// it is a fixed domain parameter rather than a user setting.
pub const RANGE_SPAN: f64 = 24.0;

/// A named custom-range slot such as "High 1" or "Low 2".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeSlot {
    pub direction: Direction,
    pub index: u8,
}

impl RangeSlot {
    pub fn new(direction: Direction, index: u8) -> Self {
        Self { direction, index }
    }

    /// The four slots offered by default: two High and two Low.
    pub fn standard() -> [RangeSlot; 4] {
        [
            RangeSlot::new(Direction::High, 1),
            RangeSlot::new(Direction::High, 2),
            RangeSlot::new(Direction::Low, 1),
            RangeSlot::new(Direction::Low, 2),
        ]
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RangeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.index)
    }
}

impl FromStr for RangeSlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidRangeLabel(s.to_string());
        let (head, tail) = s.trim().split_once(' ').ok_or_else(invalid)?;

        let direction = if head.eq_ignore_ascii_case("high") {
            Direction::High
        } else if head.eq_ignore_ascii_case("low") {
            Direction::Low
        } else {
            return Err(invalid());
        };

        let index: u8 = tail.trim().parse().map_err(|_| invalid())?;
        if index == 0 {
            return Err(invalid());
        }

        Ok(Self::new(direction, index))
    }
}

/// One user-controlled custom range: a slot toggle plus its center value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomRange {
    pub slot: RangeSlot,
    pub enabled: bool,
    pub center: f64,
}

impl CustomRange {
    pub fn new(slot: RangeSlot, enabled: bool, center: f64) -> Self {
        Self {
            slot,
            enabled,
            center,
        }
    }

    pub fn direction(&self) -> Direction {
        self.slot.direction
    }

    /// A range takes part in a query only when it is switched on and has a
    /// positive center.
    pub fn is_active(&self) -> bool {
        self.enabled && self.center > 0.0
    }

    /// The `[lower, upper]` interval the range covers.
    ///
    /// High ranges extend below their center, Low ranges above it.
    pub fn bounds(&self) -> (f64, f64) {
        match self.slot.direction {
            Direction::High => (self.center - RANGE_SPAN, self.center),
            Direction::Low => (self.center, self.center + RANGE_SPAN),
        }
    }
}

/// The wire shape of a single custom range inside a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSetting {
    pub enabled: bool,
    pub value: f64,
}

/// A named reference level supplied with the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "M_value")]
    pub value: f64,
    #[serde(rename = "M_name")]
    pub name: String,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }

    /// A measurement without a name column is labelled after its value.
    pub fn unnamed(value: f64) -> Self {
        Self::new(format!("M{}", value), value)
    }
}

/// The request submitted to the remote analytics service.
///
/// Built by `request::QueryRequestBuilder`, which enforces its invariants;
/// it is not meant to be mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub asset_id: Asset,
    pub timeframes: Vec<Timeframe>,
    pub report_date: NaiveDate,
    pub scope_days: u32,
    pub custom_ranges: BTreeMap<String, RangeSetting>,
    pub measurements: Vec<Measurement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_label_round_trips() {
        for slot in RangeSlot::standard() {
            assert_eq!(slot.label().parse::<RangeSlot>().unwrap(), slot);
        }
        assert_eq!("high 3".parse::<RangeSlot>().unwrap(), RangeSlot::new(Direction::High, 3));
    }

    #[test]
    fn slot_rejects_malformed_labels() {
        for label in ["High", "Middle 1", "Low x", "Low 0", ""] {
            assert!(label.parse::<RangeSlot>().is_err(), "{label:?} should not parse");
        }
    }

    #[test]
    fn bounds_follow_direction() {
        let high = CustomRange::new(RangeSlot::new(Direction::High, 1), true, 100.0);
        let low = CustomRange::new(RangeSlot::new(Direction::Low, 1), true, 100.0);
        assert_eq!(high.bounds(), (76.0, 100.0));
        assert_eq!(low.bounds(), (100.0, 124.0));
    }

    #[test]
    fn active_requires_toggle_and_positive_center() {
        let slot = RangeSlot::new(Direction::Low, 2);
        assert!(CustomRange::new(slot, true, 0.5).is_active());
        assert!(!CustomRange::new(slot, true, 0.0).is_active());
        assert!(!CustomRange::new(slot, true, -3.0).is_active());
        assert!(!CustomRange::new(slot, false, 50.0).is_active());
    }

    #[test]
    fn measurement_serializes_with_wire_names() {
        let json = serde_json::to_value(Measurement::new("Open", 21450.25)).unwrap();
        assert_eq!(json, serde_json::json!({ "M_name": "Open", "M_value": 21450.25 }));
        assert_eq!(Measurement::unnamed(17.5).name, "M17.5");
    }
}
