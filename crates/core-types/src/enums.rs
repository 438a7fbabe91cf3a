use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The instruments the analytics service holds price data for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Nq,
    Es,
    Ym,
    Rty,
}

impl Asset {
    pub const ALL: [Asset; 4] = [Asset::Nq, Asset::Es, Asset::Ym, Asset::Rty];

    /// The identifier the analytics service and storage layout use (e.g. "NQ").
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Nq => "NQ",
            Asset::Es => "ES",
            Asset::Ym => "YM",
            Asset::Rty => "RTY",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Asset::ALL
            .into_iter()
            .find(|asset| asset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidInput("asset".to_string(), s.to_string()))
    }
}

/// Bar timeframes the raw feeds are recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::M3, Timeframe::M5, Timeframe::M15];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidInput("timeframe".to_string(), s.to_string()))
    }
}

/// Classification of an uploaded raw data file, orthogonal to its timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Small,
    Big,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Small => "small",
            FeedType::Big => "big",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(FeedType::Small),
            "big" => Ok(FeedType::Big),
            _ => Err(CoreError::InvalidInput("feed type".to_string(), s.to_string())),
        }
    }
}

/// Which side of price a custom range sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    High,
    Low,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::High => "High",
            Direction::Low => "Low",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
