//! Side channel for getting raw OHLC feed files into object storage. The
//! analytics service's ETL picks them up from there; nothing here waits for it.

use core_types::{Asset, FeedType, Timeframe};

pub mod error;
pub mod store;
pub mod uploader;

pub use error::IngestionError;
pub use store::{ObjectStore, S3Store};
pub use uploader::{FeedFile, UploadSummary, Uploader};

/// `{asset}/{timeframe}/{feed}/{file_name}`, e.g. `NQ/3m/small/nq_3m.csv`.
pub fn object_key(asset: Asset, timeframe: Timeframe, feed: FeedType, file_name: &str) -> String {
    format!("{}/{}/{}/{}", asset, timeframe, feed, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(
            object_key(Asset::Rty, Timeframe::M15, FeedType::Big, "rty 15m.csv"),
            "RTY/15m/big/rty 15m.csv"
        );
    }
}
