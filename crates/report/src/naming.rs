use chrono::NaiveDateTime;
use core_types::Asset;

/// Excel refuses sheet names longer than this.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const FILE_TIME_FORMAT: &str = "%d-%b-%y_%H-%M";

/// Derives a sheet name from a group name: spaces and hyphens become
/// underscores, then the result is cut to 31 characters.
///
/// Two groups can map to the same sheet name; that is left for the workbook
/// writer to reject.
pub fn sheet_name(group: &str) -> String {
    group
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

/// `{asset}_traveler_report_{05-Mar-24_18-00}.xlsx`, asset lower-cased and
/// omitted entirely when unknown.
pub fn artifact_file_name(asset: Option<Asset>, report_time: NaiveDateTime) -> String {
    let prefix = asset
        .map(|a| format!("{}_", a.as_str().to_lowercase()))
        .unwrap_or_default();
    format!(
        "{}traveler_report_{}.xlsx",
        prefix,
        report_time.format(FILE_TIME_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn sheet_name_replaces_separators() {
        assert_eq!(sheet_name("Grp All-Day"), "Grp_All_Day");
        assert_eq!(sheet_name("High 1"), "High_1");
    }

    #[test]
    fn sheet_name_is_truncated() {
        let long = "A".repeat(40);
        assert_eq!(sheet_name(&long).chars().count(), 31);
        assert_eq!(sheet_name(&"x".repeat(31)), "x".repeat(31));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = "é".repeat(35);
        assert_eq!(sheet_name(&name), "é".repeat(31));
    }

    #[test]
    fn file_name_embeds_asset_and_report_time() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(
            artifact_file_name(Some(Asset::Nq), at),
            "nq_traveler_report_05-Mar-24_18-00.xlsx"
        );
        assert_eq!(
            artifact_file_name(Some(Asset::Rty), at),
            "rty_traveler_report_05-Mar-24_18-00.xlsx"
        );
        assert_eq!(artifact_file_name(None, at), "traveler_report_05-Mar-24_18-00.xlsx");
    }
}
