use crate::error::ExportError;
use crate::grouping::{coerce_arrival, TravelerReport, ARRIVAL_COLUMN};
use crate::naming::{artifact_file_name, sheet_name};
use chrono::NaiveDateTime;
use core_types::{numeric_value, timestamp_values, Asset};
use polars::prelude::{AnyValue, Column, DataFrame, DataType};
use rust_xlsxwriter::{Color, ColNum, Format, FormatAlign, FormatBorder, RowNum, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const ARRIVAL_NUM_FORMAT: &str = "mm/dd/yyyy hh:mm";
const ARRIVAL_COLUMN_WIDTH: f64 = 18.0;
const HEADER_FILL: u32 = 0xD7E4BC;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportMetrics {
    /// Rows across all groups.
    pub total_entries: usize,
    /// One per non-empty group.
    pub sheets_written: usize,
}

/// A finished workbook held in memory.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub metrics: ExportMetrics,
}

impl ReportArtifact {
    /// Writes the workbook into `dir` under its file name, creating the
    /// directory if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Report artifact written.");
        Ok(path)
    }
}

/// Renders a [`TravelerReport`] as an `.xlsx` workbook, one sheet per
/// non-empty group.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    header_format: Format,
    arrival_format: Format,
}

impl Default for ReportExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportExporter {
    pub fn new() -> Self {
        Self {
            header_format: Format::new()
                .set_bold()
                .set_text_wrap()
                .set_align(FormatAlign::Top)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_border(FormatBorder::Thin),
            arrival_format: Format::new().set_num_format(ARRIVAL_NUM_FORMAT),
        }
    }

    /// Builds the workbook.
    ///
    /// The grouping column is dropped from every sheet since the sheet name
    /// already carries it. A report with no non-empty group still produces a
    /// valid workbook holding the writer's default blank `Sheet1`.
    pub fn export(
        &self,
        report: &TravelerReport,
        report_time: NaiveDateTime,
        asset: Option<Asset>,
    ) -> Result<ReportArtifact, ExportError> {
        let mut workbook = Workbook::new();
        let mut metrics = ExportMetrics::default();

        for (group, frame) in report.groups() {
            metrics.total_entries += frame.height();
            if frame.height() == 0 {
                tracing::debug!(group, "Skipping empty group.");
                continue;
            }

            let mut data = match frame.get_column_index(report.key()) {
                Some(_) => frame.drop(report.key())?,
                None => frame.clone(),
            };
            coerce_arrival(&mut data)?;

            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet_name(group))?;
            self.write_sheet(worksheet, &data)?;
            metrics.sheets_written += 1;
        }

        let bytes = workbook.save_to_buffer()?;
        let file_name = artifact_file_name(asset, report_time);
        tracing::info!(
            file_name = %file_name,
            sheets = metrics.sheets_written,
            entries = metrics.total_entries,
            "Traveler report exported."
        );

        Ok(ReportArtifact {
            file_name,
            bytes,
            mime: XLSX_MIME,
            metrics,
        })
    }

    fn write_sheet(&self, worksheet: &mut Worksheet, frame: &DataFrame) -> Result<(), ExportError> {
        for (idx, column) in frame.get_columns().iter().enumerate() {
            let col = idx as ColNum;
            worksheet.write_string_with_format(0, col, column.name().as_str(), &self.header_format)?;
            if matches!(column.dtype(), DataType::Datetime(_, _)) {
                self.write_timestamps(worksheet, col, column)?;
            } else {
                write_values(worksheet, col, column)?;
            }
        }

        if let Some(idx) = frame.get_column_index(ARRIVAL_COLUMN) {
            worksheet.set_column_width(idx as ColNum, ARRIVAL_COLUMN_WIDTH)?;
        }
        Ok(())
    }

    fn write_timestamps(
        &self,
        worksheet: &mut Worksheet,
        col: ColNum,
        column: &Column,
    ) -> Result<(), ExportError> {
        for (r, value) in timestamp_values(column)?.into_iter().enumerate() {
            if let Some(ts) = value {
                worksheet.write_datetime_with_format((r + 1) as RowNum, col, &ts, &self.arrival_format)?;
            }
        }
        Ok(())
    }
}

/// Writes one non-datetime column below its header. Nulls and non-finite
/// numbers leave the cell blank.
fn write_values(worksheet: &mut Worksheet, col: ColNum, column: &Column) -> Result<(), ExportError> {
    let numeric = column.dtype().is_numeric();
    for r in 0..column.len() {
        let row = (r + 1) as RowNum;
        match column.get(r)? {
            AnyValue::Null => {}
            AnyValue::Boolean(b) => {
                worksheet.write_boolean(row, col, b)?;
            }
            AnyValue::String(s) => {
                worksheet.write_string(row, col, s)?;
            }
            AnyValue::StringOwned(s) => {
                worksheet.write_string(row, col, s.as_str())?;
            }
            value if numeric => {
                if let Some(n) = numeric_value(&value) {
                    worksheet.write_number(row, col, n)?;
                }
            }
            value => {
                worksheet.write_string(row, col, value.to_string())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use chrono::NaiveDate;
    use core_types::frame_from_records;
    use polars::prelude::PlSmallStr;
    use serde_json::json;
    use std::io::Cursor;

    fn report_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn results(value: serde_json::Value) -> DataFrame {
        let records: Vec<_> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        frame_from_records(&records).unwrap()
    }

    fn sheets(bytes: &[u8]) -> Vec<String> {
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .unwrap()
            .sheet_names()
            .to_vec()
    }

    #[test]
    fn writes_one_sheet_per_group() {
        let report = TravelerReport::group(
            results(json!([
                { "Group": "Grp All-Day", "Output": 1, "Arrival": "2024-03-04 10:15" },
                { "Group": "Grp B", "Output": 2, "Arrival": "2024-03-04 11:00" },
                { "Group": "Grp B", "Output": 3, "Arrival": "bad" }
            ])),
            "Group",
        )
        .unwrap();

        let artifact = ReportExporter::new()
            .export(&report, report_time(), Some(Asset::Nq))
            .unwrap();

        assert_eq!(artifact.file_name, "nq_traveler_report_05-Mar-24_18-00.xlsx");
        assert_eq!(artifact.mime, XLSX_MIME);
        assert_eq!(
            artifact.metrics,
            ExportMetrics {
                total_entries: 3,
                sheets_written: 2
            }
        );
        assert_eq!(sheets(&artifact.bytes), ["Grp_All_Day", "Grp_B"]);
    }

    #[test]
    fn sheet_drops_group_column_and_types_arrival() {
        let report = TravelerReport::group(
            results(json!([
                { "Group": "A", "Output": 7, "Arrival": "03/04/2024 10:15", "Note": "x" }
            ])),
            "Group",
        )
        .unwrap();
        let artifact = ReportExporter::new().export(&report, report_time(), None).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(artifact.bytes)).unwrap();
        let range = workbook.worksheet_range("A").unwrap();

        let header: Vec<String> = range.rows().next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, ["Output", "Arrival", "Note"]);

        assert_eq!(range.get((1, 0)), Some(&Data::Float(7.0)));
        let Some(Data::DateTime(arrival)) = range.get((1, 1)) else {
            panic!("arrival should be written as a datetime: {:?}", range.get((1, 1)));
        };
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();
        let drift = arrival.as_datetime().unwrap() - expected;
        assert!(drift.num_seconds().abs() < 1);
        assert_eq!(range.get((1, 2)), Some(&Data::String("x".to_string())));
    }

    #[test]
    fn empty_report_is_still_a_workbook() {
        let artifact = ReportExporter::new()
            .export(&TravelerReport::default(), report_time(), Some(Asset::Es))
            .unwrap();

        assert_eq!(artifact.metrics, ExportMetrics::default());
        assert_eq!(sheets(&artifact.bytes), ["Sheet1"]);
    }

    #[test]
    fn empty_groups_are_counted_but_not_written() {
        let mut report = TravelerReport::default();
        let empty = DataFrame::new(vec![
            Column::new_empty(PlSmallStr::from("Group"), &DataType::String),
            Column::new_empty(PlSmallStr::from("Output"), &DataType::Int64),
        ])
        .unwrap();
        report.insert("Empty", empty);
        report.insert(
            "Full",
            results(json!([{ "Group": "Full", "Output": 1 }])),
        );

        let artifact = ReportExporter::new().export(&report, report_time(), None).unwrap();
        assert_eq!(artifact.metrics.sheets_written, 1);
        assert_eq!(artifact.metrics.total_entries, 1);
        assert_eq!(sheets(&artifact.bytes), ["Full"]);
    }

    #[test]
    fn colliding_sheet_names_are_an_error() {
        let report = TravelerReport::group(
            results(json!([
                { "Group": "Grp A", "Output": 1 },
                { "Group": "Grp-A", "Output": 2 }
            ])),
            "Group",
        )
        .unwrap();
        let err = ReportExporter::new()
            .export(&report, report_time(), None)
            .unwrap_err();
        assert!(matches!(err, ExportError::Workbook(_)));
    }

    #[test]
    fn artifact_is_written_under_its_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ReportExporter::new()
            .export(&TravelerReport::default(), report_time(), None)
            .unwrap();

        let path = artifact.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), "traveler_report_05-Mar-24_18-00.xlsx");
        assert_eq!(fs::read(&path).unwrap(), artifact.bytes);
    }
}
