//! The bulk export: every score sheet as one row of a CSV table.
//!
//! This is the audit trail that goes with the averaged reports, so nothing
//! is grouped or averaged here.

use std::path::Path;

use crate::tally::{io_common::*, *};

/// Byte order mark, so that spreadsheet tools read the file as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn export_header() -> Vec<String> {
    let mut header: Vec<String> = [
        JUDGE_COLUMN,
        GROUP_COLUMN,
        GROUP_INDEX_COLUMN,
        NAME_COLUMN,
        EN_NAME_COLUMN,
        ORGANIZATION_COLUMN,
        CATEGORY_COLUMN,
        STAGES_COLUMN,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(Criterion::ALL.iter().map(|c| c.code().to_string()));
    header.push(TOTAL_COLUMN.to_string());
    header.push(FEEDBACK_COLUMN.to_string());
    header
}

fn export_row(r: &ScoreRecord) -> Vec<String> {
    let mut row = vec![
        r.judge.clone(),
        r.group_number.clone(),
        r.group_index.clone(),
        r.name.clone(),
        r.en_name.clone(),
        r.organization.clone(),
        r.category.clone(),
        r.selected_stages.join(STAGES_SEPARATOR),
    ];
    row.extend(Criterion::ALL.iter().map(|c| match r.scores.get(c) {
        Some(v) => v.to_string(),
        None => "".to_string(),
    }));
    row.push(r.total_score.to_string());
    row.push(r.feedback.clone().unwrap_or_default());
    row
}

/// Compiles the export of all the records, in their original order.
pub fn compile_bulk_export(records: &[ScoreRecord]) -> TallyResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(export_header()).context(WritingCsvSnafu {})?;
    for r in records.iter() {
        wtr.write_record(export_row(r)).context(WritingCsvSnafu {})?;
    }
    wtr.flush().context(WritingFileSnafu {
        path: "<memory>".to_string(),
    })?;
    match wtr.into_inner() {
        Ok(bytes) => Ok(bytes),
        Err(e) => whatever!("Error finishing the CSV export: {}", e.error()),
    }
}

pub fn write_bulk_export(path: &Path, records: &[ScoreRecord]) -> TallyResult<()> {
    let bytes = compile_bulk_export(records)?;
    let p = path.display().to_string();
    fs::write(path, bytes).context(WritingFileSnafu { path: p })?;
    info!("Exported {} score sheets to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(judge: &str, group: &str, total: f64) -> ScoreRecord {
        let mut r = ScoreRecord {
            judge: judge.to_string(),
            group_number: group.to_string(),
            group_index: "1".to_string(),
            name: "张三".to_string(),
            selected_stages: vec!["导入".to_string(), "练习".to_string()],
            total_score: total,
            feedback: Some("Line one\nline two, with comma".to_string()),
            ..Default::default()
        };
        r.scores.insert(Criterion::C1_1, 8.5);
        r
    }

    fn read_back(bytes: &[u8]) -> Vec<Vec<String>> {
        assert!(bytes.starts_with(UTF8_BOM));
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(&bytes[UTF8_BOM.len()..]);
        rdr.records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn one_row_per_record() {
        // Two sheets for the same candidate stay two rows.
        let records = vec![sheet("zhang", "1", 85.0), sheet("li", "1", 91.0), sheet("li", "2", 70.0)];
        let rows = read_back(&compile_bulk_export(&records).unwrap());
        assert_eq!(rows.len(), records.len() + 1);
        assert_eq!(rows[0], export_header());

        let header = &rows[0];
        let col = |name: &str| header.iter().position(|h| h == name).unwrap();
        assert_eq!(rows[1][col("judgeUsername")], "zhang");
        assert_eq!(rows[2][col("totalScore")], "91");
        assert_eq!(rows[1][col("1_1")], "8.5");
        assert_eq!(rows[1][col("1_2")], "");
        assert_eq!(rows[1][col("selectedStages")], "导入、练习");
        assert_eq!(rows[1][col("feedback")], "Line one\nline two, with comma");
    }

    #[test]
    fn empty_collection_has_only_header() {
        let rows = read_back(&compile_bulk_export(&[]).unwrap());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn export_reads_back_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.csv");
        let records = vec![sheet("zhang", "1", 85.0), sheet("li", "2", 70.0)];
        write_bulk_export(&path, &records).unwrap();
        let parsed = io_csv::read_csv_records(path.display().to_string()).unwrap();
        assert_eq!(validate_records(&parsed), records);
    }
}
