// Primitives for reading CSV files.

use std::fs::File;

use crate::tally::{
    io_common::{make_default_id, ColumnMap},
    *,
};

pub fn read_csv_records(path: String) -> BTallyResult<Vec<ParsedRecord>> {
    let default_id = make_default_id(&path);

    let mut records = get_records(&path)?;
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { lineno: 1usize })?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => {
            warn!("read_csv_records: {} is empty", path);
            return Ok(Vec::new());
        }
    };
    let columns = ColumnMap::from_header(&header);

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if row.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_records: skipping blank line {}", lineno);
            continue;
        }
        let pr = columns.parse_row(default_id(lineno), &row);
        debug!("read_csv_records: lineno: {:?} record: {:?}", lineno, &pr);
        res.push(pr);
    }
    Ok(res)
}

fn get_records(path: &String) -> TallyResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets.csv");
        fs::write(
            &path,
            "judgeUsername,group,groupIndex,name,1_1,totalScore,feedback\n\
             zhang,1,1,Alice,8,85,\"Good, clear\"\n\
             ,,,,,,\n\
             li,1,1,,9,91\n",
        )
        .unwrap();
        let parsed = read_csv_records(path.display().to_string()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].feedback, "Good, clear");
        assert_eq!(parsed[0].id, "sheets.csv-00000002");
        assert_eq!(parsed[1].judge, "li");
        assert_eq!(parsed[1].feedback, "");

        let records = validate_records(&parsed);
        let agg = aggregate(&records);
        let s = summarize(agg.groups().next().unwrap());
        assert_eq!(s.mean_total_display, "88.0");
        assert_eq!(s.criterion_mean(Criterion::C1_1), 8.5);
    }

    #[test]
    fn missing_file() {
        let res = read_csv_records("/nonexistent/sheets.csv".to_string());
        assert!(matches!(res.map_err(|e| *e), Err(TallyError::CsvOpen { .. })));
    }
}
