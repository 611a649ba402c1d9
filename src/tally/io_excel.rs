// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tally::{
    io_common::{make_default_id, ColumnMap},
    *,
};

pub fn read_excel_records(path: String, cfs: &FileSource) -> BTallyResult<Vec<ParsedRecord>> {
    let default_id = make_default_id(&path);

    let wrange = get_range(&path, cfs)?;

    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => row.iter().map(read_cell).collect(),
        None => {
            warn!("read_excel_records: {} has an empty worksheet", path);
            return Ok(Vec::new());
        }
    };
    debug!("read_excel_records: header: {:?}", header);
    let columns = ColumnMap::from_header(&header);

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // Rows are numbered from 1 in the spreadsheet, and the header is row 1.
        let lineno = idx + 2;
        let cells: Vec<String> = row.iter().map(read_cell).collect();
        if cells.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        let pr = columns.parse_row(default_id(lineno), &cells);
        debug!("read_excel_records: row {}: {:?}", lineno, pr);
        res.push(pr);
    }
    Ok(res)
}

fn read_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        // 3.0 is displayed as "3", which keeps the group numbers readable.
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        _ => {
            warn!("read_cell: could not understand cell {:?}, using an empty value", cell);
            "".to_string()
        }
    }
}

fn get_range(path: &String, cfs: &FileSource) -> BTallyResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;

    let wrange = if let Some(worksheet_name) = worksheet_name_o {
        // A worksheet name was provided, use it.
        workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?
    } else {
        workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?
    };
    Ok(wrange)
}
