// Primitives for reading JSON files.

use crate::tally::{io_common::make_default_id, *};

/// Reads either a plain array of records or a sync snapshot holding them
/// under `candidates`.
pub fn read_json_records(path: String) -> BTallyResult<Vec<ParsedRecord>> {
    let default_id = make_default_id(&path);
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: path.clone() })?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let records = parse_records_js(js)?;
    Ok(records
        .iter()
        .enumerate()
        .map(|(idx, r)| r.to_parsed(default_id(idx + 1)))
        .collect())
}

pub fn parse_records_js(js: JSValue) -> TallyResult<Vec<JsScoreRecord>> {
    let items = match js {
        JSValue::Array(_) => js,
        JSValue::Object(mut obj) => match obj.remove("candidates") {
            Some(JSValue::Array(items)) => JSValue::Array(items),
            _ => whatever!("Expected an array of score sheets under the key 'candidates'"),
        },
        _ => whatever!("Expected an array of score sheets"),
    };
    let records: Vec<JsScoreRecord> = serde_json::from_value(items).context(ParsingJsonSnafu {})?;
    debug!("parse_records_js: {} records", records.len());
    Ok(records)
}
