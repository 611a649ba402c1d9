use crate::tally::*;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "exportFile")]
    pub export_file: Option<String>,
    #[serde(rename = "summaryFile")]
    pub summary_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub submissions: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    pub fn from_path(path: &str, provider: &str, excel_worksheet_name: Option<String>) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: path.to_string(),
            excel_worksheet_name,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "recordSources", default)]
    pub record_sources: Vec<FileSource>,
    #[serde(rename = "overridesFile")]
    pub overrides_file: Option<String>,
}

pub fn read_config(path: &str) -> TallyResult<SessionConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SessionConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: String) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// A score sheet as stored in JSON files and in the sync snapshots.
///
/// All the fields are optional. Numbers may be written as JSON numbers or strings.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsScoreRecord {
    #[serde(rename = "judgeUsername")]
    pub judge_username: Option<String>,
    pub group: Option<JSValue>,
    #[serde(rename = "groupIndex")]
    pub group_index: Option<JSValue>,
    pub name: Option<String>,
    #[serde(rename = "enName")]
    pub en_name: Option<String>,
    pub organization: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "selectedStages")]
    pub selected_stages: Option<Vec<String>>,
    pub scores: Option<BTreeMap<String, JSValue>>,
    #[serde(rename = "totalScore")]
    pub total_score: Option<JSValue>,
    pub feedback: Option<String>,
}

impl JsScoreRecord {
    pub fn from_record(r: &ScoreRecord) -> JsScoreRecord {
        JsScoreRecord {
            judge_username: Some(r.judge.clone()),
            group: Some(JSValue::String(r.group_number.clone())),
            group_index: Some(JSValue::String(r.group_index.clone())),
            name: Some(r.name.clone()),
            en_name: Some(r.en_name.clone()),
            organization: Some(r.organization.clone()),
            category: Some(r.category.clone()),
            selected_stages: Some(r.selected_stages.clone()),
            scores: Some(
                r.scores
                    .iter()
                    .map(|(c, v)| (c.code().to_string(), json!(v)))
                    .collect(),
            ),
            total_score: Some(json!(r.total_score)),
            feedback: r.feedback.clone(),
        }
    }

    pub fn to_parsed(&self, id: String) -> ParsedRecord {
        ParsedRecord {
            id,
            judge: self.judge_username.clone().unwrap_or_default(),
            group_number: read_js_string(&self.group),
            group_index: read_js_string(&self.group_index),
            name: self.name.clone().unwrap_or_default(),
            en_name: self.en_name.clone().unwrap_or_default(),
            organization: self.organization.clone().unwrap_or_default(),
            category: self.category.clone().unwrap_or_default(),
            stages: self.selected_stages.clone().unwrap_or_default(),
            scores: self
                .scores
                .iter()
                .flatten()
                .map(|(code, v)| (code.clone(), read_js_string(&Some(v.clone()))))
                .collect(),
            total_score: read_js_string(&self.total_score),
            feedback: self.feedback.clone().unwrap_or_default(),
        }
    }
}

/// Numbers and strings are read as text, everything else as an empty string.
fn read_js_string(x: &Option<JSValue>) -> String {
    match x {
        Some(JSValue::String(s)) => s.clone(),
        Some(JSValue::Number(n)) => n.to_string(),
        _ => "".to_string(),
    }
}

/// The corrections of one candidate in the overrides file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "enName", skip_serializing_if = "Option::is_none")]
    pub en_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

pub fn read_overrides(path: &Path) -> TallyResult<OverrideStore> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p })?;
    let entries: BTreeMap<String, JsOverride> =
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    info!("Read {} candidate corrections from {}", entries.len(), path.display());
    Ok(OverrideStore::from_entries(entries.into_iter().map(
        |(code, o)| {
            (
                CandidateId::from_code(&code),
                Override {
                    name: o.name,
                    en_name: o.en_name,
                    organization: o.organization,
                    feedback: o.feedback,
                },
            )
        },
    )))
}

pub fn write_overrides(path: &Path, store: &OverrideStore) -> TallyResult<()> {
    let entries: BTreeMap<String, JsOverride> = store
        .entries()
        .map(|(id, o)| {
            (
                id.to_string(),
                JsOverride {
                    name: o.name.clone(),
                    en_name: o.en_name.clone(),
                    organization: o.organization.clone(),
                    feedback: o.feedback.clone(),
                },
            )
        })
        .collect();
    let js = serde_json::to_string_pretty(&entries).context(ParsingJsonSnafu {})?;
    let p = path.display().to_string();
    fs::write(path, js).context(WritingFileSnafu { path: p })?;
    debug!("write_overrides: {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"outputSettings": {"contestName": "Spring"},
                "recordSources": [{"provider": "csv", "filePath": "a.csv"}]}"#,
        )
        .unwrap();
        assert_eq!(config.output_settings.contest_name, "Spring");
        assert_eq!(config.output_settings.output_directory, None);
        assert_eq!(config.record_sources[0].provider, "csv");
        assert_eq!(config.record_sources[0].excel_worksheet_name, None);
        assert_eq!(config.overrides_file, None);
    }

    #[test]
    fn js_record_with_loose_types() {
        let js: JsScoreRecord = serde_json::from_str(
            r#"{"judgeUsername": "li", "group": 3, "groupIndex": "5",
                "scores": {"1_1": 8.5, "2_2": "7", "3_1": null}, "totalScore": true}"#,
        )
        .unwrap();
        let pr = js.to_parsed("r".to_string());
        assert_eq!(pr.group_number, "3");
        assert_eq!(pr.group_index, "5");
        assert_eq!(
            pr.scores,
            vec![
                ("1_1".to_string(), "8.5".to_string()),
                ("2_2".to_string(), "7".to_string()),
                ("3_1".to_string(), "".to_string()),
            ]
        );
        assert_eq!(pr.total_score, "");
        assert_eq!(pr.name, "");
    }

    #[test]
    fn overrides_file_keeps_unset_fields_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let mut store = OverrideStore::new();
        let id = CandidateId::from_code("01-01");
        store.set_field(&id, OverrideField::Name, "Alice");
        write_overrides(&path, &store).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("feedback"));
        let back = read_overrides(&path).unwrap();
        let o = back.get(&id).unwrap();
        assert_eq!(o.name.as_deref(), Some("Alice"));
        assert_eq!(o.feedback, None);
    }
}
