use log::{debug, info, warn};

use score_aggregation::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;

pub mod config_reader;
pub mod export_csv;
mod io_common;
mod io_csv;
mod io_excel;
mod io_json;
pub mod report_html;
pub mod sync;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet to read in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV export"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing parent directory"))]
    MissingParentDir {},
    #[snafu(display("No score sheets to read: use --input, --config or --join-session"))]
    MissingSource {},
    #[snafu(display("Provider not implemented: {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display(
        "Invalid correction {edit:?}: expected ID.field=value, with field one of name, enName, organization, feedback"
    ))]
    InvalidEdit { edit: String },
    #[snafu(display(
        "Invalid sync token {token:?}: a token has at least {min} letters or digits"
    ))]
    InvalidSyncToken { token: String, min: usize },
    #[snafu(display("No shared session found for token {token}"))]
    UnknownSyncToken { token: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;
pub type BTallyResult<T> = Result<T, Box<TallyError>>;

/// A score sheet, as parsed by the readers.
/// This is before turning the numbers and the criterion codes into values.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ParsedRecord {
    /// Where the record comes from, for the logs.
    pub id: String,
    pub judge: String,
    pub group_number: String,
    pub group_index: String,
    pub name: String,
    pub en_name: String,
    pub organization: String,
    pub category: String,
    pub stages: Vec<String>,
    pub scores: Vec<(String, String)>,
    pub total_score: String,
    pub feedback: String,
}

/// Turns the parsed records into score records.
///
/// This never fails: unreadable numbers count as zero and unknown criteria
/// are dropped. The text fields are trimmed, except the feedback which is
/// kept as written.
pub fn validate_records(parsed: &[ParsedRecord]) -> Vec<ScoreRecord> {
    let mut res: Vec<ScoreRecord> = Vec::new();
    for pr in parsed.iter() {
        let mut scores: BTreeMap<Criterion, f64> = BTreeMap::new();
        for (code, raw) in pr.scores.iter() {
            match Criterion::from_code(code) {
                // An empty cell is a missing score.
                Some(_) if raw.trim().is_empty() => {}
                Some(c) => {
                    scores.insert(c, read_number(raw, &pr.id));
                }
                None => {
                    warn!(
                        "validate_records: record {}: dropping unknown criterion {:?}",
                        pr.id, code
                    );
                }
            }
        }
        let record = ScoreRecord {
            judge: pr.judge.trim().to_string(),
            group_number: pr.group_number.trim().to_string(),
            group_index: pr.group_index.trim().to_string(),
            name: pr.name.trim().to_string(),
            en_name: pr.en_name.trim().to_string(),
            organization: pr.organization.trim().to_string(),
            category: pr.category.trim().to_string(),
            selected_stages: pr.stages.clone(),
            scores,
            total_score: read_number(&pr.total_score, &pr.id),
            feedback: if pr.feedback.is_empty() {
                None
            } else {
                Some(pr.feedback.clone())
            },
        };
        debug!("validate_records: {}: {:?}", pr.id, record);
        res.push(record);
    }
    res
}

fn read_number(raw: &str, record_id: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() => x,
        _ => {
            warn!(
                "read_number: record {}: could not read number {:?}, using 0",
                record_id, s
            );
            0.0
        }
    }
}

fn read_records(root_path: &Path, cfs: &FileSource) -> BTallyResult<Vec<ScoreRecord>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read score sheets from {:?}", p2);
    let parsed = match cfs.provider.as_str() {
        "json" => io_json::read_json_records(p2)?,
        "csv" => io_csv::read_csv_records(p2)?,
        "xlsx" | "excel" => io_excel::read_excel_records(p2, cfs)?,
        x => {
            return Err(Box::new(TallyError::UnknownProvider {
                provider: x.to_string(),
            }))
        }
    };
    info!("Read {} score sheets from {}", parsed.len(), cfs.file_path);
    Ok(validate_records(&parsed))
}

/// Everything the final documents need for one candidate.
struct CandidateOutput<'a> {
    group: &'a CandidateGroup,
    summary: CandidateSummary,
    fields: EffectiveFields,
}

fn candidate_outputs<'a>(
    aggregation: &'a Aggregation,
    store: &OverrideStore,
) -> Vec<CandidateOutput<'a>> {
    aggregation
        .groups()
        .map(|group| CandidateOutput {
            group,
            summary: summarize(group),
            fields: store.effective(group),
        })
        .collect()
}

fn candidate_to_json(c: &CandidateOutput) -> JSValue {
    let first = c.group.first_record();
    let mut averages: JSMap<String, JSValue> = JSMap::new();
    for (criterion, mean) in c.summary.criterion_means.iter() {
        averages.insert(
            criterion.code().to_string(),
            json!(format_one_decimal(*mean)),
        );
    }
    let judges: Vec<JSValue> = c
        .summary
        .judge_scores
        .iter()
        .map(|js| json!({"judge": js.judge, "totalScore": js.total_score.to_string()}))
        .collect();
    json!({
        "id": c.group.id.to_string(),
        "name": c.fields.name,
        "enName": c.fields.en_name,
        "organization": c.fields.organization,
        "group": first.group_number,
        "groupIndex": first.group_index,
        "category": first.category,
        "stages": c.summary.stages,
        "judges": judges,
        "averages": averages,
        "averageTotal": c.summary.mean_total_display,
        "feedback": c.fields.feedback,
    })
}

fn build_summary_js(
    contest_name: &str,
    cohort: &CohortStats,
    candidates: &[CandidateOutput],
) -> JSValue {
    let c = OutputConfig {
        contest: contest_name.to_string(),
        submissions: cohort.submissions.to_string(),
    };
    json!({
        "config": c,
        "cohort": {
            "submissions": cohort.submissions.to_string(),
            "candidates": cohort.candidates.to_string(),
            "averageTotal": cohort.mean_total_display,
            "maxTotal": cohort.max_total.to_string(),
        },
        "candidates": candidates.iter().map(candidate_to_json).collect::<Vec<JSValue>>(),
    })
}

/// Parses a correction of the form `ID.field=value`.
pub fn parse_edit(edit: &str) -> TallyResult<(CandidateId, OverrideField, String)> {
    let (target, value) = edit.split_once('=').context(InvalidEditSnafu { edit })?;
    let (id, key) = target.rsplit_once('.').context(InvalidEditSnafu { edit })?;
    let field = OverrideField::from_key(key.trim()).context(InvalidEditSnafu { edit })?;
    ensure!(!id.trim().is_empty(), InvalidEditSnafu { edit });
    Ok((CandidateId::from_code(id.trim()), field, value.to_string()))
}

fn apply_edits(
    store: &mut OverrideStore,
    aggregation: &Aggregation,
    edits: &[String],
) -> TallyResult<()> {
    for edit in edits.iter() {
        let (id, field, value) = parse_edit(edit)?;
        if aggregation.get(&id).is_none() {
            warn!(
                "apply_edits: no score sheet for candidate {}, keeping the correction anyway",
                id
            );
        }
        store.set_field(&id, field, &value);
    }
    Ok(())
}

/// Writes a summary, or prints it when no path (or `stdout`) is given.
fn write_summary(out: &Option<String>, pretty_js: &str) -> TallyResult<()> {
    match out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
            Ok(())
        }
        Some(path) => {
            fs::write(path, pretty_js).context(WritingFileSnafu { path })?;
            info!("Summary written to {}", path);
            Ok(())
        }
    }
}

fn check_reference(summary_p: &str, pretty_js_stats: &str) -> TallyResult<()> {
    let summary_ref = read_summary(summary_p.to_string())?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between compiled summary and reference summary")
    }
    info!("The compiled summary matches the reference {}", summary_p);
    Ok(())
}

/// The settings of one run, after merging the arguments with the configuration file.
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub contest_name: String,
    /// The directory of the configuration file, against which the sources are resolved.
    pub root: PathBuf,
    pub sources: Vec<FileSource>,
    pub summary_out: Option<String>,
    pub reference: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub export_file: Option<PathBuf>,
    pub overrides_file: Option<PathBuf>,
    pub edits: Vec<String>,
    pub create_session: bool,
    pub join_session: Option<String>,
    pub sync_dir: PathBuf,
}

pub const DEFAULT_SYNC_DIR: &str = ".judgetally-sync";

pub fn session_settings(args: &Args) -> BTallyResult<SessionSettings> {
    let mut settings = SessionSettings {
        sync_dir: PathBuf::from(DEFAULT_SYNC_DIR),
        ..Default::default()
    };

    if let Some(config_path) = args.config.as_deref() {
        let config = read_config(config_path)?;
        let root = Path::new(config_path)
            .parent()
            .context(MissingParentDirSnafu {})?
            .to_path_buf();
        let resolve = |p: &Option<String>| p.as_ref().map(|s| root.join(s));
        settings.contest_name = config.output_settings.contest_name.clone();
        settings.report_dir = resolve(&config.output_settings.output_directory);
        settings.export_file = resolve(&config.output_settings.export_file);
        settings.summary_out = resolve(&config.output_settings.summary_file)
            .map(|p| p.display().to_string());
        settings.overrides_file = resolve(&config.overrides_file);
        settings.sources = config.record_sources.clone();
        settings.root = root;
    }

    if let Some(input) = args.input.as_deref() {
        settings.root = PathBuf::new();
        settings.sources = vec![FileSource::from_path(
            input,
            args.input_type.as_deref().unwrap_or("json"),
            args.excel_worksheet_name.clone(),
        )];
    }
    if args.out.is_some() {
        settings.summary_out = args.out.clone();
    }
    if let Some(d) = args.report_dir.as_deref() {
        settings.report_dir = Some(PathBuf::from(d));
    }
    if let Some(e) = args.export.as_deref() {
        settings.export_file = Some(PathBuf::from(e));
    }
    if let Some(o) = args.overrides.as_deref() {
        settings.overrides_file = Some(PathBuf::from(o));
    }
    if let Some(s) = args.sync_dir.as_deref() {
        settings.sync_dir = PathBuf::from(s);
    }
    settings.reference = args.reference.clone();
    settings.edits = args.edit.clone();
    settings.create_session = args.create_session;
    settings.join_session = args.join_session.clone();
    Ok(settings)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn run_session(settings: &SessionSettings) -> BTallyResult<()> {
    info!("settings: {:?}", settings);

    let records: Vec<ScoreRecord> = if let Some(token) = settings.join_session.as_deref() {
        sync::join_session(token, &settings.sync_dir)?
    } else {
        if settings.sources.is_empty() {
            return Err(Box::new(TallyError::MissingSource {}));
        }
        let mut data: Vec<ScoreRecord> = Vec::new();
        for cfs in settings.sources.iter() {
            let mut file_data = read_records(&settings.root, cfs)?;
            data.append(&mut file_data);
        }
        data
    };

    let aggregation = aggregate(&records);
    let cohort = cohort_stats(&records, &aggregation);
    info!(
        "{} score sheets, {} candidates, average total {}, highest total {}",
        cohort.submissions, cohort.candidates, cohort.mean_total_display, cohort.max_total
    );

    let mut store = match settings.overrides_file.as_deref() {
        Some(p) if p.exists() => read_overrides(p)?,
        _ => OverrideStore::new(),
    };
    store.initialize_defaults(&aggregation);
    apply_edits(&mut store, &aggregation, &settings.edits)?;
    if let Some(p) = settings.overrides_file.as_deref() {
        write_overrides(p, &store)?;
    }

    if let Some(p) = settings.export_file.as_deref() {
        export_csv::write_bulk_export(p, &records)?;
    }

    let outputs = candidate_outputs(&aggregation, &store);

    if let Some(dir) = settings.report_dir.as_deref() {
        fs::create_dir_all(dir).context(WritingFileSnafu {
            path: dir.display().to_string(),
        })?;
        for c in outputs.iter() {
            let input = report_html::ReportInput::assemble(
                &settings.contest_name,
                c.group,
                &c.summary,
                &c.fields,
            );
            report_html::write_report(dir, &input)?;
        }
        info!("Wrote {} reports to {}", outputs.len(), dir.display());
    }

    let summary_js = build_summary_js(&settings.contest_name, &cohort, &outputs);
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    write_summary(&settings.summary_out, &pretty_js_stats)?;

    if settings.create_session {
        let judges = sync::judges_from_records(&records);
        let token = sync::create_session(&records, &judges, now_millis(), &settings.sync_dir)?;
        println!("Sync token: {}", token);
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = settings.reference.as_deref() {
        check_reference(summary_p, &pretty_js_stats)?;
    }

    Ok(())
}

pub fn run(args: &Args) -> BTallyResult<()> {
    let settings = session_settings(args)?;
    run_session(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parsed(id: &str, group: &str, index: &str, total: &str) -> ParsedRecord {
        ParsedRecord {
            id: id.to_string(),
            judge: "j".to_string(),
            group_number: group.to_string(),
            group_index: index.to_string(),
            total_score: total.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn malformed_numbers_are_zero() {
        init();
        let mut pr = parsed("r1", "1", "1", "n/a");
        pr.scores = vec![
            ("1_1".to_string(), "8".to_string()),
            ("1_2".to_string(), "".to_string()),
            ("2_1".to_string(), "abc".to_string()),
            ("9_9".to_string(), "5".to_string()),
        ];
        let records = validate_records(&[pr]);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.total_score, 0.0);
        assert_eq!(r.score(Criterion::C1_1), 8.0);
        assert_eq!(r.score(Criterion::C1_2), 0.0);
        assert_eq!(r.score(Criterion::C2_1), 0.0);
        assert_eq!(r.scores.len(), 2);
        assert_eq!(r.feedback, None);
    }

    #[test]
    fn positions_are_trimmed_and_feedback_kept() {
        let mut pr = parsed("r1", " 3 ", "5\t", "80");
        pr.feedback = "  ".to_string();
        let mut empty = parsed("r2", "3", "5", "90");
        empty.feedback = "".to_string();
        let records = validate_records(&[pr, empty]);
        assert_eq!(records[0].group_number, "3");
        assert_eq!(records[0].group_index, "5");
        assert_eq!(CandidateId::from_record(&records[0]).as_str(), "03-05");
        assert_eq!(records[0].feedback.as_deref(), Some("  "));
        assert_eq!(records[1].feedback, None);

        let agg = aggregate(&records);
        let g = agg.get(&CandidateId::from_code("03-05")).unwrap();
        assert_eq!(compile_feedback(g), "【评委 j】:\n  ");
    }

    #[test]
    fn edits_are_parsed() {
        let (id, field, value) = parse_edit("01-03.name=Alice=A").unwrap();
        assert_eq!(id.as_str(), "01-03");
        assert_eq!(field, OverrideField::Name);
        assert_eq!(value, "Alice=A");

        let (_, field, value) = parse_edit("02-10.feedback=").unwrap();
        assert_eq!(field, OverrideField::Feedback);
        assert_eq!(value, "");

        assert!(matches!(
            parse_edit("01-03.score=9"),
            Err(TallyError::InvalidEdit { .. })
        ));
        assert!(parse_edit("01-03").is_err());
        assert!(parse_edit(".name=x").is_err());
    }

    #[test]
    fn summary_json_shape() {
        init();
        let mut a = parsed("r1", "1", "1", "85");
        a.scores = vec![("1_1".to_string(), "8".to_string())];
        a.feedback = "Good".to_string();
        let mut b = parsed("r2", "1", "1", "91");
        b.scores = vec![("1_1".to_string(), "9".to_string())];
        let records = validate_records(&[a, b]);
        let agg = aggregate(&records);
        let cohort = cohort_stats(&records, &agg);
        let mut store = OverrideStore::new();
        store.initialize_defaults(&agg);
        let outputs = candidate_outputs(&agg, &store);
        let js = build_summary_js("Contest", &cohort, &outputs);

        assert_eq!(js["config"]["contest"], "Contest");
        assert_eq!(js["cohort"]["submissions"], "2");
        assert_eq!(js["cohort"]["averageTotal"], "88.0");
        assert_eq!(js["cohort"]["maxTotal"], "91");
        let c = &js["candidates"][0];
        assert_eq!(c["id"], "01-01");
        assert_eq!(c["averageTotal"], "88.0");
        assert_eq!(c["averages"]["1_1"], "8.5");
        assert_eq!(c["averages"]["3_2"], "0.0");
        assert_eq!(c["judges"].as_array().unwrap().len(), 2);
        assert_eq!(c["feedback"], "【评委 j】:\nGood");
    }

    #[test]
    fn full_run_writes_all_outputs() {
        init();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.json");
        fs::write(
            &input,
            r#"[
              {"judgeUsername": "zhang", "group": "1", "groupIndex": "1", "name": "Alice",
               "scores": {"1_1": 8}, "totalScore": 85, "feedback": "Good"},
              {"judgeUsername": "li", "group": 1, "groupIndex": 1,
               "scores": {"1_1": "9"}, "totalScore": "91"},
              {"judgeUsername": "li", "group": "2", "groupIndex": "10", "name": "Bob",
               "scores": {}, "totalScore": 70}
            ]"#,
        )
        .unwrap();
        let summary = dir.path().join("summary.json");
        let settings = SessionSettings {
            contest_name: "Contest".to_string(),
            sources: vec![FileSource::from_path(
                &input.display().to_string(),
                "json",
                None,
            )],
            summary_out: Some(summary.display().to_string()),
            report_dir: Some(dir.path().join("reports")),
            export_file: Some(dir.path().join("all.csv")),
            overrides_file: Some(dir.path().join("overrides.json")),
            edits: vec!["02-10.organization=School B".to_string()],
            sync_dir: dir.path().join("sync"),
            ..Default::default()
        };
        run_session(&settings).unwrap();

        let reports: Vec<_> = fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .collect();
        assert_eq!(reports.len(), 2);
        assert!(dir.path().join("reports/report_01-01.html").exists());

        let store = read_overrides(&dir.path().join("overrides.json")).unwrap();
        let o = store.get(&CandidateId::from_code("02-10")).unwrap();
        assert_eq!(o.organization.as_deref(), Some("School B"));

        // Running again against its own summary passes the reference check.
        let again = SessionSettings {
            summary_out: Some(dir.path().join("summary2.json").display().to_string()),
            reference: Some(summary.display().to_string()),
            ..settings.clone()
        };
        run_session(&again).unwrap();
    }

    #[test]
    fn reference_mismatch_fails() {
        init();
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.json");
        fs::write(&reference, r#"{"cohort": {"submissions": "3"}}"#).unwrap();
        let res = check_reference(
            &reference.display().to_string(),
            "{\n  \"cohort\": {\n    \"submissions\": \"2\"\n  }\n}",
        );
        assert!(matches!(res, Err(TallyError::Whatever { .. })));
    }

    #[test]
    fn no_source_is_an_error() {
        let res = run_session(&SessionSettings::default());
        assert!(matches!(
            res.map_err(|e| *e),
            Err(TallyError::MissingSource {})
        ));
    }
}
