//! The averaged report of one candidate, as a printable HTML page.
//!
//! The page only depends on its [`ReportInput`]: the same input always gives
//! the same bytes.

use std::path::{Path, PathBuf};

use crate::tally::*;

const DEFAULT_POSITION: &str = "?";
const DEFAULT_CATEGORY: &str = "PU0";

const STYLE: &str = "body{font-family:'PingFang SC','Microsoft YaHei',sans-serif;color:#1e293b;max-width:800px;margin:40px auto;padding:0 24px;}\
h1{font-size:24px;margin-bottom:4px;}\
.sub{color:#64748b;font-size:13px;margin-top:0;}\
table{border-collapse:collapse;width:100%;margin:16px 0;}\
th,td{border:1px solid #cbd5e1;padding:8px 12px;text-align:left;}\
th{background:#f1f5f9;width:30%;}\
.total{font-size:28px;font-weight:bold;}\
.feedback{white-space:pre-wrap;line-height:1.6;border:1px solid #cbd5e1;padding:16px;}\
@media print{body{margin:0;}}";

/// Everything printed in the report of one candidate.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportInput {
    pub contest_name: String,
    pub id: CandidateId,
    pub name: String,
    pub en_name: String,
    pub organization: String,
    pub group_number: String,
    pub group_index: String,
    pub category: String,
    pub stages: Vec<String>,
    pub criterion_means: Vec<(Criterion, f64)>,
    pub mean_total: String,
    pub feedback: String,
}

impl ReportInput {
    /// Collects the inputs of a report. The position and the category come
    /// from the first score sheet of the candidate.
    pub fn assemble(
        contest_name: &str,
        group: &CandidateGroup,
        summary: &CandidateSummary,
        fields: &EffectiveFields,
    ) -> ReportInput {
        let first = group.first_record();
        let or_default = |s: &str, default: &str| -> String {
            if s.is_empty() {
                default.to_string()
            } else {
                s.to_string()
            }
        };
        ReportInput {
            contest_name: contest_name.to_string(),
            id: group.id.clone(),
            name: fields.name.clone(),
            en_name: fields.en_name.clone(),
            organization: fields.organization.clone(),
            group_number: or_default(&first.group_number, DEFAULT_POSITION),
            group_index: or_default(&first.group_index, DEFAULT_POSITION),
            category: or_default(&first.category, DEFAULT_CATEGORY),
            stages: summary.stages.clone(),
            criterion_means: summary.criterion_means.clone(),
            mean_total: summary.mean_total_display.clone(),
            feedback: fields.feedback.clone(),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn info_row(label: &str, value: &str) -> String {
    format!(
        "<tr><th>{}</th><td>{}</td></tr>\n",
        label,
        escape_html(value)
    )
}

pub fn compile_report(input: &ReportInput) -> String {
    let title = if input.contest_name.is_empty() {
        format!("{} {}", input.id, input.name)
    } else {
        format!("{} · {} {}", input.contest_name, input.id, input.name)
    };

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"zh\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));

    html.push_str(&format!(
        "<h1>考生均分报告 Averaged Score Report</h1>\n<p class=\"sub\">{}</p>\n",
        escape_html(&input.contest_name)
    ));

    html.push_str("<table>\n");
    html.push_str(&info_row("识别码 ID", input.id.as_str()));
    html.push_str(&info_row("姓名 Name", &input.name));
    html.push_str(&info_row("英文名 English name", &input.en_name));
    html.push_str(&info_row("所属机构 Organization", &input.organization));
    html.push_str(&info_row("组号 Group", &input.group_number));
    html.push_str(&info_row("组内序号 Index", &input.group_index));
    html.push_str(&info_row("类别 Category", &input.category));
    html.push_str(&info_row("教学环节 Stages", &input.stages.join("、")));
    html.push_str("</table>\n");

    html.push_str("<h2>各项均分 Criterion averages</h2>\n<table>\n");
    for (criterion, mean) in input.criterion_means.iter() {
        html.push_str(&info_row(criterion.label(), &format_one_decimal(*mean)));
    }
    html.push_str("</table>\n");

    html.push_str(&format!(
        "<h2>总分均分 Average total</h2>\n<p class=\"total\">{}</p>\n",
        escape_html(&input.mean_total)
    ));

    html.push_str(&format!(
        "<h2>终审意见 Feedback</h2>\n<div class=\"feedback\">{}</div>\n",
        escape_html(&input.feedback)
    ));

    html.push_str("</body>\n</html>\n");
    html
}

/// The file name of a report. Characters that cannot appear in a portable
/// file name (path separators, `:` and the like) are replaced by `_`.
pub fn report_file_name(id: &CandidateId) -> String {
    let safe: String = id
        .as_str()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("report_{}.html", safe)
}

/// Writes the report into `dir`. The document is fully compiled before the file is opened.
pub fn write_report(dir: &Path, input: &ReportInput) -> TallyResult<PathBuf> {
    let html = compile_report(input);
    let path = dir.join(report_file_name(&input.id));
    let p = path.display().to_string();
    fs::write(&path, html).context(WritingFileSnafu { path: p })?;
    debug!("write_report: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> (CandidateGroup, OverrideStore) {
        let mut a = ScoreRecord {
            judge: "zhang".to_string(),
            group_number: "1".to_string(),
            group_index: "1".to_string(),
            name: "Tom & <Jerry>".to_string(),
            total_score: 85.0,
            feedback: Some("Good \"pace\"".to_string()),
            selected_stages: vec!["导入".to_string()],
            ..Default::default()
        };
        a.scores.insert(Criterion::C1_1, 8.0);
        let mut b = a.clone();
        b.judge = "li".to_string();
        b.total_score = 91.0;
        b.scores.insert(Criterion::C1_1, 9.0);
        b.feedback = None;
        let agg = aggregate(&[a, b]);
        let group = agg.groups().next().unwrap().clone();
        (group, OverrideStore::new())
    }

    fn input() -> ReportInput {
        let (group, store) = sample_group();
        ReportInput::assemble("Spring", &group, &summarize(&group), &store.effective(&group))
    }

    #[test]
    fn same_input_same_bytes() {
        assert_eq!(compile_report(&input()), compile_report(&input()));
    }

    #[test]
    fn content_is_escaped_and_complete() {
        let i = input();
        assert_eq!(i.category, "PU0");
        assert_eq!(i.mean_total, "88.0");
        let html = compile_report(&i);
        assert!(html.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(!html.contains("<Jerry>"));
        assert!(html.contains("Good &quot;pace&quot;"));
        assert!(html.contains("<tr><th>1.1</th><td>8.5</td></tr>"));
        assert!(html.contains("<p class=\"total\">88.0</p>"));
        assert!(html.contains("<td>01-01</td>"));
        assert!(html.contains("【评委 zhang】:\nGood"));
    }

    #[test]
    fn corrections_appear_in_report() {
        let (group, mut store) = sample_group();
        store.set_field(&group.id, OverrideField::Organization, "No. 2 School");
        store.set_field(&group.id, OverrideField::Feedback, "Final");
        let i = ReportInput::assemble("", &group, &summarize(&group), &store.effective(&group));
        let html = compile_report(&i);
        assert!(html.contains("<td>No. 2 School</td>"));
        assert!(html.contains("<div class=\"feedback\">Final</div>"));
    }

    #[test]
    fn file_names_stay_in_the_directory() {
        assert_eq!(
            report_file_name(&CandidateId::from_code("A/B-01")),
            "report_A_B-01.html"
        );
        assert_eq!(
            report_file_name(&CandidateId::from_code("..\\x:1-02")),
            "report___x_1-02.html"
        );
        assert_eq!(
            report_file_name(&CandidateId::from_code("一组-03")),
            "report_一组-03.html"
        );

        let r = ScoreRecord {
            judge: "zhang".to_string(),
            group_number: "A/B".to_string(),
            group_index: "1".to_string(),
            ..Default::default()
        };
        let agg = aggregate(&[r]);
        let group = agg.groups().next().unwrap().clone();
        let store = OverrideStore::new();
        let i = ReportInput::assemble("", &group, &summarize(&group), &store.effective(&group));
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), &i).unwrap();
        assert_eq!(path, dir.path().join("report_A_B-01.html"));
        assert!(path.exists());
    }

    #[test]
    fn one_file_per_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), &input()).unwrap();
        assert_eq!(path, dir.path().join("report_01-01.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), compile_report(&input()));
    }
}
