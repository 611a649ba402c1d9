// Primitives shared by the tabular readers (CSV and Excel) and the export.

use std::path::Path;

use log::{debug, warn};
use score_aggregation::Criterion;

use crate::tally::ParsedRecord;

pub const JUDGE_COLUMN: &str = "judgeUsername";
pub const GROUP_COLUMN: &str = "group";
pub const GROUP_INDEX_COLUMN: &str = "groupIndex";
pub const NAME_COLUMN: &str = "name";
pub const EN_NAME_COLUMN: &str = "enName";
pub const ORGANIZATION_COLUMN: &str = "organization";
pub const CATEGORY_COLUMN: &str = "category";
pub const STAGES_COLUMN: &str = "selectedStages";
pub const TOTAL_COLUMN: &str = "totalScore";
pub const FEEDBACK_COLUMN: &str = "feedback";

/// Separator used when writing the stages in a single cell.
pub const STAGES_SEPARATOR: &str = "、";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

pub fn split_stages(cell: &str) -> Vec<String> {
    cell.split(|c| c == ';' || c == '、')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Where each field sits in a row, found from the header row.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnMap {
    judge: Option<usize>,
    group: Option<usize>,
    group_index: Option<usize>,
    name: Option<usize>,
    en_name: Option<usize>,
    organization: Option<usize>,
    category: Option<usize>,
    stages: Option<usize>,
    total: Option<usize>,
    feedback: Option<usize>,
    criteria: Vec<(usize, String)>,
}

impl ColumnMap {
    pub fn from_header(header: &[String]) -> ColumnMap {
        let mut cm = ColumnMap::default();
        for (idx, h) in header.iter().enumerate() {
            // Spreadsheet tools may keep the byte order mark in the first cell.
            let h = h.trim_start_matches('\u{feff}').trim();
            match h {
                JUDGE_COLUMN | "judge" => cm.judge = Some(idx),
                GROUP_COLUMN | "groupNumber" => cm.group = Some(idx),
                GROUP_INDEX_COLUMN => cm.group_index = Some(idx),
                NAME_COLUMN => cm.name = Some(idx),
                EN_NAME_COLUMN => cm.en_name = Some(idx),
                ORGANIZATION_COLUMN => cm.organization = Some(idx),
                CATEGORY_COLUMN => cm.category = Some(idx),
                STAGES_COLUMN => cm.stages = Some(idx),
                TOTAL_COLUMN => cm.total = Some(idx),
                FEEDBACK_COLUMN => cm.feedback = Some(idx),
                c if Criterion::from_code(c).is_some() => cm.criteria.push((idx, c.to_string())),
                "" => {}
                c => {
                    warn!("ColumnMap: ignoring unknown column {:?}", c);
                }
            }
        }
        debug!("ColumnMap: {:?}", cm);
        cm
    }

    pub fn parse_row(&self, id: String, row: &[String]) -> ParsedRecord {
        let cell = |idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
        };
        ParsedRecord {
            id,
            judge: cell(self.judge),
            group_number: cell(self.group),
            group_index: cell(self.group_index),
            name: cell(self.name),
            en_name: cell(self.en_name),
            organization: cell(self.organization),
            category: cell(self.category),
            stages: split_stages(&cell(self.stages)),
            scores: self
                .criteria
                .iter()
                .map(|(idx, code)| (code.clone(), cell(Some(*idx))))
                .collect(),
            total_score: cell(self.total),
            feedback: cell(self.feedback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_driven_rows() {
        let header = strings(&[
            "\u{feff}judgeUsername",
            "timestamp",
            "group",
            "groupIndex",
            "1_1",
            "3.2",
            "totalScore",
            "selectedStages",
        ]);
        let cm = ColumnMap::from_header(&header);
        let pr = cm.parse_row(
            "f-00000001".to_string(),
            &strings(&["li", "9:00", "3", "5", "8", "6", "77", "导入、 练习;总结"]),
        );
        assert_eq!(pr.judge, "li");
        assert_eq!(pr.group_number, "3");
        assert_eq!(pr.group_index, "5");
        assert_eq!(
            pr.scores,
            vec![
                ("1_1".to_string(), "8".to_string()),
                ("3.2".to_string(), "6".to_string())
            ]
        );
        assert_eq!(pr.total_score, "77");
        assert_eq!(pr.stages, vec!["导入", "练习", "总结"]);
        assert_eq!(pr.name, "");
    }

    #[test]
    fn short_rows_give_empty_cells() {
        let cm = ColumnMap::from_header(&strings(&["judgeUsername", "name", "feedback"]));
        let pr = cm.parse_row("x".to_string(), &strings(&["li"]));
        assert_eq!(pr.judge, "li");
        assert_eq!(pr.name, "");
        assert_eq!(pr.feedback, "");
    }

    #[test]
    fn default_ids() {
        let f = make_default_id("/tmp/data/sheets.csv");
        assert_eq!(f(3), "sheets.csv-00000003");
    }
}
