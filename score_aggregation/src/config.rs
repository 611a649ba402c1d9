// ********* Input data structures ***********

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use crate::identity::natural_cmp;

/// The label used for a candidate whose name was never supplied by any judge.
pub const UNNAMED_PLACEHOLDER: &str = "未命名";

/// One scored dimension of a score sheet.
///
/// The set of criteria is fixed. The codes follow the numbering of the
/// printed score sheet (section, item).
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Criterion {
    C1_1,
    C1_2,
    C2_1,
    C2_2,
    C2_3,
    C3_1,
    C3_2,
}

impl Criterion {
    /// All the criteria, in display order.
    pub const ALL: [Criterion; 7] = [
        Criterion::C1_1,
        Criterion::C1_2,
        Criterion::C2_1,
        Criterion::C2_2,
        Criterion::C2_3,
        Criterion::C3_1,
        Criterion::C3_2,
    ];

    /// The code used in the input files (`1_1`, `2_3`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Criterion::C1_1 => "1_1",
            Criterion::C1_2 => "1_2",
            Criterion::C2_1 => "2_1",
            Criterion::C2_2 => "2_2",
            Criterion::C2_3 => "2_3",
            Criterion::C3_1 => "3_1",
            Criterion::C3_2 => "3_2",
        }
    }

    /// The label used in the printed documents (`1.1`, `2.3`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::C1_1 => "1.1",
            Criterion::C1_2 => "1.2",
            Criterion::C2_1 => "2.1",
            Criterion::C2_2 => "2.2",
            Criterion::C2_3 => "2.3",
            Criterion::C3_1 => "3.1",
            Criterion::C3_2 => "3.2",
        }
    }

    pub fn from_code(code: &str) -> Option<Criterion> {
        let code = code.trim();
        Criterion::ALL
            .iter()
            .find(|c| c.code() == code || c.label() == code)
            .copied()
    }
}

impl Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A complete score sheet submitted by one judge for one candidate.
///
/// Records are never modified once read. All the descriptive fields are free
/// text and may disagree between judges scoring the same candidate.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScoreRecord {
    pub judge: String,
    pub group_number: String,
    pub group_index: String,
    pub name: String,
    pub en_name: String,
    pub organization: String,
    pub category: String,
    pub selected_stages: Vec<String>,
    pub scores: BTreeMap<Criterion, f64>,
    /// Supplied by the judge. It is not recomputed from `scores`.
    pub total_score: f64,
    pub feedback: Option<String>,
}

impl ScoreRecord {
    /// The score for a criterion. Missing criteria count as zero.
    pub fn score(&self, criterion: Criterion) -> f64 {
        self.scores.get(&criterion).copied().unwrap_or(0.0)
    }
}

/// The identity of a candidate, shared by all the records that score them.
///
/// The ordering is numeric-aware: `2-9` comes before `2-10`.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct CandidateId(pub(crate) String);

impl CandidateId {
    pub fn from_record(record: &ScoreRecord) -> CandidateId {
        CandidateId(crate::identity::identity_code(
            &record.group_number,
            &record.group_index,
        ))
    }

    /// Wraps an already computed identity code, for example when reading
    /// persisted overrides.
    pub fn from_code(code: &str) -> CandidateId {
        CandidateId(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Ord for CandidateId {
    fn cmp(&self, other: &Self) -> Ordering {
        // The byte order breaks the ties of the natural order ("2-5" vs "02-05")
        // so that the ordering stays consistent with equality.
        natural_cmp(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for CandidateId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// All the records for one candidate, in the order they were read.
// Invariant: there is at least one record.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateGroup {
    pub id: CandidateId,
    /// Last non-empty name, or the placeholder.
    pub name: String,
    /// Last non-empty English name.
    pub en_name: String,
    records: Vec<ScoreRecord>,
}

impl CandidateGroup {
    /// Starts a group from the first record seen for this identity.
    pub fn from_first(record: &ScoreRecord) -> CandidateGroup {
        let name = if record.name.is_empty() {
            UNNAMED_PLACEHOLDER.to_string()
        } else {
            record.name.clone()
        };
        CandidateGroup {
            id: CandidateId::from_record(record),
            name,
            en_name: record.en_name.clone(),
            records: vec![record.clone()],
        }
    }

    /// Folds one more record into the group. Non-empty names replace the current ones.
    pub(crate) fn push(&mut self, record: &ScoreRecord) {
        if !record.name.is_empty() {
            self.name = record.name.clone();
        }
        if !record.en_name.is_empty() {
            self.en_name = record.en_name.clone();
        }
        self.records.push(record.clone());
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn first_record(&self) -> &ScoreRecord {
        &self.records[0]
    }

    pub fn last_record(&self) -> &ScoreRecord {
        &self.records[self.records.len() - 1]
    }
}

// ******** Output data structures *********

/// The total given by one judge, as listed next to each candidate.
#[derive(PartialEq, Debug, Clone)]
pub struct JudgeScore {
    pub judge: String,
    pub total_score: f64,
}

/// The averaged result for one candidate.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateSummary {
    pub id: CandidateId,
    /// Mean per criterion, rounded to one decimal, in `Criterion::ALL` order.
    pub criterion_means: Vec<(Criterion, f64)>,
    pub mean_total: f64,
    /// The mean total with one decimal (`88.0`).
    pub mean_total_display: String,
    /// Union of the stages, in the order they were first seen.
    pub stages: Vec<String>,
    pub judge_scores: Vec<JudgeScore>,
}

impl CandidateSummary {
    pub fn criterion_mean(&self, criterion: Criterion) -> f64 {
        self.criterion_means
            .iter()
            .find(|(c, _)| *c == criterion)
            .map(|(_, m)| *m)
            .unwrap_or(0.0)
    }
}

/// Statistics over all the records of a session.
#[derive(PartialEq, Debug, Clone)]
pub struct CohortStats {
    pub submissions: usize,
    pub candidates: usize,
    /// Mean of every record's total (not one value per candidate), or `0`.
    pub mean_total_display: String,
    pub max_total: f64,
}

/// Errors when building records through the builder API.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationErrors {
    UnknownCriterion(String),
}

impl Error for AggregationErrors {}

impl Display for AggregationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationErrors::UnknownCriterion(code) => {
                write!(f, "AggregationError: unknown criterion {:?}", code)
            }
        }
    }
}
