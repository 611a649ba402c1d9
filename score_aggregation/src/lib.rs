/*!
Aggregation of score sheets submitted by several judges.

Each judge fills one [`ScoreRecord`] per candidate. This crate groups the
records of the same candidate under a [`CandidateId`], averages the scores
and lets a reviewer correct the names and the merged feedback before the
final documents are produced.

```
use score_aggregation::*;

let mut builder = builder::Builder::new();
builder.add_scores("judge1", "1", "1", &[("1_1", 8.0)], 85.0)?;
builder.add_scores("judge2", "1", "1", &[("1_1", 9.0)], 91.0)?;

let aggregation = builder.aggregate();
let group = aggregation.get(&CandidateId::from_code("01-01")).unwrap();
let summary = summarize(group);
assert_eq!(summary.mean_total_display, "88.0");
assert_eq!(summary.criterion_mean(Criterion::C1_1), 8.5);
# Ok::<(), AggregationErrors>(())
```

The long-form documentation is in the [`manual`] module.
*/
pub mod builder;
mod config;
mod identity;
pub mod manual;
mod overrides;

use log::{debug, info};

use std::collections::{BTreeMap, HashSet};

pub use crate::config::*;
pub use crate::identity::{identity_code, natural_cmp, IDENTITY_WIDTH};
pub use crate::overrides::*;

/// The records of a session, grouped by candidate.
///
/// Iterating over the groups follows the natural order of the identities.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Aggregation {
    groups: BTreeMap<CandidateId, CandidateGroup>,
}

impl Aggregation {
    pub fn get(&self, id: &CandidateId) -> Option<&CandidateGroup> {
        self.groups.get(id)
    }

    /// The groups, sorted by identity.
    pub fn groups(&self) -> impl Iterator<Item = &CandidateGroup> {
        self.groups.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CandidateId> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Groups the records by candidate.
///
/// The records keep their relative order inside each group. The names of a
/// group are the last non-empty names found in its records.
pub fn aggregate(records: &[ScoreRecord]) -> Aggregation {
    let mut groups: BTreeMap<CandidateId, CandidateGroup> = BTreeMap::new();
    for record in records.iter() {
        let id = CandidateId::from_record(record);
        match groups.get_mut(&id) {
            Some(group) => group.push(record),
            None => {
                debug!("aggregate: new candidate {}", id);
                groups.insert(id, CandidateGroup::from_first(record));
            }
        }
    }
    info!(
        "Aggregated {} records into {} candidates",
        records.len(),
        groups.len()
    );
    Aggregation { groups }
}

/// Computes the averaged result of one candidate.
pub fn summarize(group: &CandidateGroup) -> CandidateSummary {
    let records = group.records();
    // Never zero: a group is created with its first record.
    let n = records.len() as i128;

    let criterion_means: Vec<(Criterion, f64)> = Criterion::ALL
        .iter()
        .map(|c| {
            let sum = fixed_sum(records.iter().map(|r| r.score(*c)));
            (*c, mean_tenths(sum, n))
        })
        .collect();

    let total_sum = fixed_sum(records.iter().map(|r| r.total_score));
    let mean_total = total_sum as f64 / n as f64 / FIXED_SCALE as f64;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut stages: Vec<String> = Vec::new();
    for stage in records.iter().flat_map(|r| r.selected_stages.iter()) {
        if seen.insert(stage.as_str()) {
            stages.push(stage.clone());
        }
    }

    let judge_scores = records
        .iter()
        .map(|r| JudgeScore {
            judge: r.judge.clone(),
            total_score: r.total_score,
        })
        .collect();

    debug!(
        "summarize: {} records: {}, mean total: {}",
        group.id,
        records.len(),
        mean_total
    );
    CandidateSummary {
        id: group.id.clone(),
        criterion_means,
        mean_total,
        mean_total_display: format!("{:.1}", mean_tenths(total_sum, n)),
        stages,
        judge_scores,
    }
}

/// Statistics over the whole collection of records.
pub fn cohort_stats(records: &[ScoreRecord], aggregation: &Aggregation) -> CohortStats {
    let submissions = records.len();
    let (mean_total_display, max_total) = if submissions == 0 {
        ("0".to_string(), 0.0)
    } else {
        let sum = fixed_sum(records.iter().map(|r| r.total_score));
        let max = records
            .iter()
            .map(|r| r.total_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean = mean_tenths(sum, submissions as i128);
        (format!("{:.1}", mean), max)
    };
    CohortStats {
        submissions,
        candidates: aggregation.len(),
        mean_total_display,
        max_total,
    }
}

/// Scores are summed as integers, in millionths of a point, so that sums
/// do not depend on the order of the records.
const FIXED_SCALE: i128 = 1_000_000;

fn to_fixed(x: f64) -> i128 {
    (x * FIXED_SCALE as f64).round() as i128
}

fn fixed_sum<I: Iterator<Item = f64>>(values: I) -> i128 {
    values.map(to_fixed).sum()
}

/// Integer division with halves going away from zero. `den` is positive.
fn div_round_half_away(num: i128, den: i128) -> i128 {
    let q = num / den;
    let r = num % den;
    if 2 * r.abs() >= den {
        q + num.signum()
    } else {
        q
    }
}

/// `sum / n` in fixed point, rounded to one decimal.
fn mean_tenths(sum: i128, n: i128) -> f64 {
    let tenths = div_round_half_away(sum * 10, n * FIXED_SCALE);
    // No negative zero in the outputs.
    if tenths == 0 {
        0.0
    } else {
        tenths as f64 / 10.0
    }
}

/// Rounds to one decimal, with halves going away from zero.
pub fn round_one_decimal(x: f64) -> f64 {
    mean_tenths(to_fixed(x), 1)
}

/// Formats a number with exactly one decimal (`88.0`, `8.5`).
pub fn format_one_decimal(x: f64) -> String {
    format!("{:.1}", round_one_decimal(x))
}
