pub use crate::config::*;

use crate::{aggregate, Aggregation};

/// A builder for collecting score records.
///
/// ```
/// pub use score_aggregation::builder::Builder;
/// # use score_aggregation::AggregationErrors;
///
/// let mut builder = Builder::new();
/// builder.add_scores("judge1", "2", "9", &[("1_1", 8.0), ("3_2", 6.5)], 77.0)?;
/// builder.add_scores("judge1", "2", "10", &[("1_1", 7.0)], 70.0)?;
///
/// let ids: Vec<String> = builder.aggregate().ids().map(|id| id.to_string()).collect();
/// assert_eq!(ids, vec!["02-09", "02-10"]);
/// # Ok::<(), AggregationErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _records: Vec<ScoreRecord>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _records: Vec::new(),
        }
    }

    /// Adds a score sheet with only a position, criterion scores and a total.
    ///
    /// The criteria are given by their codes (`1_1`) or labels (`1.1`).
    pub fn add_scores(
        &mut self,
        judge: &str,
        group_number: &str,
        group_index: &str,
        scores: &[(&str, f64)],
        total_score: f64,
    ) -> Result<(), AggregationErrors> {
        let mut record = ScoreRecord {
            judge: judge.to_string(),
            group_number: group_number.to_string(),
            group_index: group_index.to_string(),
            total_score,
            ..Default::default()
        };
        for (code, value) in scores {
            let criterion = Criterion::from_code(code)
                .ok_or_else(|| AggregationErrors::UnknownCriterion(code.to_string()))?;
            record.scores.insert(criterion, *value);
        }
        self.add_record(&record)
    }

    /// Adds a complete record.
    pub fn add_record(&mut self, record: &ScoreRecord) -> Result<(), AggregationErrors> {
        self._records.push(record.clone());
        Ok(())
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self._records
    }

    pub fn aggregate(&self) -> Aggregation {
        aggregate(&self._records)
    }
}
