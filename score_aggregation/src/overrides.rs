//! Reviewer corrections applied on top of the aggregated records.
//!
//! The source records are never modified. A reviewer edits an [`Override`]
//! entry instead, and the documents read the effective values through
//! [`OverrideStore::effective`].

use log::{debug, info};

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::config::*;
use crate::Aggregation;

/// Label used in the feedback attribution when a record has no judge.
pub const UNKNOWN_JUDGE_LABEL: &str = "系统";

/// Separator between the feedback of two judges.
pub const FEEDBACK_SEPARATOR: &str = "\n\n---\n\n";

/// The fields a reviewer may correct.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum OverrideField {
    Name,
    EnName,
    Organization,
    Feedback,
}

impl OverrideField {
    pub const ALL: [OverrideField; 4] = [
        OverrideField::Name,
        OverrideField::EnName,
        OverrideField::Organization,
        OverrideField::Feedback,
    ];

    /// The key used in the overrides files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            OverrideField::Name => "name",
            OverrideField::EnName => "enName",
            OverrideField::Organization => "organization",
            OverrideField::Feedback => "feedback",
        }
    }

    pub fn from_key(key: &str) -> Option<OverrideField> {
        OverrideField::ALL.iter().find(|f| f.key() == key).copied()
    }
}

impl Display for OverrideField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The corrections for one candidate.
///
/// `None` means that the field has never been set: the derived value is used
/// and the field may still be initialized from the records.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Override {
    pub name: Option<String>,
    pub en_name: Option<String>,
    pub organization: Option<String>,
    pub feedback: Option<String>,
}

impl Override {
    pub fn get(&self, field: OverrideField) -> Option<&String> {
        match field {
            OverrideField::Name => self.name.as_ref(),
            OverrideField::EnName => self.en_name.as_ref(),
            OverrideField::Organization => self.organization.as_ref(),
            OverrideField::Feedback => self.feedback.as_ref(),
        }
    }

    fn slot(&mut self, field: OverrideField) -> &mut Option<String> {
        match field {
            OverrideField::Name => &mut self.name,
            OverrideField::EnName => &mut self.en_name,
            OverrideField::Organization => &mut self.organization,
            OverrideField::Feedback => &mut self.feedback,
        }
    }

    /// Sets the field only if it was never set. Returns true if it was filled.
    fn fill(&mut self, field: OverrideField, value: String) -> bool {
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(value);
            true
        } else {
            false
        }
    }
}

/// The values to display for a candidate, after applying the corrections.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EffectiveFields {
    pub name: String,
    pub en_name: String,
    pub organization: String,
    pub feedback: String,
}

/// All the corrections of a session, keyed by candidate.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct OverrideStore {
    entries: BTreeMap<CandidateId, Override>,
}

impl OverrideStore {
    pub fn new() -> OverrideStore {
        OverrideStore::default()
    }

    pub fn from_entries<I: IntoIterator<Item = (CandidateId, Override)>>(
        entries: I,
    ) -> OverrideStore {
        OverrideStore {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Override> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CandidateId, &Override)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pre-fills the fields that were never set, from the records. Empty
    /// values are not stored.
    ///
    /// The names and the organization come from the last record of each
    /// candidate, the feedback from [`compile_feedback`]. Fields that already
    /// hold a value are left alone, so calling this again after new records
    /// arrive does not undo the reviewer's work.
    ///
    /// Returns the number of fields that were filled.
    pub fn initialize_defaults(&mut self, aggregation: &Aggregation) -> usize {
        let mut filled = 0;
        for group in aggregation.groups() {
            let last = group.last_record();
            let entry = self.entries.entry(group.id.clone()).or_default();
            let defaults = [
                (OverrideField::Name, last.name.clone()),
                (OverrideField::EnName, last.en_name.clone()),
                (OverrideField::Organization, last.organization.clone()),
                (OverrideField::Feedback, compile_feedback(group)),
            ];
            for (field, value) in defaults {
                // An empty default leaves the field unset, so later records can still fill it.
                if !value.is_empty() && entry.fill(field, value) {
                    filled += 1;
                }
            }
        }
        info!("Initialized {} override fields", filled);
        filled
    }

    /// Records a reviewer edit. Only this field of this candidate changes.
    pub fn set_field(&mut self, id: &CandidateId, field: OverrideField, value: &str) {
        debug!("set_field: {} {} = {:?}", id, field, value);
        let entry = self.entries.entry(id.clone()).or_default();
        *entry.slot(field) = Some(value.to_string());
    }

    /// Removes an edit, going back to the derived value.
    pub fn clear_field(&mut self, id: &CandidateId, field: OverrideField) {
        if let Some(entry) = self.entries.get_mut(id) {
            *entry.slot(field) = None;
        }
    }

    /// The values to display for a candidate.
    ///
    /// A non-empty correction wins for the names and the organization. For the
    /// feedback, any correction wins, including an empty one.
    pub fn effective(&self, group: &CandidateGroup) -> EffectiveFields {
        let ovr = self.entries.get(&group.id);
        let pick = |field: OverrideField, default: String| -> String {
            match ovr.and_then(|o| o.get(field)) {
                Some(v) if !v.is_empty() => v.clone(),
                _ => default,
            }
        };
        EffectiveFields {
            name: pick(OverrideField::Name, group.name.clone()),
            en_name: pick(OverrideField::EnName, group.en_name.clone()),
            organization: pick(OverrideField::Organization, default_organization(group)),
            feedback: match ovr.and_then(|o| o.feedback.as_ref()) {
                Some(v) => v.clone(),
                None => compile_feedback(group),
            },
        }
    }
}

/// Merges the feedback of all the judges, in record order.
///
/// Each entry starts with a line naming the judge. Records without feedback
/// are skipped.
pub fn compile_feedback(group: &CandidateGroup) -> String {
    group
        .records()
        .iter()
        .filter_map(|r| match r.feedback.as_deref() {
            Some(text) if !text.is_empty() => {
                let judge = if r.judge.is_empty() {
                    UNKNOWN_JUDGE_LABEL
                } else {
                    r.judge.as_str()
                };
                Some(format!("【评委 {}】:\n{}", judge, text))
            }
            _ => None,
        })
        .collect::<Vec<String>>()
        .join(FEEDBACK_SEPARATOR)
}

/// The most recent non-empty organization of a candidate, or an empty string.
pub fn default_organization(group: &CandidateGroup) -> String {
    group
        .records()
        .iter()
        .rev()
        .map(|r| r.organization.as_str())
        .find(|o| !o.is_empty())
        .unwrap_or("")
        .to_string()
}
