//! Trial → condition lookup.
//!
//! Built once from an already-parsed trial table (see
//! [`crate::io::read_trial_table`] for the CSV reader) and never mutated.
use std::collections::{BTreeMap, BTreeSet};

use crate::axis::TrialId;
use crate::error::{Result, TfError};

/// How [`TrialIndex::trials_for`] treats a condition label no trial carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Unmatched labels contribute no trials; each one is logged at `warn`.
    #[default]
    Permissive,
    /// Unmatched labels fail with [`TfError::UnknownCondition`].
    Strict,
}

/// One row of the trial table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRecord {
    pub condition: String,
    /// Remaining columns of the table, verbatim.
    pub covariates: BTreeMap<String, String>,
}

impl TrialRecord {
    pub fn new(condition: impl Into<String>) -> Self {
        Self { condition: condition.into(), covariates: BTreeMap::new() }
    }
}

/// Immutable trial id → [`TrialRecord`] map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialIndex {
    records: BTreeMap<TrialId, TrialRecord>,
}

impl TrialIndex {
    /// Build from `(trial, record)` rows.  Trial ids must be unique.
    pub fn from_records<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TrialId, TrialRecord)>,
    {
        let mut records = BTreeMap::new();
        for (id, rec) in rows {
            if records.insert(id, rec).is_some() {
                return Err(TfError::DuplicateTrial(id));
            }
        }
        Ok(Self { records })
    }

    /// Shorthand for tables with no covariates.
    pub fn from_conditions<I, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TrialId, S)>,
        S: Into<String>,
    {
        Self::from_records(rows.into_iter().map(|(id, c)| (id, TrialRecord::new(c))))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: TrialId) -> Option<&TrialRecord> {
        self.records.get(&id)
    }

    pub fn condition_of(&self, id: TrialId) -> Option<&str> {
        self.records.get(&id).map(|r| r.condition.as_str())
    }

    pub fn covariate(&self, id: TrialId, name: &str) -> Option<&str> {
        self.records.get(&id)?.covariates.get(name).map(String::as_str)
    }

    /// Distinct condition labels, sorted.
    pub fn conditions(&self) -> BTreeSet<&str> {
        self.records.values().map(|r| r.condition.as_str()).collect()
    }

    /// Trials whose condition is one of `conditions`.
    pub fn trials_for<S: AsRef<str>>(
        &self,
        conditions: &[S],
        strictness: Strictness,
    ) -> Result<BTreeSet<TrialId>> {
        let mut out = BTreeSet::new();
        for label in conditions {
            let label = label.as_ref();
            let mut matched = false;
            for (&id, rec) in &self.records {
                if rec.condition == label {
                    out.insert(id);
                    matched = true;
                }
            }
            if !matched {
                match strictness {
                    Strictness::Strict => return Err(TfError::UnknownCondition(label.to_string())),
                    Strictness::Permissive => {
                        log::warn!("condition {label:?} matches no trial; contributing none")
                    }
                }
            }
        }
        Ok(out)
    }
}
