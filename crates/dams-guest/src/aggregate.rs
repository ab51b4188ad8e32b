//! Score aggregation
//!
//! Turns stored preference records into one update per (dam, criterion)
//! pair. Individual mode reads a single record; group mode averages every
//! member's record.

use crate::context::AppMode;
use dams_store_client::PreferenceRecord;
use serde::{Deserialize, Serialize};

/// Dam and criterion names bound by the host, in UI field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBindings {
    dam_names: Vec<String>,
    criterion_names: Vec<String>,
}

impl NameBindings {
    pub fn new(dam_names: Vec<String>, criterion_names: Vec<String>) -> Self {
        Self {
            dam_names,
            criterion_names,
        }
    }

    pub fn set_dam_names(&mut self, names: Vec<String>) {
        self.dam_names = names;
    }

    pub fn set_criterion_names(&mut self, names: Vec<String>) {
        self.criterion_names = names;
    }

    pub fn dam_names(&self) -> &[String] {
        &self.dam_names
    }

    pub fn criterion_names(&self) -> &[String] {
        &self.criterion_names
    }

    pub fn is_empty(&self) -> bool {
        self.dam_names.is_empty() || self.criterion_names.is_empty()
    }
}

/// A single aggregated value for one UI field.
///
/// Indices are 0-based positions in the bound name lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub dam_index: usize,
    pub criterion_index: usize,
    pub dam_name: String,
    pub criterion_name: String,
    pub value: f64,
}

impl ScoreUpdate {
    /// UI field key: criterion name followed by the 1-based dam index
    pub fn field_key(&self) -> String {
        format!("{}{}", self.criterion_name, self.dam_index + 1)
    }
}

/// Reduce records to per-field updates, dam-major then criterion-minor.
///
/// In group mode a field is averaged over the records that hold a value for
/// it; a field no record holds produces no update. No rounding is applied.
pub fn aggregate(records: &[PreferenceRecord], mode: AppMode, bindings: &NameBindings) -> Vec<ScoreUpdate> {
    let records = match mode {
        AppMode::Individual => {
            if records.len() > 1 {
                tracing::warn!(
                    count = records.len(),
                    "multiple individual records returned, using the first"
                );
            }
            &records[..records.len().min(1)]
        }
        AppMode::Group => records,
    };

    let mut updates = Vec::with_capacity(bindings.dam_names.len() * bindings.criterion_names.len());

    for (dam_index, dam_name) in bindings.dam_names.iter().enumerate() {
        for (criterion_index, criterion_name) in bindings.criterion_names.iter().enumerate() {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|r| r.scores.get(dam_name)?.get(criterion_index).copied())
                .collect();

            if values.is_empty() {
                tracing::debug!(dam = %dam_name, criterion = %criterion_name, "no stored value");
                continue;
            }

            updates.push(ScoreUpdate {
                dam_index,
                criterion_index,
                dam_name: dam_name.clone(),
                criterion_name: criterion_name.clone(),
                value: values.iter().sum::<f64>() / values.len() as f64,
            });
        }
    }

    updates
}
