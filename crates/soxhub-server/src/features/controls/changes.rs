//! Applying change sets to controls
//!
//! A [`ControlChanges`] value names the fields a caller wants to modify.
//! Applying it to a control produces the before and after values of the
//! fields that actually differ, which become the `previous_values` and
//! `new_values` of the history entry. Fields whose proposed value equals the
//! current value are dropped from the diff, so a change set that changes
//! nothing produces an empty diff and no history entry.

use serde_json::{json, Map, Value};
use soxhub_common::types::ControlChanges;

use super::models::ControlRecord;

/// The effective difference produced by applying a change set
#[derive(Debug, Clone, Default)]
pub struct AppliedChanges {
    /// Prior values of the fields that changed
    pub previous: Map<String, Value>,
    /// New values of the fields that changed
    pub new: Map<String, Value>,
}

impl AppliedChanges {
    /// True when no field actually changed
    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
    }

    /// Human-readable summary naming the changed fields
    ///
    /// Field names come out in alphabetical order, so the summary for a
    /// given diff is always the same string.
    pub fn summary(&self) -> String {
        let fields: Vec<&str> = self.new.keys().map(String::as_str).collect();
        format!("Updated {}", fields.join(", "))
    }

    fn record(&mut self, field: &str, previous: Value, new: Value) {
        self.previous.insert(field.to_string(), previous);
        self.new.insert(field.to_string(), new);
    }
}

/// Apply a change set to a control in place, returning the effective diff
pub fn apply_changes(control: &mut ControlRecord, changes: &ControlChanges) -> AppliedChanges {
    let mut applied = AppliedChanges::default();

    if let Some(name) = &changes.name {
        if *name != control.name {
            applied.record("name", json!(control.name), json!(name));
            control.name = name.clone();
        }
    }
    if let Some(description) = &changes.description {
        if *description != control.description {
            applied.record("description", json!(control.description), json!(description));
            control.description = description.clone();
        }
    }
    if let Some(owner_id) = changes.owner_id {
        if Some(owner_id) != control.owner_id {
            applied.record("owner_id", json!(control.owner_id), json!(owner_id));
            control.owner_id = Some(owner_id);
        }
    }
    if let Some(frequency) = changes.frequency {
        if frequency.as_str() != control.frequency {
            applied.record("frequency", json!(control.frequency), json!(frequency.as_str()));
            control.frequency = frequency.as_str().to_string();
        }
    }
    if let Some(control_type) = changes.control_type {
        if control_type.as_str() != control.control_type {
            applied.record(
                "control_type",
                json!(control.control_type),
                json!(control_type.as_str()),
            );
            control.control_type = control_type.as_str().to_string();
        }
    }
    if let Some(related_risks) = &changes.related_risks {
        if *related_risks != control.related_risks {
            applied.record(
                "related_risks",
                json!(control.related_risks),
                json!(related_risks),
            );
            control.related_risks = related_risks.clone();
        }
    }
    if let Some(test_procedures) = &changes.test_procedures {
        if *test_procedures != control.test_procedures {
            applied.record(
                "test_procedures",
                json!(control.test_procedures),
                json!(test_procedures),
            );
            control.test_procedures = test_procedures.clone();
        }
    }
    if let Some(evidence_requirements) = &changes.evidence_requirements {
        if *evidence_requirements != control.evidence_requirements {
            applied.record(
                "evidence_requirements",
                json!(control.evidence_requirements),
                json!(evidence_requirements),
            );
            control.evidence_requirements = evidence_requirements.clone();
        }
    }

    applied
}

/// Full field snapshot of a control, used as the `new_values` of a
/// creation entry
pub fn snapshot(control: &ControlRecord) -> Map<String, Value> {
    let mut values = Map::new();
    values.insert("code".to_string(), json!(control.code));
    values.insert("name".to_string(), json!(control.name));
    values.insert("description".to_string(), json!(control.description));
    values.insert("owner_id".to_string(), json!(control.owner_id));
    values.insert("frequency".to_string(), json!(control.frequency));
    values.insert("control_type".to_string(), json!(control.control_type));
    values.insert("status".to_string(), json!(control.status));
    values.insert("related_risks".to_string(), json!(control.related_risks));
    values.insert("test_procedures".to_string(), json!(control.test_procedures));
    values.insert(
        "evidence_requirements".to_string(),
        json!(control.evidence_requirements),
    );
    values
}
