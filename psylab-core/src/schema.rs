//! Configuration form descriptors.
//!
//! Hosts render these as experimenter forms: `basic` fields are always shown,
//! `advanced` ones sit behind a toggle. Bounds here are form hints; the
//! engines do their own validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Number,
    Boolean,
    Select,
    Keymap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    pub description: String,
}

impl FieldSchema {
    pub fn new(
        name: &str,
        kind: FieldKind,
        label: &str,
        default: impl Into<Value>,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            label: label.to_string(),
            default: default.into(),
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
            description: description.to_string(),
        }
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn option(mut self, value: &str, label: &str) -> Self {
        self.options.push(SelectOption {
            value: value.to_string(),
            label: label.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub basic: Vec<FieldSchema>,
    pub advanced: Vec<FieldSchema>,
}

impl ConfigSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.basic
            .iter()
            .chain(self.advanced.iter())
            .find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_spans_both_sections() {
        let schema = ConfigSchema {
            basic: vec![FieldSchema::new(
                "total_trials",
                FieldKind::Number,
                "Total Trials",
                40,
                "",
            )],
            advanced: vec![
                FieldSchema::new("ratio", FieldKind::Number, "Ratio", 0.5, "")
                    .range(0.0, 1.0)
                    .step(0.1),
            ],
        };
        assert_eq!(schema.field("ratio").and_then(|f| f.max), Some(1.0));
        assert!(schema.field("total_trials").is_some());
        assert!(schema.field("missing").is_none());
    }
}
