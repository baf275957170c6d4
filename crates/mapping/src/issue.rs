use serde::{Deserialize, Serialize};

/// A validation finding classified by whether the system can repair it.
///
/// The UI renders these without inspecting message text: `Fixable` issues
/// carry a concrete [`FixAction`] the "apply fixes" flow can execute,
/// `Unfixable` ones need a human (re-export the file, edit the mapping).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    Fixable {
        message: String,
        suggestion: String,
        action: FixAction,
    },
    Unfixable {
        message: String,
        suggestion: String,
    },
}

impl Issue {
    pub fn fixable(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        action: FixAction,
    ) -> Self {
        Issue::Fixable {
            message: message.into(),
            suggestion: suggestion.into(),
            action,
        }
    }

    pub fn unfixable(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Issue::Unfixable {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn is_fixable(&self) -> bool {
        matches!(self, Issue::Fixable { .. })
    }
}

/// Mechanical repairs the configuration UI can apply to a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixAction {
    /// Append columns the mappings reference to `expected_columns`.
    AddExpectedColumns { columns: Vec<String> },
    /// Drop the optional mapping that duplicates another binding.
    RemoveDuplicateMapping { column: String },
    /// Pin the detected encoding in the decoder metadata.
    PinEncoding { encoding: String },
}
