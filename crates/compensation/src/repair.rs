//! Repair transforms applied to faulted events.

use contracts::Repairable;

use crate::error::{CompensationError, Result};

/// A description of how to fix a faulted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairTransform {
    /// Overwrite a named text field with a fixed fallback value.
    SetField { field: String, fallback: String },
}

impl RepairTransform {
    /// Creates a transform that sets `field` to `fallback`.
    pub fn set_field(field: impl Into<String>, fallback: impl Into<String>) -> Self {
        RepairTransform::SetField {
            field: field.into(),
            fallback: fallback.into(),
        }
    }

    /// Applies the transform to `event` in place.
    ///
    /// Applying the same transform again leaves the event unchanged, so a
    /// redelivered fault produces the same repaired event.
    ///
    /// # Errors
    ///
    /// Returns `CompensationError::UnknownField` if the event has no such field.
    pub fn apply<E: Repairable + ?Sized>(&self, event: &mut E) -> Result<()> {
        match self {
            RepairTransform::SetField { field, fallback } => {
                let current = event.text_field(field).ok_or_else(|| {
                    CompensationError::UnknownField {
                        field: field.clone(),
                    }
                })?;
                if current == fallback.as_str() {
                    return Ok(());
                }
                if let Some(slot) = event.text_field_mut(field) {
                    slot.clone_from(fallback);
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for RepairTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairTransform::SetField { field, fallback } => {
                write!(f, "set {field} to {fallback:?}")
            }
        }
    }
}
