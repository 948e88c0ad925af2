//! Exception classification against a closed whitelist.

use bus::{ExceptionKind, FaultRecord};

use crate::repair::RepairTransform;

/// Fallback model name written by the default argument-fault repair.
pub const DEFAULT_FALLBACK_MODEL: &str = "FooBar";

/// What to do with a faulted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationDecision {
    /// Apply the transform and republish.
    Repair(RepairTransform),

    /// Report the fault and stop.
    Escalate,
}

/// Maps exception kinds to repair transforms.
///
/// Classification is total: any kind without a whitelist entry escalates.
/// [`ExceptionKind::Other`] always escalates, even if an entry names it.
#[derive(Debug, Clone)]
pub struct ExceptionClassifier {
    whitelist: Vec<(ExceptionKind, RepairTransform)>,
}

impl ExceptionClassifier {
    /// Creates a classifier with no whitelist entries; it escalates everything.
    ///
    /// [`ExceptionClassifier::default`] is the standard whitelist instead.
    pub fn empty() -> Self {
        Self {
            whitelist: Vec::new(),
        }
    }

    /// The standard whitelist: argument faults reset `model` to `fallback`.
    pub fn with_model_fallback(fallback: impl Into<String>) -> Self {
        Self::empty().with_repair(
            ExceptionKind::Argument,
            RepairTransform::set_field("model", fallback),
        )
    }

    /// Adds a whitelist entry. Earlier entries win.
    pub fn with_repair(mut self, kind: ExceptionKind, transform: RepairTransform) -> Self {
        self.whitelist.push((kind, transform));
        self
    }

    /// Returns true if faults of `kind` would be repaired.
    pub fn is_repairable(&self, kind: &ExceptionKind) -> bool {
        self.lookup(kind).is_some()
    }

    /// Classifies a single fault record.
    pub fn classify(&self, record: &FaultRecord) -> CompensationDecision {
        match self.lookup(&record.kind()) {
            Some(transform) => CompensationDecision::Repair(transform.clone()),
            None => CompensationDecision::Escalate,
        }
    }

    fn lookup(&self, kind: &ExceptionKind) -> Option<&RepairTransform> {
        if matches!(kind, ExceptionKind::Other(_)) {
            return None;
        }
        self.whitelist
            .iter()
            .find(|(entry, _)| entry == kind)
            .map(|(_, transform)| transform)
    }
}

impl Default for ExceptionClassifier {
    fn default() -> Self {
        Self::with_model_fallback(DEFAULT_FALLBACK_MODEL)
    }
}
