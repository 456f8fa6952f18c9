// src/core/validation/verdict.rs

use indexmap::IndexMap;
use serde::Serialize;

/// A single failed check on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub property: String,
    pub message: String,
}

impl FieldFailure {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// The outcome of validating one argument instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationVerdict {
    #[default]
    Valid,
    /// Failures in the order the validator produced them.
    Invalid(Vec<FieldFailure>),
}

impl ValidationVerdict {
    /// `Valid` when `failures` is empty, `Invalid` otherwise.
    pub fn from_failures(failures: Vec<FieldFailure>) -> Self {
        if failures.is_empty() {
            ValidationVerdict::Valid
        } else {
            ValidationVerdict::Invalid(failures)
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ValidationVerdict::Valid => true,
            ValidationVerdict::Invalid(failures) => failures.is_empty(),
        }
    }

    pub fn into_failures(self) -> Vec<FieldFailure> {
        match self {
            ValidationVerdict::Valid => Vec::new(),
            ValidationVerdict::Invalid(failures) => failures,
        }
    }
}

/// Property name to messages, grouped across every argument of one invocation.
///
/// Properties keep the order in which they first failed; messages keep the
/// order in which they were produced. An empty map means validation passed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AggregatedValidationError(IndexMap<String, Vec<String>>);

impl AggregatedValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: FieldFailure) {
        self.0
            .entry(failure.property)
            .or_default()
            .push(failure.message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct properties that failed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, property: &str) -> Option<&[String]> {
        self.0.get(property).map(Vec::as_slice)
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of messages across all properties.
    pub fn message_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl Extend<FieldFailure> for AggregatedValidationError {
    fn extend<I: IntoIterator<Item = FieldFailure>>(&mut self, iter: I) {
        for failure in iter {
            self.push(failure);
        }
    }
}

impl FromIterator<FieldFailure> for AggregatedValidationError {
    fn from_iter<I: IntoIterator<Item = FieldFailure>>(iter: I) -> Self {
        let mut aggregated = Self::new();
        aggregated.extend(iter);
        aggregated
    }
}
