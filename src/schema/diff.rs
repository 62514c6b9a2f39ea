//! Structural difference between two schemas or type maps.

use std::collections::BTreeMap;

use serde::Serialize;

// =============================================================================
// Schema Diff
// =============================================================================

/// One changed field: same name, different token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedField {
    /// Field name
    pub name: String,
    /// Token on the expected side
    pub expected: String,
    /// Token on the actual side
    pub actual: String,
}

/// Structural difference between an expected and an actual token map.
///
/// Carried by `SchemaMismatched` and `Validation` errors; the `Display`
/// rendering is one line per divergence, suitable for diagnostics, and the
/// `Serialize` form feeds structured log sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    /// Fields present on the expected side only: `(name, expected token)`
    pub missing: Vec<(String, String)>,
    /// Fields present on the actual side only: `(name, actual token)`
    pub unexpected: Vec<(String, String)>,
    /// Fields present on both sides with different tokens
    pub changed: Vec<ChangedField>,
}

impl SchemaDiff {
    /// Compute the difference between two token maps.
    ///
    /// Order-insensitive; output is sorted by field name so renderings are
    /// deterministic.
    #[must_use]
    pub fn between(expected: &[(String, String)], actual: &[(String, String)]) -> Self {
        let expected: BTreeMap<&str, &str> = expected
            .iter()
            .map(|(n, t)| (n.as_str(), t.as_str()))
            .collect();
        let actual: BTreeMap<&str, &str> = actual
            .iter()
            .map(|(n, t)| (n.as_str(), t.as_str()))
            .collect();

        let mut diff = Self::default();
        for (name, token) in &expected {
            match actual.get(name) {
                None => diff.missing.push(((*name).to_string(), (*token).to_string())),
                Some(other) if other != token => diff.changed.push(ChangedField {
                    name: (*name).to_string(),
                    expected: (*token).to_string(),
                    actual: (*other).to_string(),
                }),
                Some(_) => {}
            }
        }
        for (name, token) in &actual {
            if !expected.contains_key(name) {
                diff.unexpected
                    .push(((*name).to_string(), (*token).to_string()));
            }
        }
        diff
    }

    /// Whether the two sides were structurally equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.changed.is_empty()
    }

    /// Record a missing field.
    pub fn push_missing(&mut self, name: impl Into<String>, expected: impl Into<String>) {
        self.missing.push((name.into(), expected.into()));
    }

    /// Record an unexpected field.
    pub fn push_unexpected(&mut self, name: impl Into<String>, actual: impl Into<String>) {
        self.unexpected.push((name.into(), actual.into()));
    }

    /// Record a changed field.
    pub fn push_changed(
        &mut self,
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) {
        self.changed.push(ChangedField {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        });
    }
}

impl std::fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut line = |f: &mut std::fmt::Formatter<'_>, text: String| {
            if first {
                first = false;
                write!(f, "{text}")
            } else {
                write!(f, "\n{text}")
            }
        };
        for (name, token) in &self.missing {
            line(f, format!("  missing field {name}: expected {token}"))?;
        }
        for (name, token) in &self.unexpected {
            line(f, format!("  unexpected field {name}: found {token}"))?;
        }
        for change in &self.changed {
            line(
                f,
                format!(
                    "  changed field {}: expected {}, found {}",
                    change.name, change.expected, change.actual
                ),
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
