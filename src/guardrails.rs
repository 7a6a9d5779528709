//! Ethical guardrails
//!
//! Inspects column names of uploaded student tables and removes protected
//! attributes and PII before any data reaches the scoring engine. Matching is
//! by substring on a normalized column name, so "Low_Income Flag" and
//! "low-income" are both caught by the "low income" term.
//!
//! These lists are the single source of truth for what the engine refuses to see.

use crate::error::ComputeError;
use crate::schema::RawTable;
use serde::{Deserialize, Serialize};

/// Protected-attribute terms (race/ethnicity, gender/sex, income/poverty, disability)
pub const PROTECTED_TERMS: &[&str] = &[
    // Race / ethnicity
    "race",
    "racial",
    "white",
    "black",
    "african",
    "hispanic",
    "latino",
    "asian",
    "native",
    "am. indian",
    "american indian",
    "alaska",
    "pacific islander",
    "two or more",
    "multi race",
    "multiracial",
    "mena",
    "middle eastern",
    "north african",
    // Gender / sex
    "gender",
    "sex",
    "male",
    "female",
    "non binary",
    // Socioeconomic
    "income",
    "low income",
    "poverty",
    "free lunch",
    "reduced lunch",
    "frl",
    // Disability / support status
    "iep",
    "504",
    "disability",
    "disabled",
    "special ed",
    "special education",
];

/// Personally identifying terms
pub const PII_TERMS: &[&str] = &[
    "name",
    "first name",
    "last name",
    "address",
    "street",
    "city",
    "state",
    "zip",
    "phone",
    "email",
    "ssn",
    "social security",
];

/// Columns every student table must carry
pub const REQUIRED_STUDENT_COLUMNS: &[&str] = &[
    "student_id",
    "week_date",
    "grades",
    "tardies",
    "absences",
    "discipline_events",
    "truancy_days",
];

const NOTE_PROTECTED: &str = "Protected attributes detected (must not be used).";
const NOTE_PII: &str = "Potential PII fields detected (must not be used).";
const NOTE_MISSING: &str = "Missing required student columns.";

/// Outcome of inspecting a student table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// True iff nothing was blocked and no required column is missing
    pub passed: bool,
    pub blocked_columns: Vec<String>,
    pub pii_columns: Vec<String>,
    pub missing_required: Vec<String>,
    pub notes: Vec<String>,
}

impl GuardrailResult {
    /// Protected and PII columns together, de-duplicated, protected first
    pub fn columns_to_drop(&self) -> Vec<String> {
        dedupe(
            self.blocked_columns
                .iter()
                .chain(self.pii_columns.iter())
                .cloned()
                .collect(),
        )
    }
}

/// Lowercase, trim, and collapse runs of whitespace, hyphens and underscores
/// into a single space
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.trim().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            if !in_separator {
                out.push(' ');
                in_separator = true;
            }
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }

    out
}

/// Return `(protected_columns, pii_columns)` detected by column name.
///
/// A column can appear in both lists. Each list keeps the table's column order.
pub fn find_blocked_columns(table: &RawTable) -> (Vec<String>, Vec<String>) {
    let mut protected = Vec::new();
    let mut pii = Vec::new();

    for column in table.columns() {
        let normalized = normalize_column_name(column);
        if PROTECTED_TERMS.iter().any(|t| normalized.contains(t)) {
            protected.push(column.clone());
        }
        if PII_TERMS.iter().any(|t| normalized.contains(t)) {
            pii.push(column.clone());
        }
    }

    (dedupe(protected), dedupe(pii))
}

/// Inspect a student table without modifying it
pub fn validate_student_data(table: &RawTable) -> GuardrailResult {
    let (blocked_columns, pii_columns) = find_blocked_columns(table);
    let missing_required = table.missing_columns(REQUIRED_STUDENT_COLUMNS);

    let mut notes = Vec::new();
    if !blocked_columns.is_empty() {
        notes.push(NOTE_PROTECTED.to_string());
    }
    if !pii_columns.is_empty() {
        notes.push(NOTE_PII.to_string());
    }
    if !missing_required.is_empty() {
        notes.push(NOTE_MISSING.to_string());
    }

    let passed = blocked_columns.is_empty() && pii_columns.is_empty() && missing_required.is_empty();

    GuardrailResult {
        passed,
        blocked_columns,
        pii_columns,
        missing_required,
        notes,
    }
}

/// Return a copy of the table with protected and PII columns removed, plus
/// the result describing what was found
pub fn remove_blocked_columns(table: &RawTable) -> (RawTable, GuardrailResult) {
    let result = validate_student_data(table);
    let to_drop = result.columns_to_drop();

    if to_drop.is_empty() {
        return (table.clone(), result);
    }

    tracing::warn!(columns = ?to_drop, "removing protected/PII columns from student data");
    (table.drop_columns(&to_drop), result)
}

/// Fail-closed gate in front of the engine.
///
/// Blocked columns are removed; a table that is still missing required columns
/// is rejected so that nothing downstream scores partial data.
pub fn enforce(table: &RawTable) -> Result<(RawTable, GuardrailResult), ComputeError> {
    let (cleaned, result) = remove_blocked_columns(table);

    if !result.missing_required.is_empty() {
        return Err(ComputeError::MissingColumns {
            table: "student".to_string(),
            columns: result.missing_required.clone(),
        });
    }

    Ok((cleaned, result))
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(columns: &[&str]) -> RawTable {
        let row: Vec<&str> = columns.iter().map(|_| "1").collect();
        RawTable::from_strs(columns, &[&row]).unwrap()
    }

    fn full_table_with(extra: &[&str]) -> RawTable {
        let mut columns: Vec<&str> = REQUIRED_STUDENT_COLUMNS.to_vec();
        columns.extend_from_slice(extra);
        table(&columns)
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Low_Income--Flag "), "low income flag");
        assert_eq!(normalize_column_name("First Name"), "first name");
        assert_eq!(normalize_column_name("w/ IEPs"), "w/ ieps");
    }

    #[test]
    fn test_gender_column_blocked() {
        let input = table(&["Gender", "grades"]);
        let (cleaned, result) = remove_blocked_columns(&input);

        assert_eq!(result.blocked_columns, vec!["Gender".to_string()]);
        assert!(result.pii_columns.is_empty());
        assert!(!result.passed);
        assert_eq!(cleaned.columns(), &["grades".to_string()]);
    }

    #[test]
    fn test_protected_terms_match_as_substrings() {
        let input = table(&["Am. Indian", "w/ IEPs", "Two or More", "low-income", "tardies"]);
        let (blocked, pii) = find_blocked_columns(&input);

        assert_eq!(
            blocked,
            vec![
                "Am. Indian".to_string(),
                "w/ IEPs".to_string(),
                "Two or More".to_string(),
                "low-income".to_string(),
            ]
        );
        assert!(pii.is_empty());
    }

    #[test]
    fn test_pii_columns_detected() {
        let input = table(&["student_email", "Home Address", "absences"]);
        let (blocked, pii) = find_blocked_columns(&input);

        assert!(blocked.is_empty());
        assert_eq!(
            pii,
            vec!["student_email".to_string(), "Home Address".to_string()]
        );
    }

    #[test]
    fn test_duplicate_column_names_reported_once() {
        let input = table(&["gender", "gender", "grades"]);
        let (blocked, _) = find_blocked_columns(&input);
        assert_eq!(blocked, vec!["gender".to_string()]);
    }

    #[test]
    fn test_clean_table_passes() {
        let result = validate_student_data(&full_table_with(&[]));
        assert!(result.passed);
        assert!(result.notes.is_empty());
    }

    #[test]
    fn test_missing_required_fails() {
        let input = table(&["student_id", "week_date", "grades"]);
        let result = validate_student_data(&input);

        assert!(!result.passed);
        assert_eq!(
            result.missing_required,
            vec![
                "tardies".to_string(),
                "absences".to_string(),
                "discipline_events".to_string(),
                "truancy_days".to_string(),
            ]
        );
        assert_eq!(result.notes, vec![NOTE_MISSING.to_string()]);
    }

    #[test]
    fn test_enforce_removes_blocked_and_accepts() {
        let input = full_table_with(&["Race", "Last Name"]);
        let (cleaned, result) = enforce(&input).unwrap();

        assert!(!result.passed);
        assert_eq!(result.notes.len(), 2);
        assert!(!cleaned.has_column("Race"));
        assert!(!cleaned.has_column("Last Name"));
        assert_eq!(cleaned.columns().len(), REQUIRED_STUDENT_COLUMNS.len());
    }

    #[test]
    fn test_enforce_rejects_missing_required() {
        let input = table(&["student_id", "grades", "gender"]);
        let err = enforce(&input).unwrap_err();

        match err {
            ComputeError::MissingColumns { columns, .. } => {
                assert!(columns.contains(&"week_date".to_string()));
                assert!(columns.contains(&"truancy_days".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
