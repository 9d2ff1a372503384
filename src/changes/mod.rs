//! The change specification: one row per (file, variable) describing how a
//! variable is renamed, relabelled, or recoded.

pub mod literal;
pub mod transforms;

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use transforms::{DataTransforms, RecodeGroup, RenameMapping, derive_transforms};

/// A single row of the change specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    /// Source row number, used in diagnostics.
    pub row: usize,
    pub file: String,
    pub old_var_name: String,
    pub new_var_name: Option<String>,
    pub new_var_label: Option<String>,
    /// Replacement value labels as mapping-literal text.
    pub new_field_values: Option<String>,
    /// Recode expression as mapping-literal text.
    pub recode: Option<String>,
}

impl ChangeRow {
    /// Creates a row for `old_var_name` in `file` with no changes declared.
    pub fn new(file: impl Into<String>, old_var_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            old_var_name: old_var_name.into(),
            ..Self::default()
        }
    }

    /// Records the source row number.
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Declares a new variable name.
    pub fn rename_to(mut self, new_var_name: impl Into<String>) -> Self {
        self.new_var_name = Some(new_var_name.into());
        self
    }

    /// Declares a new variable label.
    pub fn relabel(mut self, new_var_label: impl Into<String>) -> Self {
        self.new_var_label = Some(new_var_label.into());
        self
    }

    /// Declares replacement value labels.
    pub fn field_values(mut self, new_field_values: impl Into<String>) -> Self {
        self.new_field_values = Some(new_field_values.into());
        self
    }

    /// Declares a recode expression.
    pub fn recode(mut self, recode: impl Into<String>) -> Self {
        self.recode = Some(recode.into());
        self
    }

    /// True when at least one change field is set.
    pub fn has_change(&self) -> bool {
        self.new_var_name.is_some()
            || self.new_var_label.is_some()
            || self.new_field_values.is_some()
            || self.recode.is_some()
    }
}

/// The loaded change specification. Immutable for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTable {
    rows: Vec<ChangeRow>,
}

impl ChangeTable {
    /// Wraps loaded rows.
    pub fn new(rows: Vec<ChangeRow>) -> Self {
        Self { rows }
    }

    /// All rows, including no-op ones.
    pub fn rows(&self) -> &[ChangeRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with at least one declared change; no-op rows are dropped.
    pub fn changed(&self) -> ChangeTable {
        ChangeTable::new(
            self.rows
                .iter()
                .filter(|row| row.has_change())
                .cloned()
                .collect(),
        )
    }

    /// Rows belonging to `file`, in table order.
    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ChangeRow> + 'a {
        self.rows.iter().filter(move |row| row.file == file)
    }

    /// Rows belonging to `file` that declare at least one change.
    pub fn changed_for_file<'a>(
        &'a self,
        file: &'a str,
    ) -> impl Iterator<Item = &'a ChangeRow> + 'a {
        self.for_file(file).filter(|row| row.has_change())
    }

    /// Distinct files referenced by the table, sorted.
    pub fn files(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|row| row.file.as_str()).collect()
    }

    /// Old variable names of `file` with any declared change. This is the
    /// exclusion set for the unchanged-column check.
    pub fn changed_variables(&self, file: &str) -> HashSet<String> {
        self.changed_for_file(file)
            .map(|row| row.old_var_name.clone())
            .collect()
    }

    /// Derives the transforms of every file so malformed rows surface before
    /// any file is touched.
    pub fn validate(&self) -> Result<()> {
        for file in self.files() {
            derive_transforms(self, file)?;
            for row in self.changed_for_file(file) {
                transforms::parse_field_values(row)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ChangeTable {
        ChangeTable::new(vec![
            ChangeRow::new("b.sav", "Q1").rename_to("gender"),
            ChangeRow::new("a.sav", "Q2").recode("{1: 0}"),
            ChangeRow::new("a.sav", "Q3"),
            ChangeRow::new("c.sav", "Q9"),
        ])
    }

    #[test]
    fn changed_drops_noop_rows() {
        let changed = table().changed();
        assert_eq!(changed.len(), 2);
        assert_eq!(changed.files().into_iter().collect::<Vec<_>>(), vec!["a.sav", "b.sav"]);
    }

    #[test]
    fn changed_variables_include_recode_only_rows() {
        let table = table();
        let changed = table.changed_variables("a.sav");
        assert!(changed.contains("Q2"));
        assert!(!changed.contains("Q3"));
    }

    #[test]
    fn validate_reports_bad_literals() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("a.sav", "Q1").field_values("{1: 'Yes'"),
        ]);
        assert!(table.validate().is_err());
    }
}
