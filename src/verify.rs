//! Post-transform checks run before a harmonised file is written.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::changes::DataTransforms;
use crate::error::{Result, ToolError};
use crate::model::{Dataset, MetadataTable, Scalar};

/// Outcome of comparing columns outside the declared change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnchangedCheck {
    /// Every unchanged column is identical; `checked` columns were compared.
    Identical { checked: usize },
    /// The first column whose values diverged.
    Mismatch { column: String },
}

impl UnchangedCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, UnchangedCheck::Identical { .. })
    }
}

/// Verifies that every column of `old` not named in `changed` is present in
/// `new` with identical values in the same order.
pub fn check_unchanged_columns(
    old: &Dataset,
    new: &Dataset,
    changed: &HashSet<String>,
) -> UnchangedCheck {
    let mut checked = 0usize;
    for column in old.columns.iter().filter(|c| !changed.contains(&c.name)) {
        let identical = new
            .column(&column.name)
            .is_some_and(|candidate| candidate.same_values(column));
        if !identical {
            warn!(column = %column.name, "unchanged column diverged");
            return UnchangedCheck::Mismatch {
                column: column.name.clone(),
            };
        }
        checked += 1;
    }
    debug!(checked, "all unchanged columns are identical");
    UnchangedCheck::Identical { checked }
}

/// Verifies that every recode conserved rows: for each harmonised value `v`,
/// the old rows whose value maps to `v` (through the map, or unmapped and
/// already equal to `v`) must equal the new rows holding `v`.
pub fn check_recoding(old: &Dataset, new: &Dataset, transforms: &DataTransforms) -> Result<()> {
    for group in &transforms.recodes {
        for variable in &group.variables {
            let new_name = transforms.renames.resolve(variable);
            let before = old.column(variable).ok_or_else(|| ToolError::MissingVariable {
                file: transforms.file.clone(),
                variable: variable.clone(),
            })?;
            let after = new.column(new_name).ok_or_else(|| ToolError::MissingVariable {
                file: transforms.file.clone(),
                variable: new_name.to_string(),
            })?;

            for target in group.map.targets() {
                let expected = before
                    .values
                    .iter()
                    .filter(|value| group.map.apply(value).matches(target))
                    .count();
                let actual = count_matching(&after.values, &[target]);
                if expected != actual {
                    return Err(ToolError::RecodeMismatch {
                        file: transforms.file.clone(),
                        column: new_name.to_string(),
                        value: target.to_string(),
                        expected,
                        actual,
                    });
                }
            }
            debug!(variable = %variable, "recode conserved rows");
        }
    }
    Ok(())
}

/// Verifies that dataset columns and metadata variables name the same set,
/// with exactly one metadata row per column.
pub fn check_metadata_consistency(
    dataset: &Dataset,
    metadata: &MetadataTable,
    file: &str,
) -> Result<()> {
    let mismatch = |detail: String| ToolError::MetadataMismatch {
        file: file.to_string(),
        detail,
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in &metadata.rows {
        *counts.entry(row.variable.as_str()).or_default() += 1;
    }
    if let Some((variable, _)) = counts.iter().find(|(_, count)| **count > 1) {
        return Err(mismatch(format!("variable '{variable}' has more than one metadata row")));
    }

    for name in dataset.column_names() {
        if !counts.contains_key(name) {
            return Err(mismatch(format!("column '{name}' has no metadata row")));
        }
    }

    let columns: HashSet<&str> = dataset.column_names().collect();
    if let Some(row) = metadata
        .rows
        .iter()
        .find(|row| !columns.contains(row.variable.as_str()))
    {
        return Err(mismatch(format!(
            "metadata variable '{}' has no data column",
            row.variable
        )));
    }

    Ok(())
}

/// Counts rows of `values` holding any of `candidates`.
pub fn count_matching(values: &[Scalar], candidates: &[&Scalar]) -> usize {
    values
        .iter()
        .filter(|value| candidates.iter().any(|candidate| candidate.matches(value)))
        .count()
}
