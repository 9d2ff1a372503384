use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::changes::literal::ValueMap;
use crate::changes::{ChangeRow, ChangeTable};
use crate::error::{Result, ToolError};

/// Old → new variable names for one file, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameMapping {
    pairs: Vec<(String, String)>,
}

impl RenameMapping {
    /// New name declared for `old_name`.
    pub fn get(&self, old_name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(old, _)| old == old_name)
            .map(|(_, new)| new.as_str())
    }

    /// Old/new pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Number of renames.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when nothing is renamed.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Name of `column` after renaming.
    pub fn resolve<'a>(&'a self, column: &'a str) -> &'a str {
        self.get(column).unwrap_or(column)
    }
}

/// Variables sharing one recode expression together with its parsed map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecodeGroup {
    /// Expression text exactly as written in the change table.
    pub expression: String,
    /// Old variable names the map applies to.
    pub variables: Vec<String>,
    pub map: ValueMap,
}

/// Everything needed to harmonise one file's dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTransforms {
    pub file: String,
    pub renames: RenameMapping,
    pub recodes: Vec<RecodeGroup>,
}

impl DataTransforms {
    /// Old names of every recoded variable.
    pub fn recoded_variables(&self) -> impl Iterator<Item = &str> {
        self.recodes
            .iter()
            .flat_map(|group| group.variables.iter().map(String::as_str))
    }
}

/// Builds the rename mapping and recode groups declared for `file`.
pub fn derive_transforms(changes: &ChangeTable, file: &str) -> Result<DataTransforms> {
    let mut seen = HashSet::new();
    let mut targets = HashSet::new();
    let mut transforms = DataTransforms {
        file: file.to_string(),
        ..DataTransforms::default()
    };

    for row in changes.changed_for_file(file) {
        if !seen.insert(row.old_var_name.as_str()) {
            return Err(ToolError::DuplicateChange {
                file: file.to_string(),
                variable: row.old_var_name.clone(),
            });
        }

        if let Some(new_name) = &row.new_var_name {
            if !targets.insert(new_name.as_str()) {
                return Err(ToolError::RenameCollision {
                    file: file.to_string(),
                    target: new_name.clone(),
                });
            }
            transforms
                .renames
                .pairs
                .push((row.old_var_name.clone(), new_name.clone()));
        }

        if let Some(expression) = &row.recode {
            match transforms
                .recodes
                .iter_mut()
                .find(|group| &group.expression == expression)
            {
                Some(group) => group.variables.push(row.old_var_name.clone()),
                None => {
                    let map = parse_literal(row, "recode", expression)?;
                    transforms.recodes.push(RecodeGroup {
                        expression: expression.clone(),
                        variables: vec![row.old_var_name.clone()],
                        map,
                    });
                }
            }
        }
    }

    debug!(
        file,
        renames = transforms.renames.len(),
        recode_groups = transforms.recodes.len(),
        "derived data transforms"
    );
    Ok(transforms)
}

/// Parses the replacement value labels of a row, if it declares any.
pub fn parse_field_values(row: &ChangeRow) -> Result<Option<ValueMap>> {
    row.new_field_values
        .as_deref()
        .map(|text| parse_literal(row, "new_field_values", text))
        .transpose()
}

fn parse_literal(row: &ChangeRow, field: &str, text: &str) -> Result<ValueMap> {
    ValueMap::parse(text).map_err(|error| ToolError::Parse {
        file: row.file.clone(),
        row: row.row,
        detail: format!("{field} of '{}': {error}", row.old_var_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scalar;

    #[test]
    fn builds_renames_for_the_requested_file_only() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q1").rename_to("gender"),
            ChangeRow::new("other.sav", "Q1").rename_to("sex"),
            ChangeRow::new("survey.sav", "Q5").relabel("Age"),
        ]);

        let transforms = derive_transforms(&table, "survey.sav").expect("transforms");
        assert_eq!(transforms.renames.iter().collect::<Vec<_>>(), vec![("Q1", "gender")]);
        assert!(transforms.recodes.is_empty());
        assert_eq!(transforms.renames.resolve("Q5"), "Q5");
    }

    #[test]
    fn groups_recodes_sharing_an_expression() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q2").recode("{1: 0, 2: 1}"),
            ChangeRow::new("survey.sav", "Q3").recode("{9: None}"),
            ChangeRow::new("survey.sav", "Q4").recode("{1: 0, 2: 1}"),
        ]);

        let transforms = derive_transforms(&table, "survey.sav").expect("transforms");
        assert_eq!(transforms.recodes.len(), 2);
        assert_eq!(transforms.recodes[0].variables, vec!["Q2", "Q4"]);
        assert_eq!(
            transforms.recodes[0].map.get(&Scalar::Int(2)),
            Some(&Scalar::Int(1))
        );
        assert_eq!(transforms.recodes[1].variables, vec!["Q3"]);
    }

    #[test]
    fn malformed_recode_names_file_and_row() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q2").at_row(7).recode("{1: 0,"),
        ]);

        match derive_transforms(&table, "survey.sav") {
            Err(ToolError::Parse { file, row, detail }) => {
                assert_eq!(file, "survey.sav");
                assert_eq!(row, 7);
                assert!(detail.contains("Q2"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_two_names_mapping_to_one_target() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q1").rename_to("gender"),
            ChangeRow::new("survey.sav", "Q9").rename_to("gender"),
        ]);

        assert!(matches!(
            derive_transforms(&table, "survey.sav"),
            Err(ToolError::RenameCollision { target, .. }) if target == "gender"
        ));
    }

    #[test]
    fn rejects_duplicate_rows_for_one_variable() {
        let table = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q1").rename_to("gender"),
            ChangeRow::new("survey.sav", "Q1").relabel("Gender"),
        ]);

        assert!(matches!(
            derive_transforms(&table, "survey.sav"),
            Err(ToolError::DuplicateChange { variable, .. }) if variable == "Q1"
        ));
    }
}
