use std::collections::HashMap;

use tracing::debug;

use crate::changes::transforms::parse_field_values;
use crate::changes::{ChangeRow, ChangeTable};
use crate::error::{Result, ToolError};
use crate::model::MetadataTable;

/// Applies name, label, and value-label changes declared for `file` to its
/// metadata table.
///
/// Each metadata row is matched against the change row with the same old
/// variable name. Every field takes the declared replacement when one is set
/// and keeps the original otherwise. Unmatched rows pass through untouched,
/// and the table keeps its column and row order.
pub fn harmonise_metadata(
    metadata: &MetadataTable,
    changes: &ChangeTable,
    file: &str,
) -> Result<MetadataTable> {
    let lookup: HashMap<&str, &ChangeRow> = changes
        .changed_for_file(file)
        .map(|row| (row.old_var_name.as_str(), row))
        .collect();

    for old_name in lookup.keys() {
        if metadata.get(old_name).is_none() {
            return Err(ToolError::MissingVariable {
                file: file.to_string(),
                variable: old_name.to_string(),
            });
        }
    }

    let mut harmonised = metadata.clone();
    for entry in harmonised.rows.iter_mut() {
        let Some(change) = lookup.get(entry.variable.as_str()) else {
            continue;
        };

        if let Some(new_name) = &change.new_var_name {
            entry.variable = new_name.clone();
        }
        if let Some(new_label) = &change.new_var_label {
            entry.label = Some(new_label.clone());
        }
        if let Some(field_values) = parse_field_values(change)? {
            entry.field_values = Some(field_values);
        }
        debug!(from = %change.old_var_name, to = %entry.variable, "harmonised metadata row");
    }

    Ok(harmonised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::literal::ValueMap;
    use crate::model::VariableMetadata;

    fn metadata() -> MetadataTable {
        MetadataTable::new(vec![
            VariableMetadata::new("id").with_label("Respondent"),
            VariableMetadata::new("Q1")
                .with_label("Sex of respondent")
                .with_field_values(ValueMap::parse("{1: 'M', 2: 'F'}").expect("literal")),
            VariableMetadata::new("Q2").with_label("Satisfied?"),
        ])
    }

    #[test]
    fn coalesces_declared_fields_over_originals() {
        let changes = ChangeTable::new(vec![
            ChangeRow::new("survey.sav", "Q1").rename_to("gender"),
            ChangeRow::new("survey.sav", "Q2")
                .relabel("Satisfaction")
                .field_values("{0: 'No', 1: 'Yes'}"),
        ]);

        let output = harmonise_metadata(&metadata(), &changes, "survey.sav").expect("metadata");
        let original = metadata();

        assert_eq!(output.columns, original.columns);
        assert_eq!(output.rows[0], original.rows[0]);

        assert_eq!(output.rows[1].variable, "gender");
        assert_eq!(output.rows[1].label, original.rows[1].label);
        assert_eq!(output.rows[1].field_values, original.rows[1].field_values);

        assert_eq!(output.rows[2].variable, "Q2");
        assert_eq!(output.rows[2].label.as_deref(), Some("Satisfaction"));
        assert_eq!(
            output.rows[2].field_values.as_ref().map(ToString::to_string),
            Some("{0: 'No', 1: 'Yes'}".to_string())
        );
    }

    #[test]
    fn ignores_changes_for_other_files() {
        let changes = ChangeTable::new(vec![ChangeRow::new("other.sav", "Q1").rename_to("sex")]);
        let output = harmonise_metadata(&metadata(), &changes, "survey.sav").expect("metadata");
        assert_eq!(output, metadata());
    }

    #[test]
    fn missing_metadata_row_is_a_schema_mismatch() {
        let changes = ChangeTable::new(vec![ChangeRow::new("survey.sav", "Q7").relabel("x")]);
        let result = harmonise_metadata(&metadata(), &changes, "survey.sav");
        assert!(
            matches!(result, Err(ToolError::MissingVariable { variable, .. }) if variable == "Q7")
        );
    }
}
