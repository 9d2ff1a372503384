use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::{Result, ToolError};
use crate::io::{DATA_SHEET, METADATA_SHEET};
use crate::model::{
    Dataset, FIELD_VALUES_COLUMN, LABEL_COLUMN, MetadataTable, Scalar, VARIABLE_COLUMN,
    VariableMetadata,
};

/// Largest integer magnitude a workbook number cell stores exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Writes a dataset and its metadata as a two-sheet survey workbook.
pub fn write_survey(path: &Path, dataset: &Dataset, metadata: &MetadataTable) -> Result<()> {
    let mut workbook = Workbook::new();

    let data_sheet = workbook.add_worksheet();
    data_sheet.set_name(DATA_SHEET)?;
    for (col_idx, column) in dataset.columns.iter().enumerate() {
        data_sheet.write_string(0, col_idx as u16, &column.name)?;
        for (row_idx, value) in column.values.iter().enumerate() {
            write_scalar(data_sheet, (row_idx + 1) as u32, col_idx as u16, &column.name, value)?;
        }
    }

    let metadata_sheet = workbook.add_worksheet();
    metadata_sheet.set_name(METADATA_SHEET)?;
    for (col_idx, header) in metadata.columns.iter().enumerate() {
        metadata_sheet.write_string(0, col_idx as u16, header)?;
    }
    for (row_idx, entry) in metadata.rows.iter().enumerate() {
        for (col_idx, header) in metadata.columns.iter().enumerate() {
            if let Some(cell) = metadata_cell(entry, header) {
                metadata_sheet.write_string((row_idx + 1) as u32, col_idx as u16, &cell)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn write_scalar(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    column: &str,
    value: &Scalar,
) -> Result<()> {
    match value {
        Scalar::Null => {}
        Scalar::Bool(value) => {
            sheet.write_boolean(row, col, *value)?;
        }
        Scalar::Int(value) => {
            if value.unsigned_abs() > MAX_EXACT_INT {
                return Err(ToolError::InvalidWorkbook(format!(
                    "integer {value} in column '{column}' record {row} cannot be stored exactly"
                )));
            }
            sheet.write_number(row, col, *value as f64)?;
        }
        Scalar::Float(value) => {
            sheet.write_number(row, col, *value)?;
        }
        Scalar::Text(value) => {
            sheet.write_string(row, col, value)?;
        }
    }
    Ok(())
}

fn metadata_cell(entry: &VariableMetadata, header: &str) -> Option<String> {
    match header {
        VARIABLE_COLUMN => Some(entry.variable.clone()),
        LABEL_COLUMN => entry.label.clone(),
        FIELD_VALUES_COLUMN => entry.field_values.as_ref().map(ToString::to_string),
        other => entry.attributes.get(other).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    #[test]
    fn integers_beyond_exact_range_are_rejected() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("survey.xlsx");
        let dataset = Dataset::new(vec![Column::new(
            "id",
            vec![Scalar::Int(1), Scalar::Int(i64::MAX)],
        )]);
        let metadata = MetadataTable::new(vec![VariableMetadata::new("id")]);

        match write_survey(&path, &dataset, &metadata) {
            Err(ToolError::InvalidWorkbook(detail)) => {
                assert!(detail.contains("'id'"));
                assert!(detail.contains(&i64::MAX.to_string()));
            }
            other => panic!("expected invalid workbook error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn integers_at_the_exact_limit_are_written() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("survey.xlsx");
        let limit = 1_i64 << 53;
        let dataset = Dataset::new(vec![Column::new(
            "id",
            vec![Scalar::Int(limit), Scalar::Int(-limit)],
        )]);
        let metadata = MetadataTable::new(vec![VariableMetadata::new("id")]);

        write_survey(&path, &dataset, &metadata).expect("write succeeds");
        assert!(path.exists());
    }
}
