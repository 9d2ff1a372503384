use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{debug, instrument};

use crate::changes::literal::ValueMap;
use crate::changes::{ChangeRow, ChangeTable};
use crate::error::{Result, ToolError};
use crate::io::{DATA_SHEET, METADATA_SHEET};
use crate::model::{
    Column, Dataset, FIELD_VALUES_COLUMN, LABEL_COLUMN, MetadataTable, Scalar, VARIABLE_COLUMN,
    VariableMetadata,
};

/// Headers recognised in the change specification sheet.
pub const FILE_HEADER: &str = "file";
pub const OLD_VAR_NAME_HEADER: &str = "old_var_name";
pub const NEW_VAR_NAME_HEADER: &str = "new_var_name";
pub const NEW_VAR_LABEL_HEADER: &str = "new_var_label";
pub const NEW_FIELD_VALUES_HEADER: &str = "new_field_values";
pub const RECODE_HEADER: &str = "recode";

/// Loads the change specification from `sheet` (or the first sheet) of the
/// workbook at `path`, then validates every file's transforms.
#[instrument(level = "info", skip_all, fields(path = %path.display(), sheet = ?sheet))]
pub fn read_change_table(path: &Path, sheet: Option<&str>) -> Result<ChangeTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = match sheet {
        Some(name) => read_required_sheet(&mut workbook, name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ToolError::InvalidWorkbook("workbook has no sheets".into()))??,
    };

    let headers = HeaderIndex::from_range(&range);
    let file_col = headers.require(FILE_HEADER)?;
    let old_col = headers.require(OLD_VAR_NAME_HEADER)?;
    let new_name_col = headers.find(NEW_VAR_NAME_HEADER);
    let new_label_col = headers.find(NEW_VAR_LABEL_HEADER);
    let field_values_col = headers.find(NEW_FIELD_VALUES_HEADER);
    let recode_col = headers.find(RECODE_HEADER);

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 1;
    let mut rows = Vec::new();
    for (index, cells) in range.rows().enumerate().skip(1) {
        let optional = |col: Option<usize>| col.and_then(|col| optional_cell(cells.get(col)));
        let file = cell_to_string(cells.get(file_col));
        let old_var_name = cell_to_string(cells.get(old_col));
        if file.trim().is_empty() && old_var_name.trim().is_empty() {
            continue;
        }
        if file.trim().is_empty() || old_var_name.trim().is_empty() {
            return Err(ToolError::InvalidWorkbook(format!(
                "row {} must name both a file and a variable",
                first_row + index
            )));
        }

        rows.push(ChangeRow {
            row: first_row + index,
            file: file.trim().to_string(),
            old_var_name: old_var_name.trim().to_string(),
            new_var_name: optional(new_name_col),
            new_var_label: optional(new_label_col),
            new_field_values: optional(field_values_col),
            recode: optional(recode_col),
        });
    }

    let table = ChangeTable::new(rows);
    table.validate()?;
    debug!(rows = table.len(), files = table.files().len(), "loaded change table");
    Ok(table)
}

/// Reads the `Data` and `Metadata` sheets of a survey workbook.
pub fn read_survey(path: &Path) -> Result<(Dataset, MetadataTable)> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let data_range = read_required_sheet(&mut workbook, DATA_SHEET)?;
    let metadata_range = read_required_sheet(&mut workbook, METADATA_SHEET)?;

    let dataset = parse_dataset(&data_range)?;
    let metadata = parse_metadata(&metadata_range, &path.display().to_string())?;
    Ok((dataset, metadata))
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn parse_dataset(range: &Range<DataType>) -> Result<Dataset> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Dataset::default());
    };

    let mut columns: Vec<Column> = header
        .iter()
        .map(|cell| Column::new(cell_to_string(Some(cell)), Vec::new()))
        .collect();
    if let Some(blank) = columns.iter().position(|column| column.name.trim().is_empty()) {
        return Err(ToolError::InvalidWorkbook(format!(
            "data column {} has no name",
            blank + 1
        )));
    }

    for cells in rows {
        for (index, column) in columns.iter_mut().enumerate() {
            column.values.push(cell_to_scalar(cells.get(index))?);
        }
    }

    Ok(Dataset::new(columns))
}

fn parse_metadata(range: &Range<DataType>, source: &str) -> Result<MetadataTable> {
    let headers = HeaderIndex::from_range(range);
    let variable_col = headers.require(VARIABLE_COLUMN)?;
    let label_col = headers.find(LABEL_COLUMN);
    let field_values_col = headers.find(FIELD_VALUES_COLUMN);

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 1;
    let mut table = MetadataTable {
        columns: headers.names.clone(),
        rows: Vec::new(),
    };

    for (index, cells) in range.rows().enumerate().skip(1) {
        let variable = cell_to_string(cells.get(variable_col));
        if variable.trim().is_empty() {
            continue;
        }

        let mut entry = VariableMetadata::new(variable);
        entry.label = label_col.and_then(|col| optional_cell(cells.get(col)));
        entry.field_values = field_values_col
            .and_then(|col| optional_cell(cells.get(col)))
            .map(|text| {
                ValueMap::parse(&text).map_err(|error| ToolError::Parse {
                    file: source.to_string(),
                    row: first_row + index,
                    detail: format!("{FIELD_VALUES_COLUMN} of '{}': {error}", entry.variable),
                })
            })
            .transpose()?;

        let attributes: BTreeMap<String, String> = headers
            .names
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_standard_metadata_column(name))
            .filter_map(|(col, name)| optional_cell(cells.get(col)).map(|v| (name.clone(), v)))
            .collect();
        entry.attributes = attributes;
        table.rows.push(entry);
    }

    Ok(table)
}

fn is_standard_metadata_column(name: &str) -> bool {
    name == VARIABLE_COLUMN || name == LABEL_COLUMN || name == FIELD_VALUES_COLUMN
}

struct HeaderIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn from_range(range: &Range<DataType>) -> Self {
        let names: Vec<String> = match range.rows().next() {
            Some(first_row) => first_row
                .iter()
                .map(|cell| cell_to_string(Some(cell)).trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        let positions = names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| (name.clone(), index))
            .collect();
        Self { names, positions }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.find(name)
            .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing column '{name}'")))
    }
}

fn cell_to_scalar(cell: Option<&DataType>) -> Result<Scalar> {
    Ok(match cell {
        Some(DataType::Empty) | None => Scalar::Null,
        Some(DataType::Int(value)) => Scalar::Int(*value),
        Some(DataType::Float(value)) => Scalar::Float(*value),
        Some(DataType::Bool(value)) => Scalar::Bool(*value),
        Some(DataType::String(value)) => Scalar::Text(value.clone()),
        Some(DataType::Error(error)) => {
            return Err(ToolError::InvalidWorkbook(format!(
                "cell contains an error value: {error}"
            )));
        }
        Some(other) => Scalar::Text(other.to_string()),
    })
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn optional_cell(cell: Option<&DataType>) -> Option<String> {
    let value = cell_to_string(cell);
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
