use std::collections::HashSet;

use tracing::debug;

use crate::changes::DataTransforms;
use crate::error::{Result, ToolError};
use crate::model::Dataset;

/// Applies recodes and then renames to a copy of `dataset`.
///
/// Recode groups reference old column names, so recoding runs first. Column
/// order is preserved.
pub fn harmonise_data(dataset: &Dataset, transforms: &DataTransforms) -> Result<Dataset> {
    let mut harmonised = dataset.clone();

    for group in &transforms.recodes {
        for variable in &group.variables {
            let column = harmonised
                .column_mut(variable)
                .ok_or_else(|| missing(transforms, variable))?;
            let mut replaced = 0usize;
            for value in column.values.iter_mut() {
                let recoded = group.map.apply(value);
                if !recoded.identical(value) {
                    *value = recoded;
                    replaced += 1;
                }
            }
            debug!(variable = %variable, replaced, expression = %group.expression, "recoded column");
        }
    }

    for (old_name, _) in transforms.renames.iter() {
        if harmonised.column(old_name).is_none() {
            return Err(missing(transforms, old_name));
        }
    }

    let mut final_names = HashSet::new();
    for column in harmonised.columns.iter_mut() {
        if let Some(new_name) = transforms.renames.get(&column.name) {
            debug!(from = %column.name, to = new_name, "renamed column");
            column.name = new_name.to_string();
        }
        if !final_names.insert(column.name.clone()) {
            return Err(ToolError::RenameCollision {
                file: transforms.file.clone(),
                target: column.name.clone(),
            });
        }
    }

    Ok(harmonised)
}

fn missing(transforms: &DataTransforms, variable: &str) -> ToolError {
    ToolError::MissingVariable {
        file: transforms.file.clone(),
        variable: variable.to_string(),
    }
}
