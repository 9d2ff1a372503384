use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::changes::literal::ValueMap;

/// A single cell value in a survey dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Scalar {
    /// Missing value.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// Text literal.
    Text(String),
}

impl Scalar {
    /// Strict equality: same variant and, for floats, the same bit pattern.
    pub fn identical(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Float(lhs), Scalar::Float(rhs)) => lhs.to_bits() == rhs.to_bits(),
            (lhs, rhs) => lhs == rhs,
        }
    }

    /// Value equality used for recode lookups. Integers and floats compare
    /// numerically so that `1` in a recode matches a stored `1.0`.
    pub fn matches(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Int(lhs), Scalar::Float(rhs)) | (Scalar::Float(rhs), Scalar::Int(lhs)) => {
                *lhs as f64 == *rhs
            }
            (Scalar::Float(lhs), Scalar::Float(rhs)) => lhs == rhs,
            (lhs, rhs) => lhs == rhs,
        }
    }

    /// Adapts a replacement value to the storage kind of `template`: an
    /// integer written into a float column stays a float.
    pub fn coerce_like(&self, template: &Scalar) -> Scalar {
        match (self, template) {
            (Scalar::Int(value), Scalar::Float(_)) => Scalar::Float(*value as f64),
            (value, _) => value.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "None"),
            Scalar::Bool(true) => write!(f, "True"),
            Scalar::Bool(false) => write!(f, "False"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value:?}"),
            Scalar::Text(value) => {
                write!(f, "'")?;
                for ch in value.chars() {
                    match ch {
                        '\\' => write!(f, "\\\\")?,
                        '\'' => write!(f, "\\'")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "'")
            }
        }
    }
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    /// Creates a column from its name and values.
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Returns true when both columns hold identical values in the same order.
    pub fn same_values(&self, other: &Column) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(lhs, rhs)| lhs.identical(rhs))
    }
}

/// An ordered collection of columns, one value per record in each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<Column>,
}

impl Dataset {
    /// Creates a dataset from columns in display order.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Looks up a column by name for in-place edits.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|column| column.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    /// Number of records, taken from the longest column.
    pub fn row_count(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.values.len())
            .max()
            .unwrap_or(0)
    }
}

/// Header of the metadata column holding variable names.
pub const VARIABLE_COLUMN: &str = "Variable";
/// Header of the metadata column holding variable labels.
pub const LABEL_COLUMN: &str = "Label";
/// Header of the metadata column holding value labels.
pub const FIELD_VALUES_COLUMN: &str = "Field Values";

/// Metadata describing a single variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMetadata {
    pub variable: String,
    pub label: Option<String>,
    pub field_values: Option<ValueMap>,
    /// Any further attribute columns, keyed by header.
    pub attributes: BTreeMap<String, String>,
}

impl VariableMetadata {
    /// Creates metadata for `variable` with no label or value labels.
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            label: None,
            field_values: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the variable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the value labels.
    pub fn with_field_values(mut self, field_values: ValueMap) -> Self {
        self.field_values = Some(field_values);
        self
    }
}

/// Variable metadata table. `columns` keeps the header order so the table
/// can be written back with the same shape it was read with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataTable {
    pub columns: Vec<String>,
    pub rows: Vec<VariableMetadata>,
}

impl MetadataTable {
    /// Creates a table with the standard `Variable`, `Label`, `Field Values` header.
    pub fn new(rows: Vec<VariableMetadata>) -> Self {
        Self {
            columns: vec![
                VARIABLE_COLUMN.to_string(),
                LABEL_COLUMN.to_string(),
                FIELD_VALUES_COLUMN.to_string(),
            ],
            rows,
        }
    }

    /// Looks up the row describing `variable`.
    pub fn get(&self, variable: &str) -> Option<&VariableMetadata> {
        self.rows.iter().find(|row| row.variable == variable)
    }
}
