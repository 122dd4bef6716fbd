// Column Management Module
//
// This module defines the Column type that represents one column of a
// table schema.

use serde::{Deserialize, Serialize};

use crate::catalog::schema::DataType;

/// Represents a column in a table schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    name: String,
    /// Column data type
    data_type: DataType,
}

impl Column {
    pub fn new(name: String, data_type: DataType) -> Self {
        Column { name, data_type }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}
