// Schema Management Module
//
// This module defines the Schema type that describes a tuple layout.

use serde::{Deserialize, Serialize};

use crate::catalog::column::Column;

/// Data types supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

/// An ordered list of columns describing one tuple shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Index of the column with the given name, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Project a subset of columns into a new schema. Indexes out of range
    /// are skipped.
    pub fn project(&self, indexes: &[usize]) -> Schema {
        Schema {
            columns: indexes
                .iter()
                .filter_map(|&i| self.columns.get(i).cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new(vec![
            Column::new("id".to_string(), DataType::Integer),
            Column::new("name".to_string(), DataType::Text),
            Column::new("active".to_string(), DataType::Boolean),
        ])
    }

    #[test]
    fn test_column_lookup() {
        let schema = sample();
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column(0).unwrap().name(), "id");
    }

    #[test]
    fn test_project() {
        let schema = sample();
        let projected = schema.project(&[2, 0]);
        assert_eq!(projected.column_count(), 2);
        assert_eq!(projected.column(0).unwrap().name(), "active");
        assert_eq!(projected.column(1).unwrap().name(), "id");
    }
}
