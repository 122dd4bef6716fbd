// Tuple Implementation
//
// A tuple is an ordered vector of values, bincode-encoded when it lives in
// a heap page. The rid is attached once the tuple is resident.

use crate::catalog::value::DataValue;
use crate::common::types::Rid;
use crate::storage::table::error::TableError;

#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<DataValue>,
    rid: Option<Rid>,
}

impl Tuple {
    pub fn new(values: Vec<DataValue>) -> Self {
        Tuple { values, rid: None }
    }

    pub fn with_rid(values: Vec<DataValue>, rid: Rid) -> Self {
        Tuple {
            values,
            rid: Some(rid),
        }
    }

    pub fn rid(&self) -> Option<Rid> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = Some(rid);
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&DataValue> {
        self.values.get(index)
    }

    /// Values of the given columns, in key order. Missing columns become
    /// NULL rather than panicking; schemas are validated at catalog level.
    pub fn key_values(&self, key_attrs: &[usize]) -> Vec<DataValue> {
        key_attrs
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(DataValue::Null))
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        Ok(bincode::serialize(&self.values)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let values: Vec<DataValue> = bincode::deserialize(bytes)?;
        Ok(Tuple { values, rid: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let tuple = Tuple::new(vec![
            DataValue::Integer(42),
            DataValue::Text("kestrel".to_string()),
            DataValue::Null,
            DataValue::Boolean(true),
        ]);
        let bytes = tuple.to_bytes().unwrap();
        let decoded = Tuple::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.values(), tuple.values());
        assert_eq!(decoded.rid(), None);
    }

    #[test]
    fn test_key_values() {
        let tuple = Tuple::new(vec![
            DataValue::Integer(1),
            DataValue::Text("a".to_string()),
            DataValue::Float(2.5),
        ]);
        assert_eq!(
            tuple.key_values(&[2, 0]),
            vec![DataValue::Float(2.5), DataValue::Integer(1)]
        );
        assert_eq!(tuple.key_values(&[9]), vec![DataValue::Null]);
    }
}
