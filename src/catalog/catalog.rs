// Catalog Implementation
//
// The catalog owns the mapping from table/index oids to metadata, table
// heaps and hash indexes. It is shared behind an RwLock and handed to
// executors through the executor context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::error::CatalogError;
use crate::catalog::schema::Schema;
use crate::index::hash::ExtendibleHashIndex;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::hash_bucket::IndexKey;
use crate::storage::table::{TableHeap, Tuple};

/// Table oid type
pub type TableOid = u32;

/// Index oid type
pub type IndexOid = u32;

/// Metadata and heap handle for one table
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: Schema,
    pub heap: Arc<TableHeap>,
}

/// Metadata and index handle for one secondary index
pub struct IndexInfo {
    pub oid: IndexOid,
    pub name: String,
    pub table_name: String,
    /// Column positions in the table schema that form the key
    pub key_attrs: Vec<usize>,
    pub key_schema: Schema,
    pub index: Arc<ExtendibleHashIndex>,
}

impl IndexInfo {
    /// Build the fixed-size index key for a tuple by serializing the key
    /// columns.
    pub fn key_from_tuple(&self, tuple: &Tuple) -> Result<IndexKey, CatalogError> {
        let key_values = tuple.key_values(&self.key_attrs);
        let bytes = bincode::serialize(&key_values)?;
        Ok(IndexKey::from_bytes(&bytes))
    }
}

/// In-memory registry of tables and indexes
pub struct Catalog {
    buffer_pool: Arc<BufferPoolManager>,
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_names: HashMap<String, TableOid>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
    index_names: HashMap<String, IndexOid>,
    /// table name -> index oids on that table
    table_indexes: HashMap<String, Vec<IndexOid>>,
    next_table_oid: TableOid,
    next_index_oid: IndexOid,
}

impl Catalog {
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Self {
        Catalog {
            buffer_pool,
            tables: HashMap::new(),
            table_names: HashMap::new(),
            indexes: HashMap::new(),
            index_names: HashMap::new(),
            table_indexes: HashMap::new(),
            next_table_oid: 0,
            next_index_oid: 0,
        }
    }

    /// Create a table and its backing heap
    pub fn create_table(
        &mut self,
        name: &str,
        schema: Schema,
    ) -> Result<Arc<TableInfo>, CatalogError> {
        if self.table_names.contains_key(name) {
            return Err(CatalogError::DuplicateTable(name.to_string()));
        }

        let heap = Arc::new(TableHeap::new(self.buffer_pool.clone())?);
        let oid = self.next_table_oid;
        self.next_table_oid += 1;

        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema,
            heap,
        });

        self.tables.insert(oid, info.clone());
        self.table_names.insert(name.to_string(), oid);
        self.table_indexes.insert(name.to_string(), Vec::new());

        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Result<Arc<TableInfo>, CatalogError> {
        self.tables
            .get(&oid)
            .cloned()
            .ok_or(CatalogError::TableOidNotFound(oid))
    }

    pub fn get_table_by_name(&self, name: &str) -> Result<Arc<TableInfo>, CatalogError> {
        let oid = self
            .table_names
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))?;
        self.get_table(*oid)
    }

    /// Create a hash index over the given key columns of a table. The index
    /// starts empty; loading existing rows is the caller's concern.
    pub fn create_index(
        &mut self,
        index_name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        if self.index_names.contains_key(index_name) {
            return Err(CatalogError::DuplicateIndex(index_name.to_string()));
        }
        let table = self.get_table_by_name(table_name)?;

        for &attr in &key_attrs {
            if attr >= table.schema.column_count() {
                return Err(CatalogError::InvalidKeyColumn {
                    table: table_name.to_string(),
                    column: attr,
                });
            }
        }
        let key_schema = table.schema.project(&key_attrs);

        let index = Arc::new(ExtendibleHashIndex::new(self.buffer_pool.clone())?);
        let oid = self.next_index_oid;
        self.next_index_oid += 1;

        let info = Arc::new(IndexInfo {
            oid,
            name: index_name.to_string(),
            table_name: table_name.to_string(),
            key_attrs,
            key_schema,
            index,
        });

        self.indexes.insert(oid, info.clone());
        self.index_names.insert(index_name.to_string(), oid);
        self.table_indexes
            .entry(table_name.to_string())
            .or_default()
            .push(oid);

        Ok(info)
    }

    pub fn get_index(&self, oid: IndexOid) -> Result<Arc<IndexInfo>, CatalogError> {
        self.indexes
            .get(&oid)
            .cloned()
            .ok_or_else(|| CatalogError::IndexNotFound(format!("oid {}", oid)))
    }

    pub fn get_index_by_name(&self, name: &str) -> Result<Arc<IndexInfo>, CatalogError> {
        let oid = self
            .index_names
            .get(name)
            .ok_or_else(|| CatalogError::IndexNotFound(name.to_string()))?;
        self.get_index(*oid)
    }

    /// All indexes declared on a table, in creation order
    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        self.table_indexes
            .get(table_name)
            .map(|oids| {
                oids.iter()
                    .filter_map(|oid| self.indexes.get(oid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}
