//! Result set decoding
//!
//! HiveServer2 returns result pages column-major: the result metadata lists
//! column names and primitive types, and the row set carries one typed value
//! list per column in the same order. The functions here pair the two and
//! produce either a single column, a filtered table, or an ordered column map.
//!
//! Decoding is all-or-nothing: any unresolvable column type or mismatched
//! union arm fails the whole call.

use std::ops::Deref;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::messages::{Column, ColumnDesc, RowSet, TableSchema};
use crate::row::{Row, Value};
use crate::types::column_field_for_id;

/// A decoded page: header plus records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    /// Retained column names, in output order
    pub columns: Vec<String>,
    /// Records, each in `columns` order
    pub rows: Vec<Row>,
    /// The engine reported rows beyond this page
    pub has_more_rows: bool,
}

impl ResultTable {
    /// Create a table from a header and records
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            has_more_rows: false,
        }
    }

    /// Number of records (header excluded)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table holds no records
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header names
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }

    /// Flatten to rows with the header as row 0
    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(
            self.columns
                .iter()
                .map(|name| Value::String(name.clone()))
                .collect(),
        );
        out.extend(self.rows.iter().map(|row| row.values().to_vec()));
        out
    }

    /// `{"columns": [...], "rows": [[...], ...], "has_more_rows": bool}`
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| serde_json::Value::Array(row.values().iter().map(Value::to_json).collect()))
            .collect();
        serde_json::json!({
            "columns": self.columns,
            "rows": rows,
            "has_more_rows": self.has_more_rows,
        })
    }
}

/// One page of catalog names
///
/// Dereferences to `[String]`. `has_more_rows` is set when the engine had
/// names beyond the page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList {
    /// Names in server order
    pub names: Vec<String>,
    /// The engine reported names beyond this page
    pub has_more_rows: bool,
}

impl NameList {
    /// Create a complete (untruncated) list
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            has_more_rows: false,
        }
    }

    /// Take the names, dropping the truncation flag
    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

impl Deref for NameList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.names
    }
}

impl IntoIterator for NameList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.into_iter()
    }
}

impl<'a> IntoIterator for &'a NameList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

impl PartialEq<Vec<&str>> for NameList {
    fn eq(&self, other: &Vec<&str>) -> bool {
        self.names.len() == other.len() && self.names.iter().zip(other).all(|(a, b)| a == b)
    }
}

/// Resolve a metadata column to its data column, checking the union arm
fn resolve<'a>(desc: &ColumnDesc, index: usize, rowset: &'a RowSet) -> Result<Option<&'a Column>> {
    let expected = column_field_for_id(desc.type_id).ok_or_else(|| Error::UnsupportedColumnType {
        column: desc.name.clone(),
        type_id: desc.type_id,
    })?;

    // A page with no column data at all is an empty result
    if rowset.columns.is_empty() {
        return Ok(None);
    }

    let column = rowset.columns.get(index).ok_or_else(|| {
        Error::protocol(format!(
            "row set has {} columns but metadata names {} at position {}",
            rowset.columns.len(),
            desc.name,
            index
        ))
    })?;

    let actual = column.field();
    if actual != expected {
        return Err(Error::ColumnTypeMismatch {
            column: desc.name.clone(),
            expected: expected.name(),
            actual: actual.name(),
        });
    }
    Ok(Some(column))
}

/// Values of the column named `name`
///
/// The first metadata column with that name wins.
pub fn extract_column(schema: &TableSchema, rowset: &RowSet, name: &str) -> Result<Vec<Value>> {
    let (index, desc) = schema
        .columns
        .iter()
        .enumerate()
        .find(|(_, c)| c.name == name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;

    Ok(resolve(desc, index, rowset)?
        .map(Column::values)
        .unwrap_or_default())
}

/// Values of the column named `name` as text, skipping NULLs
pub fn extract_strings(schema: &TableSchema, rowset: &RowSet, name: &str) -> Result<Vec<String>> {
    Ok(extract_column(schema, rowset, name)?
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Decode a page into a table
///
/// With no filter (or an empty one) every column is kept in metadata order.
/// Otherwise the matching columns are kept in filter order; filter names the
/// metadata does not know are dropped, but at least one must match.
pub fn extract_table(
    schema: &TableSchema,
    rowset: &RowSet,
    filter: Option<&[&str]>,
) -> Result<ResultTable> {
    let selected: Vec<(usize, &ColumnDesc)> = match filter {
        Some(names) if !names.is_empty() => {
            let selected: Vec<_> = names
                .iter()
                .filter_map(|name| {
                    schema
                        .columns
                        .iter()
                        .enumerate()
                        .find(|(_, c)| c.name == *name)
                })
                .collect();
            if selected.is_empty() {
                return Err(Error::EmptyProjection(
                    names.iter().map(|n| n.to_string()).collect(),
                ));
            }
            selected
        }
        _ => schema.columns.iter().enumerate().collect(),
    };

    let mut header = Vec::with_capacity(selected.len());
    let mut data = Vec::with_capacity(selected.len());
    for (index, desc) in &selected {
        header.push(desc.name.clone());
        data.push(resolve(desc, *index, rowset)?);
    }

    let row_count = data.first().copied().flatten().map(Column::len).unwrap_or(0);
    tracing::trace!(
        columns = header.len(),
        rows = row_count,
        "Decoded result page"
    );

    let rows = (0..row_count)
        .map(|i| {
            Row::new(
                data.iter()
                    .map(|column| column.and_then(|c| c.value(i)).unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .collect();

    Ok(ResultTable::new(header, rows))
}

/// Decode a page into an ordered map of column name to values
pub fn extract_column_map(schema: &TableSchema, rowset: &RowSet) -> Result<IndexMap<String, Vec<Value>>> {
    let mut map = IndexMap::with_capacity(schema.columns.len());
    for (index, desc) in schema.columns.iter().enumerate() {
        let values = resolve(desc, index, rowset)?
            .map(Column::values)
            .unwrap_or_default();
        map.insert(desc.name.clone(), values);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TypeId;
    use crate::messages::TypedColumn;

    fn listing() -> (TableSchema, RowSet) {
        let schema = TableSchema::new(vec![
            ColumnDesc::new("TABLE_SCHEM", TypeId::String, 1),
            ColumnDesc::new("TABLE_NAME", TypeId::String, 2),
            ColumnDesc::new("ORDINAL_POSITION", TypeId::Int, 3),
        ]);
        let rowset = RowSet::new(vec![
            Column::String(TypedColumn::new(vec!["db".into(), "db".into()])),
            Column::String(TypedColumn::new(vec!["t1".into(), "t2".into()])),
            Column::I32(TypedColumn::with_nulls(vec![1, 0], vec![0b10u8])),
        ]);
        (schema, rowset)
    }

    #[test]
    fn test_name_list() {
        let list = NameList {
            names: vec!["a".into(), "b".into()],
            has_more_rows: true,
        };
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"b".to_string()));
        assert_eq!(list, vec!["a", "b"]);
        assert_ne!(list, vec!["a"]);
        let collected: Vec<&String> = (&list).into_iter().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(list.into_vec(), vec!["a".to_string(), "b".to_string()]);
        assert!(!NameList::new(Vec::new()).has_more_rows);
    }

    #[test]
    fn test_extract_column() {
        let (schema, rowset) = listing();
        let values = extract_column(&schema, &rowset, "TABLE_NAME").unwrap();
        assert_eq!(values, vec![Value::from("t1"), Value::from("t2")]);
    }

    #[test]
    fn test_extract_column_missing() {
        let (schema, rowset) = listing();
        let err = extract_column(&schema, &rowset, "NOPE").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref n) if n == "NOPE"));
    }

    #[test]
    fn test_extract_table_filter_order() {
        let (schema, rowset) = listing();
        let table =
            extract_table(&schema, &rowset, Some(&["ORDINAL_POSITION", "TABLE_NAME"][..])).unwrap();
        assert_eq!(table.columns, vec!["ORDINAL_POSITION", "TABLE_NAME"]);
        assert_eq!(table.rows[0].values(), &[Value::Int(1), Value::from("t1")]);
        assert_eq!(table.rows[1].values(), &[Value::Null, Value::from("t2")]);
    }

    #[test]
    fn test_extract_table_ignores_unknown_filter_names() {
        let (schema, rowset) = listing();
        let table = extract_table(&schema, &rowset, Some(&["MISSING", "TABLE_SCHEM"][..])).unwrap();
        assert_eq!(table.columns, vec!["TABLE_SCHEM"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_extract_table_empty_projection() {
        let (schema, rowset) = listing();
        let err = extract_table(&schema, &rowset, Some(&["A", "B"][..])).unwrap_err();
        assert!(matches!(err, Error::EmptyProjection(ref names) if names.len() == 2));
    }

    #[test]
    fn test_extract_table_unsupported_type() {
        let mut desc = ColumnDesc::new("ts", TypeId::Timestamp, 1);
        desc.type_id = crate::constants::TIMESTAMP_LOCAL_TZ_TYPE_ID;
        let schema = TableSchema::new(vec![desc]);
        let rowset = RowSet::new(vec![Column::String(TypedColumn::new(vec!["x".into()]))]);
        let err = extract_table(&schema, &rowset, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedColumnType { type_id: 22, .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let schema = TableSchema::new(vec![ColumnDesc::new("n", TypeId::BigInt, 1)]);
        let rowset = RowSet::new(vec![Column::I32(TypedColumn::new(vec![1]))]);
        let err = extract_column(&schema, &rowset, "n").unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnTypeMismatch {
                expected: "i64Val",
                actual: "i32Val",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_row_set() {
        let (schema, _) = listing();
        let table = extract_table(&schema, &RowSet::default(), None).unwrap();
        assert_eq!(table.columns.len(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn test_column_map_order() {
        let (schema, rowset) = listing();
        let map = extract_column_map(&schema, &rowset).unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["TABLE_SCHEM", "TABLE_NAME", "ORDINAL_POSITION"]);
        assert_eq!(map["ORDINAL_POSITION"], vec![Value::Int(1), Value::Null]);
    }

    #[test]
    fn test_to_rows_header_first() {
        let (schema, rowset) = listing();
        let table = extract_table(&schema, &rowset, Some(&["TABLE_NAME"][..])).unwrap();
        let rows = table.to_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![Value::from("TABLE_NAME")]);
        assert_eq!(rows[2], vec![Value::from("t2")]);
    }

    #[test]
    fn test_to_json() {
        let table = ResultTable::new(
            vec!["id".into(), "name".into()],
            vec![Row::new(vec![Value::Int(1), Value::Null])],
        );
        assert_eq!(
            table.to_json(),
            serde_json::json!({
                "columns": ["id", "name"],
                "rows": [[1, null]],
                "has_more_rows": false,
            })
        );
    }

    #[test]
    fn test_extract_strings_skips_nulls() {
        let schema = TableSchema::new(vec![ColumnDesc::new("s", TypeId::String, 1)]);
        let rowset = RowSet::new(vec![Column::String(TypedColumn::with_nulls(
            vec!["a".into(), String::new(), "c".into()],
            vec![0b010u8],
        ))]);
        assert_eq!(extract_strings(&schema, &rowset, "s").unwrap(), vec!["a", "c"]);
    }
}
