//! Catalog metadata messages (GetSchemas, GetTables, GetColumns) and result
//! set metadata (GetResultSetMetadata)

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{ThriftType, TypeId};
use crate::error::Result;
use crate::protocol::{
    read_field_begin, read_list, required, skip, write_field_begin, write_field_stop,
    write_i32_field, write_list_begin, write_string_field, write_string_list_field,
    write_struct_field, ThriftStruct,
};

use super::{OperationHandle, SessionHandle, Status};

/// Type id reported for columns whose type entry is not primitive
pub const UNKNOWN_TYPE_ID: i32 = -1;

/// Request listing the schemas visible to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSchemasReq {
    /// Owning session
    pub session_handle: SessionHandle,
    /// Catalog filter
    pub catalog_name: Option<String>,
    /// Schema name pattern
    pub schema_name: Option<String>,
}

impl GetSchemasReq {
    /// Request all schemas
    pub fn new(session_handle: SessionHandle) -> Self {
        Self {
            session_handle,
            catalog_name: None,
            schema_name: None,
        }
    }
}

impl ThriftStruct for GetSchemasReq {
    const NAME: &'static str = "TGetSchemasReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_handle)?;
        if let Some(catalog) = &self.catalog_name {
            write_string_field(buf, 2, catalog)?;
        }
        if let Some(schema) = &self.schema_name {
            write_string_field(buf, 3, schema)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_handle = None;
        let mut catalog_name = None;
        let mut schema_name = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                (2, ThriftType::String) => catalog_name = Some(buf.read_string()?),
                (3, ThriftType::String) => schema_name = Some(buf.read_string()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, Self::NAME, "sessionHandle")?,
            catalog_name,
            schema_name,
        })
    }
}

/// Request listing the tables of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTablesReq {
    /// Owning session
    pub session_handle: SessionHandle,
    /// Catalog filter
    pub catalog_name: Option<String>,
    /// Schema name pattern
    pub schema_name: Option<String>,
    /// Table name pattern
    pub table_name: Option<String>,
    /// Table types to include (TABLE, VIEW, ...)
    pub table_types: Vec<String>,
}

impl GetTablesReq {
    /// Request every table in `schema_name`
    pub fn new(session_handle: SessionHandle, schema_name: impl Into<String>) -> Self {
        Self {
            session_handle,
            catalog_name: None,
            schema_name: Some(schema_name.into()),
            table_name: None,
            table_types: Vec::new(),
        }
    }
}

impl ThriftStruct for GetTablesReq {
    const NAME: &'static str = "TGetTablesReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_handle)?;
        if let Some(catalog) = &self.catalog_name {
            write_string_field(buf, 2, catalog)?;
        }
        if let Some(schema) = &self.schema_name {
            write_string_field(buf, 3, schema)?;
        }
        if let Some(table) = &self.table_name {
            write_string_field(buf, 4, table)?;
        }
        if !self.table_types.is_empty() {
            write_string_list_field(buf, 5, &self.table_types)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_handle = None;
        let mut catalog_name = None;
        let mut schema_name = None;
        let mut table_name = None;
        let mut table_types = Vec::new();
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                (2, ThriftType::String) => catalog_name = Some(buf.read_string()?),
                (3, ThriftType::String) => schema_name = Some(buf.read_string()?),
                (4, ThriftType::String) => table_name = Some(buf.read_string()?),
                (5, ThriftType::List) => {
                    table_types = read_list(buf, ThriftType::String, |b| b.read_string())?
                }
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, Self::NAME, "sessionHandle")?,
            catalog_name,
            schema_name,
            table_name,
            table_types,
        })
    }
}

/// Request listing the columns of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetColumnsReq {
    /// Owning session
    pub session_handle: SessionHandle,
    /// Catalog filter
    pub catalog_name: Option<String>,
    /// Schema name pattern
    pub schema_name: Option<String>,
    /// Table name pattern
    pub table_name: Option<String>,
    /// Column name pattern
    pub column_name: Option<String>,
}

impl GetColumnsReq {
    /// Request every column of `schema_name.table_name`
    pub fn new(
        session_handle: SessionHandle,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            session_handle,
            catalog_name: None,
            schema_name: Some(schema_name.into()),
            table_name: Some(table_name.into()),
            column_name: None,
        }
    }
}

impl ThriftStruct for GetColumnsReq {
    const NAME: &'static str = "TGetColumnsReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.session_handle)?;
        if let Some(catalog) = &self.catalog_name {
            write_string_field(buf, 2, catalog)?;
        }
        if let Some(schema) = &self.schema_name {
            write_string_field(buf, 3, schema)?;
        }
        if let Some(table) = &self.table_name {
            write_string_field(buf, 4, table)?;
        }
        if let Some(column) = &self.column_name {
            write_string_field(buf, 5, column)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut session_handle = None;
        let mut catalog_name = None;
        let mut schema_name = None;
        let mut table_name = None;
        let mut column_name = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => session_handle = Some(SessionHandle::read(buf)?),
                (2, ThriftType::String) => catalog_name = Some(buf.read_string()?),
                (3, ThriftType::String) => schema_name = Some(buf.read_string()?),
                (4, ThriftType::String) => table_name = Some(buf.read_string()?),
                (5, ThriftType::String) => column_name = Some(buf.read_string()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            session_handle: required(session_handle, Self::NAME, "sessionHandle")?,
            catalog_name,
            schema_name,
            table_name,
            column_name,
        })
    }
}

/// Response to any call that starts an operation
///
/// GetSchemas, GetTables, GetColumns and ExecuteStatement share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResp {
    /// Request status
    pub status: Status,
    /// Handle of the started operation (absent on failure)
    pub operation_handle: Option<OperationHandle>,
}

impl OperationResp {
    /// Successful response carrying `handle`
    pub fn success(handle: OperationHandle) -> Self {
        Self {
            status: Status::success(),
            operation_handle: Some(handle),
        }
    }
}

impl ThriftStruct for OperationResp {
    const NAME: &'static str = "TOperationResp";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.status)?;
        if let Some(handle) = &self.operation_handle {
            write_struct_field(buf, 2, handle)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status = None;
        let mut operation_handle = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => status = Some(Status::read(buf)?),
                (2, ThriftType::Struct) => operation_handle = Some(OperationHandle::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status: required(status, Self::NAME, "status")?,
            operation_handle,
        })
    }
}

/// Response to [`GetSchemasReq`]
pub type GetSchemasResp = OperationResp;
/// Response to [`GetTablesReq`]
pub type GetTablesResp = OperationResp;
/// Response to [`GetColumnsReq`]
pub type GetColumnsResp = OperationResp;

/// Request naming one operation (GetResultSetMetadata, CloseOperation)
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReq {
    /// Target operation
    pub operation_handle: OperationHandle,
}

impl ThriftStruct for OperationReq {
    const NAME: &'static str = "TOperationReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.operation_handle)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut operation_handle = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => operation_handle = Some(OperationHandle::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            operation_handle: required(operation_handle, Self::NAME, "operationHandle")?,
        })
    }
}

/// Request for the column metadata of an operation's result set
pub type GetResultSetMetadataReq = OperationReq;

/// One result column: name, primitive type and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    /// Column name
    pub name: String,
    /// Primitive type id of the first type entry, or [`UNKNOWN_TYPE_ID`]
    pub type_id: i32,
    /// 1-based ordinal position
    pub position: i32,
    /// Column comment
    pub comment: Option<String>,
}

impl ColumnDesc {
    /// Create a column description
    pub fn new(name: impl Into<String>, type_id: TypeId, position: i32) -> Self {
        Self {
            name: name.into(),
            type_id: type_id as i32,
            position,
            comment: None,
        }
    }

    /// Decoded primitive type, if the id is known
    pub fn type_id(&self) -> Option<TypeId> {
        TypeId::from_i32(self.type_id)
    }
}

impl ThriftStruct for ColumnDesc {
    const NAME: &'static str = "TColumnDesc";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_string_field(buf, 1, &self.name)?;

        // TTypeDesc { 1: list<TTypeEntry> } with one primitive entry
        write_field_begin(buf, ThriftType::Struct, 2);
        write_field_begin(buf, ThriftType::List, 1);
        write_list_begin(buf, ThriftType::Struct, 1)?;
        write_field_begin(buf, ThriftType::Struct, 1); // TTypeEntry.primitiveEntry
        write_i32_field(buf, 1, self.type_id); // TPrimitiveTypeEntry.type
        write_field_stop(buf);
        write_field_stop(buf);
        write_field_stop(buf);

        write_i32_field(buf, 3, self.position);
        if let Some(comment) = &self.comment {
            write_string_field(buf, 4, comment)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut name = None;
        let mut type_id = None;
        let mut position = None;
        let mut comment = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::String) => name = Some(buf.read_string()?),
                (2, ThriftType::Struct) => type_id = Some(read_type_desc(buf)?),
                (3, ThriftType::I32) => position = Some(buf.read_i32()?),
                (4, ThriftType::String) => comment = Some(buf.read_string()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            name: required(name, Self::NAME, "columnName")?,
            type_id: required(type_id, Self::NAME, "typeDesc")?,
            position: required(position, Self::NAME, "position")?,
            comment,
        })
    }
}

/// Read a TTypeDesc and return the primitive type id of its first entry
fn read_type_desc(buf: &mut ReadBuffer) -> Result<i32> {
    let mut type_ids = Vec::new();
    while let Some((field_type, id)) = read_field_begin(buf)? {
        match (id, field_type) {
            (1, ThriftType::List) => type_ids = read_list(buf, ThriftType::Struct, read_type_entry)?,
            _ => skip(buf, field_type)?,
        }
    }
    Ok(type_ids.first().copied().unwrap_or(UNKNOWN_TYPE_ID))
}

/// Read a TTypeEntry union; only the primitive arm carries a usable type id
fn read_type_entry(buf: &mut ReadBuffer) -> Result<i32> {
    let mut type_id = UNKNOWN_TYPE_ID;
    while let Some((field_type, id)) = read_field_begin(buf)? {
        match (id, field_type) {
            (1, ThriftType::Struct) => {
                while let Some((inner_type, inner_id)) = read_field_begin(buf)? {
                    match (inner_id, inner_type) {
                        (1, ThriftType::I32) => type_id = buf.read_i32()?,
                        _ => skip(buf, inner_type)?,
                    }
                }
            }
            _ => skip(buf, field_type)?,
        }
    }
    Ok(type_id)
}

/// Ordered column metadata of a result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// Columns in result order
    pub columns: Vec<ColumnDesc>,
}

impl TableSchema {
    /// Create a schema from columns
    pub fn new(columns: Vec<ColumnDesc>) -> Self {
        Self { columns }
    }

    /// Column names in result order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl ThriftStruct for TableSchema {
    const NAME: &'static str = "TTableSchema";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_field_begin(buf, ThriftType::List, 1);
        write_list_begin(buf, ThriftType::Struct, self.columns.len())?;
        for column in &self.columns {
            column.write(buf)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut columns = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::List) => {
                    columns = Some(read_list(buf, ThriftType::Struct, ColumnDesc::read)?)
                }
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            columns: required(columns, Self::NAME, "columns")?,
        })
    }
}

/// Response to [`GetResultSetMetadataReq`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResultSetMetadataResp {
    /// Request status
    pub status: Status,
    /// Column metadata (absent on failure)
    pub schema: Option<TableSchema>,
}

impl ThriftStruct for GetResultSetMetadataResp {
    const NAME: &'static str = "TGetResultSetMetadataResp";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.status)?;
        if let Some(schema) = &self.schema {
            write_struct_field(buf, 2, schema)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status = None;
        let mut schema = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => status = Some(Status::read(buf)?),
                (2, ThriftType::Struct) => schema = Some(TableSchema::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status: required(status, Self::NAME, "status")?,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_roundtrip() {
        let schema = TableSchema::new(vec![
            ColumnDesc::new("TABLE_SCHEM", TypeId::String, 1),
            ColumnDesc::new("ORDINAL_POSITION", TypeId::Int, 2),
        ]);
        let mut buf = WriteBuffer::new();
        schema.write(&mut buf).unwrap();
        let parsed = TableSchema::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(parsed.columns[1].type_id(), Some(TypeId::Int));
    }

    #[test]
    fn test_non_primitive_type_entry() {
        // TColumnDesc whose type entry is an arrayEntry (union field 2)
        let mut buf = WriteBuffer::new();
        write_string_field(&mut buf, 1, "tags").unwrap();
        write_field_begin(&mut buf, ThriftType::Struct, 2);
        write_field_begin(&mut buf, ThriftType::List, 1);
        write_list_begin(&mut buf, ThriftType::Struct, 1).unwrap();
        write_field_begin(&mut buf, ThriftType::Struct, 2);
        write_i32_field(&mut buf, 1, 7); // objectTypePtr
        write_field_stop(&mut buf);
        write_field_stop(&mut buf);
        write_field_stop(&mut buf);
        write_i32_field(&mut buf, 3, 1);
        write_field_stop(&mut buf);

        let column = ColumnDesc::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(column.type_id, UNKNOWN_TYPE_ID);
        assert_eq!(column.type_id(), None);
    }

    #[test]
    fn test_get_tables_req_roundtrip() {
        let mut req = GetTablesReq::new(SessionHandle::default(), "default");
        req.table_types = vec!["TABLE".into(), "VIEW".into()];
        let mut buf = WriteBuffer::new();
        req.write(&mut buf).unwrap();
        let parsed = GetTablesReq::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, req);
    }
}
