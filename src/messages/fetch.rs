//! FetchResults messages and the columnar row set

use bytes::Bytes;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::constants::{FetchOrientation, ThriftType};
use crate::error::Result;
use crate::protocol::{
    read_field_begin, read_list, required, skip, write_binary_field, write_bool_field,
    write_field_begin, write_field_stop, write_i32_field, write_i64_field, write_list_begin,
    write_struct_field, ThriftStruct,
};
use crate::row::Value;
use crate::types::ColumnField;

use super::{OperationHandle, Status};

/// Request for the next page of an operation's rows
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultsReq {
    /// Operation to fetch from
    pub operation_handle: OperationHandle,
    /// Cursor movement
    pub orientation: FetchOrientation,
    /// Page size cap
    pub max_rows: i64,
    /// 0 = query output, 1 = operation log
    pub fetch_type: Option<i16>,
}

impl FetchResultsReq {
    /// Fetch the next `max_rows` rows
    pub fn next(operation_handle: OperationHandle, max_rows: i64) -> Self {
        Self {
            operation_handle,
            orientation: FetchOrientation::Next,
            max_rows,
            fetch_type: None,
        }
    }
}

impl ThriftStruct for FetchResultsReq {
    const NAME: &'static str = "TFetchResultsReq";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.operation_handle)?;
        write_i32_field(buf, 2, self.orientation as i32);
        write_i64_field(buf, 3, self.max_rows);
        if let Some(fetch_type) = self.fetch_type {
            write_field_begin(buf, ThriftType::I16, 4);
            buf.write_i16(fetch_type);
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut operation_handle = None;
        let mut orientation = FetchOrientation::Next;
        let mut max_rows = None;
        let mut fetch_type = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => operation_handle = Some(OperationHandle::read(buf)?),
                (2, ThriftType::I32) => orientation = orientation_from_i32(buf.read_i32()?),
                (3, ThriftType::I64) => max_rows = Some(buf.read_i64()?),
                (4, ThriftType::I16) => fetch_type = Some(buf.read_i16()?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            operation_handle: required(operation_handle, Self::NAME, "operationHandle")?,
            orientation,
            max_rows: required(max_rows, Self::NAME, "maxRows")?,
            fetch_type,
        })
    }
}

fn orientation_from_i32(value: i32) -> FetchOrientation {
    match value {
        1 => FetchOrientation::Prior,
        2 => FetchOrientation::Relative,
        3 => FetchOrientation::Absolute,
        4 => FetchOrientation::First,
        5 => FetchOrientation::Last,
        _ => FetchOrientation::Next,
    }
}

/// Response to [`FetchResultsReq`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultsResp {
    /// Request status
    pub status: Status,
    /// The engine holds rows beyond this page
    pub has_more_rows: bool,
    /// Page data (absent on failure)
    pub results: Option<RowSet>,
}

impl ThriftStruct for FetchResultsResp {
    const NAME: &'static str = "TFetchResultsResp";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_struct_field(buf, 1, &self.status)?;
        write_bool_field(buf, 2, self.has_more_rows);
        if let Some(results) = &self.results {
            write_struct_field(buf, 3, results)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut status = None;
        let mut has_more_rows = false;
        let mut results = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::Struct) => status = Some(Status::read(buf)?),
                (2, ThriftType::Bool) => has_more_rows = buf.read_bool()?,
                (3, ThriftType::Struct) => results = Some(RowSet::read(buf)?),
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            status: required(status, Self::NAME, "status")?,
            has_more_rows,
            results,
        })
    }
}

/// One page of column-major result data
///
/// Row-major `rows` are a legacy encoding (protocol V1-V5) and are not decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Offset of the first row in this page
    pub start_row_offset: i64,
    /// Columns in result-metadata order
    pub columns: Vec<Column>,
}

impl RowSet {
    /// Create a row set from columns
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            start_row_offset: 0,
            columns,
        }
    }

    /// Number of rows, taken from the first column
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }
}

impl ThriftStruct for RowSet {
    const NAME: &'static str = "TRowSet";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_i64_field(buf, 1, self.start_row_offset);
        write_field_begin(buf, ThriftType::List, 2);
        write_list_begin(buf, ThriftType::Struct, 0)?;
        write_field_begin(buf, ThriftType::List, 3);
        write_list_begin(buf, ThriftType::Struct, self.columns.len())?;
        for column in &self.columns {
            column.write(buf)?;
        }
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut start_row_offset = 0;
        let mut columns = Vec::new();
        while let Some((field_type, id)) = read_field_begin(buf)? {
            match (id, field_type) {
                (1, ThriftType::I64) => start_row_offset = buf.read_i64()?,
                (3, ThriftType::List) => columns = read_list(buf, ThriftType::Struct, Column::read)?,
                _ => skip(buf, field_type)?,
            }
        }
        Ok(Self {
            start_row_offset,
            columns,
        })
    }
}

/// Values of one column plus its null bitmap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedColumn<T> {
    /// One entry per row; entries for null rows hold a placeholder
    pub values: Vec<T>,
    /// Bit `i % 8` of byte `i / 8` is set when row `i` is NULL
    pub nulls: Bytes,
}

impl<T> TypedColumn<T> {
    /// Column without nulls
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            nulls: Bytes::new(),
        }
    }

    /// Column with an explicit null bitmap
    pub fn with_nulls(values: Vec<T>, nulls: impl Into<Bytes>) -> Self {
        Self {
            values,
            nulls: nulls.into(),
        }
    }

    /// Check the null bitmap for row `index`
    pub fn is_null(&self, index: usize) -> bool {
        self.nulls
            .get(index / 8)
            .map(|byte| byte & (1 << (index % 8)) != 0)
            .unwrap_or(false)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column holds no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn value_with(&self, index: usize, convert: impl FnOnce(&T) -> Value) -> Option<Value> {
        let raw = self.values.get(index)?;
        if self.is_null(index) {
            Some(Value::Null)
        } else {
            Some(convert(raw))
        }
    }
}

/// The `TColumn` union: one typed value list per column
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Column {
    Bool(TypedColumn<bool>),
    Byte(TypedColumn<i8>),
    I16(TypedColumn<i16>),
    I32(TypedColumn<i32>),
    I64(TypedColumn<i64>),
    Double(TypedColumn<f64>),
    String(TypedColumn<String>),
    Binary(TypedColumn<Bytes>),
}

impl Column {
    /// Union arm this column arrived in
    pub fn field(&self) -> ColumnField {
        match self {
            Column::Bool(_) => ColumnField::BoolVal,
            Column::Byte(_) => ColumnField::ByteVal,
            Column::I16(_) => ColumnField::I16Val,
            Column::I32(_) => ColumnField::I32Val,
            Column::I64(_) => ColumnField::I64Val,
            Column::Double(_) => ColumnField::DoubleVal,
            Column::String(_) => ColumnField::StringVal,
            Column::Binary(_) => ColumnField::BinaryVal,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Column::Bool(c) => c.len(),
            Column::Byte(c) => c.len(),
            Column::I16(c) => c.len(),
            Column::I32(c) => c.len(),
            Column::I64(c) => c.len(),
            Column::Double(c) => c.len(),
            Column::String(c) => c.len(),
            Column::Binary(c) => c.len(),
        }
    }

    /// Check if the column holds no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at row `index`, honoring the null bitmap
    pub fn value(&self, index: usize) -> Option<Value> {
        match self {
            Column::Bool(c) => c.value_with(index, |v| Value::Boolean(*v)),
            Column::Byte(c) => c.value_with(index, |v| Value::TinyInt(*v)),
            Column::I16(c) => c.value_with(index, |v| Value::SmallInt(*v)),
            Column::I32(c) => c.value_with(index, |v| Value::Int(*v)),
            Column::I64(c) => c.value_with(index, |v| Value::BigInt(*v)),
            Column::Double(c) => c.value_with(index, |v| Value::Double(*v)),
            Column::String(c) => c.value_with(index, |v| Value::String(v.clone())),
            Column::Binary(c) => c.value_with(index, |v| Value::Binary(v.clone())),
        }
    }

    /// Every value in row order
    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.value(i)).collect()
    }

    fn write_values(&self, buf: &mut WriteBuffer) -> Result<()> {
        match self {
            Column::Bool(c) => write_typed(buf, ThriftType::Bool, c, |b, v| {
                b.write_bool(*v);
                Ok(())
            }),
            Column::Byte(c) => write_typed(buf, ThriftType::Byte, c, |b, v| {
                b.write_i8(*v);
                Ok(())
            }),
            Column::I16(c) => write_typed(buf, ThriftType::I16, c, |b, v| {
                b.write_i16(*v);
                Ok(())
            }),
            Column::I32(c) => write_typed(buf, ThriftType::I32, c, |b, v| {
                b.write_i32(*v);
                Ok(())
            }),
            Column::I64(c) => write_typed(buf, ThriftType::I64, c, |b, v| {
                b.write_i64(*v);
                Ok(())
            }),
            Column::Double(c) => write_typed(buf, ThriftType::Double, c, |b, v| {
                b.write_f64(*v);
                Ok(())
            }),
            Column::String(c) => write_typed(buf, ThriftType::String, c, |b, v| b.write_string(v)),
            Column::Binary(c) => write_typed(buf, ThriftType::String, c, |b, v| b.write_binary(v)),
        }
    }
}

impl ThriftStruct for Column {
    const NAME: &'static str = "TColumn";

    fn write(&self, buf: &mut WriteBuffer) -> Result<()> {
        write_field_begin(buf, ThriftType::Struct, self.field().field_id());
        self.write_values(buf)?;
        write_field_stop(buf);
        Ok(())
    }

    fn read(buf: &mut ReadBuffer) -> Result<Self> {
        let mut column = None;
        while let Some((field_type, id)) = read_field_begin(buf)? {
            if field_type != ThriftType::Struct {
                skip(buf, field_type)?;
                continue;
            }
            column = match id {
                1 => Some(Column::Bool(read_typed(buf, ThriftType::Bool, |b| b.read_bool())?)),
                2 => Some(Column::Byte(read_typed(buf, ThriftType::Byte, |b| b.read_i8())?)),
                3 => Some(Column::I16(read_typed(buf, ThriftType::I16, |b| b.read_i16())?)),
                4 => Some(Column::I32(read_typed(buf, ThriftType::I32, |b| b.read_i32())?)),
                5 => Some(Column::I64(read_typed(buf, ThriftType::I64, |b| b.read_i64())?)),
                6 => Some(Column::Double(read_typed(buf, ThriftType::Double, |b| b.read_f64())?)),
                7 => Some(Column::String(read_typed(buf, ThriftType::String, |b| b.read_string())?)),
                8 => Some(Column::Binary(read_typed(buf, ThriftType::String, |b| b.read_binary())?)),
                _ => {
                    skip(buf, field_type)?;
                    column
                }
            };
        }
        required(column, Self::NAME, "value")
    }
}

/// Write the `{1: list<T> values, 2: binary nulls}` body of a column arm
fn write_typed<T>(
    buf: &mut WriteBuffer,
    element_type: ThriftType,
    column: &TypedColumn<T>,
    mut write_element: impl FnMut(&mut WriteBuffer, &T) -> Result<()>,
) -> Result<()> {
    write_field_begin(buf, ThriftType::List, 1);
    write_list_begin(buf, element_type, column.values.len())?;
    for value in &column.values {
        write_element(buf, value)?;
    }
    write_binary_field(buf, 2, &column.nulls)?;
    write_field_stop(buf);
    Ok(())
}

fn read_typed<T>(
    buf: &mut ReadBuffer,
    element_type: ThriftType,
    mut read_element: impl FnMut(&mut ReadBuffer) -> Result<T>,
) -> Result<TypedColumn<T>> {
    let mut values = None;
    let mut nulls = Bytes::new();
    while let Some((field_type, id)) = read_field_begin(buf)? {
        match (id, field_type) {
            (1, ThriftType::List) => {
                values = Some(read_list(buf, element_type, &mut read_element)?)
            }
            (2, ThriftType::String) => nulls = buf.read_binary()?,
            _ => skip(buf, field_type)?,
        }
    }
    Ok(TypedColumn {
        values: required(values, "TColumnValues", "values")?,
        nulls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_bitmap() {
        let column = TypedColumn::with_nulls(
            vec![1, 0, 3, 0, 0, 0, 0, 0, 0, 0],
            vec![0b0000_0010u8, 0b0000_0010],
        );
        assert!(!column.is_null(0));
        assert!(column.is_null(1));
        assert!(!column.is_null(8));
        assert!(column.is_null(9));
        // bitmap shorter than the column
        assert!(!column.is_null(20));
    }

    #[test]
    fn test_column_value_honors_nulls() {
        let column = Column::I32(TypedColumn::with_nulls(vec![10, 0, 30], vec![0b010u8]));
        assert_eq!(column.value(0), Some(Value::Int(10)));
        assert_eq!(column.value(1), Some(Value::Null));
        assert_eq!(column.value(3), None);
        assert_eq!(column.values(), vec![Value::Int(10), Value::Null, Value::Int(30)]);
    }

    #[test]
    fn test_row_set_roundtrip() {
        let row_set = RowSet::new(vec![
            Column::String(TypedColumn::new(vec!["a".to_string(), "b".to_string()])),
            Column::Bool(TypedColumn::with_nulls(vec![true, false], vec![0b10u8])),
            Column::Double(TypedColumn::new(vec![1.5, -2.0])),
            Column::Binary(TypedColumn::new(vec![Bytes::from_static(b"\x00\x01"), Bytes::new()])),
        ]);
        let mut buf = WriteBuffer::new();
        row_set.write(&mut buf).unwrap();
        let parsed = RowSet::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed, row_set);
        assert_eq!(parsed.row_count(), 2);
    }

    #[test]
    fn test_column_field() {
        assert_eq!(Column::I16(TypedColumn::new(vec![1])).field(), ColumnField::I16Val);
        assert_eq!(Column::String(TypedColumn::default()).field(), ColumnField::StringVal);
    }

    #[test]
    fn test_fetch_results_req_fields() {
        use crate::constants::OperationType;
        use crate::messages::HandleIdentifier;

        let handle = OperationHandle::new(HandleIdentifier::default(), OperationType::GetSchemas, true);
        let req = FetchResultsReq::next(handle, 1000);
        let mut buf = WriteBuffer::new();
        req.write(&mut buf).unwrap();
        let parsed = FetchResultsReq::read(&mut ReadBuffer::from_slice(buf.as_slice())).unwrap();
        assert_eq!(parsed.orientation, FetchOrientation::Next);
        assert_eq!(parsed.max_rows, 1000);
        assert_eq!(parsed, req);
    }
}
