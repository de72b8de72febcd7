//! Column type dispatch
//!
//! Result sets arrive column-major. Each column is a Thrift union whose active
//! arm depends on the column's primitive type; this module maps a type id from
//! the result metadata to the union arm that carries its values.

use crate::constants::TypeId;

/// Value field of the `TColumn` union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnField {
    /// `boolVal` (field 1)
    BoolVal,
    /// `byteVal` (field 2)
    ByteVal,
    /// `i16Val` (field 3)
    I16Val,
    /// `i32Val` (field 4)
    I32Val,
    /// `i64Val` (field 5)
    I64Val,
    /// `doubleVal` (field 6)
    DoubleVal,
    /// `stringVal` (field 7)
    StringVal,
    /// `binaryVal` (field 8)
    BinaryVal,
}

impl ColumnField {
    /// Thrift field name of the union arm
    pub fn name(&self) -> &'static str {
        match self {
            ColumnField::BoolVal => "boolVal",
            ColumnField::ByteVal => "byteVal",
            ColumnField::I16Val => "i16Val",
            ColumnField::I32Val => "i32Val",
            ColumnField::I64Val => "i64Val",
            ColumnField::DoubleVal => "doubleVal",
            ColumnField::StringVal => "stringVal",
            ColumnField::BinaryVal => "binaryVal",
        }
    }

    /// Thrift field id of the union arm
    pub fn field_id(&self) -> i16 {
        match self {
            ColumnField::BoolVal => 1,
            ColumnField::ByteVal => 2,
            ColumnField::I16Val => 3,
            ColumnField::I32Val => 4,
            ColumnField::I64Val => 5,
            ColumnField::DoubleVal => 6,
            ColumnField::StringVal => 7,
            ColumnField::BinaryVal => 8,
        }
    }
}

impl std::fmt::Display for ColumnField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the value field for a primitive type
///
/// Temporal, decimal, interval and complex types are delivered as text.
pub fn column_field(type_id: TypeId) -> Option<ColumnField> {
    match type_id {
        TypeId::Boolean => Some(ColumnField::BoolVal),
        TypeId::TinyInt => Some(ColumnField::ByteVal),
        TypeId::SmallInt => Some(ColumnField::I16Val),
        TypeId::Int => Some(ColumnField::I32Val),
        TypeId::BigInt | TypeId::Timestamp => Some(ColumnField::I64Val),
        TypeId::Float | TypeId::Double => Some(ColumnField::DoubleVal),
        TypeId::String
        | TypeId::Binary
        | TypeId::Array
        | TypeId::Map
        | TypeId::Struct
        | TypeId::Union
        | TypeId::UserDefined
        | TypeId::Decimal
        | TypeId::Null
        | TypeId::Date
        | TypeId::Varchar
        | TypeId::Char
        | TypeId::IntervalYearMonth
        | TypeId::IntervalDayTime => Some(ColumnField::StringVal),
    }
}

/// Resolve the value field for a raw wire type id
///
/// Ids outside [`TypeId`] (such as `TIMESTAMP WITH LOCAL TIME ZONE`) have no mapping.
pub fn column_field_for_id(type_id: i32) -> Option<ColumnField> {
    TypeId::from_i32(type_id).and_then(column_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types() {
        assert_eq!(column_field(TypeId::Boolean), Some(ColumnField::BoolVal));
        assert_eq!(column_field(TypeId::TinyInt), Some(ColumnField::ByteVal));
        assert_eq!(column_field(TypeId::SmallInt), Some(ColumnField::I16Val));
        assert_eq!(column_field(TypeId::Int), Some(ColumnField::I32Val));
        assert_eq!(column_field(TypeId::BigInt), Some(ColumnField::I64Val));
        assert_eq!(column_field(TypeId::Float), Some(ColumnField::DoubleVal));
        assert_eq!(column_field(TypeId::Double), Some(ColumnField::DoubleVal));
    }

    #[test]
    fn test_timestamp_is_i64() {
        assert_eq!(column_field(TypeId::Timestamp), Some(ColumnField::I64Val));
    }

    #[test]
    fn test_text_types() {
        for type_id in [
            TypeId::String,
            TypeId::Binary,
            TypeId::Decimal,
            TypeId::Date,
            TypeId::Varchar,
            TypeId::Char,
            TypeId::Array,
            TypeId::Map,
            TypeId::Struct,
            TypeId::IntervalDayTime,
        ] {
            assert_eq!(column_field(type_id), Some(ColumnField::StringVal), "{:?}", type_id);
        }
    }

    #[test]
    fn test_every_id_below_22_resolves() {
        for id in 0..22 {
            assert!(column_field_for_id(id).is_some(), "type id {}", id);
        }
        assert_eq!(column_field_for_id(22), None);
        assert_eq!(column_field_for_id(-1), None);
        assert_eq!(column_field_for_id(99), None);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(ColumnField::I16Val.name(), "i16Val");
        assert_eq!(ColumnField::StringVal.to_string(), "stringVal");
        assert_eq!(ColumnField::BinaryVal.field_id(), 8);
    }
}
