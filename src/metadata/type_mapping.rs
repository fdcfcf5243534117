// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HiveServer2 type → scan type / Arrow type mapping.
//!
//! Scan types describe the values a column carries; the Arrow type follows
//! what the decoder actually produces for the column.

use crate::result::schema::{ColumnDesc, ScanType};
use crate::types::hs2::{TTypeEntry, TTypeId};
use arrow_schema::{DataType, TimeUnit};

/// Map a primitive type id to its scan type.
pub fn scan_type_of(type_id: TTypeId) -> ScanType {
    match type_id {
        TTypeId::Boolean => ScanType::Bool,
        TTypeId::TinyInt => ScanType::Int8,
        TTypeId::SmallInt => ScanType::Int16,
        TTypeId::Int => ScanType::Int32,
        TTypeId::BigInt => ScanType::Int64,
        TTypeId::Float | TTypeId::Double => ScanType::Float64,
        TTypeId::Null => ScanType::Null,
        TTypeId::String | TTypeId::Char | TTypeId::Varchar => ScanType::String,
        // decimals are not parsed client-side
        TTypeId::Decimal => ScanType::String,
        TTypeId::Date | TTypeId::Timestamp => ScanType::DateTime,
        TTypeId::Binary | TTypeId::Array | TTypeId::Struct | TTypeId::Map | TTypeId::Union => {
            ScanType::RawBytes
        }
        TTypeId::UserDefined | TTypeId::IntervalYearMonth | TTypeId::IntervalDayTime => {
            ScanType::Unknown
        }
    }
}

/// Database type name of a primitive type id, e.g. `VARCHAR` for `VARCHAR_TYPE`.
pub fn database_type_name(type_id: TTypeId) -> String {
    let name = type_id.to_string();
    name.strip_suffix("_TYPE").unwrap_or(&name).to_string()
}

/// Database type name and scan type of a column's top-level type entry.
pub fn describe_type(entry: &TTypeEntry) -> (String, ScanType) {
    match entry {
        TTypeEntry::Primitive(p) => (database_type_name(p.type_id), scan_type_of(p.type_id)),
        TTypeEntry::Array => (database_type_name(TTypeId::Array), ScanType::RawBytes),
        TTypeEntry::Map => (database_type_name(TTypeId::Map), ScanType::RawBytes),
        TTypeEntry::Struct => (database_type_name(TTypeId::Struct), ScanType::RawBytes),
        TTypeEntry::Union => (database_type_name(TTypeId::Union), ScanType::RawBytes),
        TTypeEntry::UserDefined(name) => (name.clone(), ScanType::Unknown),
    }
}

/// Arrow type of the values decoded for `column`.
pub fn arrow_type_of(column: &ColumnDesc) -> DataType {
    match column.value_type {
        ScanType::Bool => DataType::Boolean,
        ScanType::Int8 => DataType::Int8,
        ScanType::Int16 => DataType::Int16,
        ScanType::Int32 => DataType::Int32,
        ScanType::Int64 => DataType::Int64,
        ScanType::Float64 => DataType::Float64,
        ScanType::DateTime => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        ScanType::RawBytes => DataType::Binary,
        ScanType::Null => DataType::Null,
        ScanType::String | ScanType::Unknown => DataType::Utf8,
    }
}
