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

//! Column metadata of a result set.

use std::fmt;

/// Runtime kind of the values a column produces.
///
/// Resolved once per column when the result set metadata is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Null,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float64,
    String,
    DateTime,
    RawBytes,
    /// Fully dynamic: user-defined and unknown types.
    Unknown,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanType::Null => "null",
            ScanType::Bool => "bool",
            ScanType::Int8 => "int8",
            ScanType::Int16 => "int16",
            ScanType::Int32 => "int32",
            ScanType::Int64 => "int64",
            ScanType::Float64 => "float64",
            ScanType::String => "string",
            ScanType::DateTime => "datetime",
            ScanType::RawBytes => "bytes",
            ScanType::Unknown => "any",
        };
        f.write_str(name)
    }
}

/// The kind of value the decoder produces for a database type name.
///
/// Types without a dedicated typed array (DECIMAL, DATE, complex types, ...)
/// arrive as strings.
pub fn decoded_type(database_type_name: &str) -> ScanType {
    match database_type_name {
        "TINYINT" => ScanType::Int8,
        "SMALLINT" => ScanType::Int16,
        "INT" => ScanType::Int32,
        "BIGINT" => ScanType::Int64,
        "BOOLEAN" => ScanType::Bool,
        "FLOAT" | "DOUBLE" => ScanType::Float64,
        "TIMESTAMP" | "DATETIME" => ScanType::DateTime,
        _ => ScanType::String,
    }
}

/// Metadata of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    pub name: String,
    pub database_type_name: String,
    pub scan_type: ScanType,
    /// What [`ResultSet::next`](super::ResultSet::next) yields for this column.
    pub value_type: ScanType,

    // Impala columns are always nullable, except some Kudu columns
    pub not_null: bool,

    pub length: i64,
    pub has_length: bool,

    pub precision: i64,
    pub scale: i64,
    pub has_precision_scale: bool,
}

impl ColumnDesc {
    pub fn new(
        name: impl Into<String>,
        database_type_name: impl Into<String>,
        scan_type: ScanType,
    ) -> Self {
        let database_type_name = database_type_name.into();
        Self {
            name: name.into(),
            value_type: decoded_type(&database_type_name),
            database_type_name,
            scan_type,
            not_null: false,
            length: 0,
            has_length: false,
            precision: 0,
            scale: 0,
            has_precision_scale: false,
        }
    }

    /// An unnamed STRING column, used by the fixed catalog result shapes.
    pub fn string() -> Self {
        Self::new("", "STRING", ScanType::String)
    }

    pub fn with_length(mut self, length: i64) -> Self {
        self.length = length;
        self.has_length = true;
        self
    }

    pub fn with_precision_scale(mut self, precision: i64, scale: i64) -> Self {
        self.precision = precision;
        self.scale = scale;
        self.has_precision_scale = true;
        self
    }
}

/// Column metadata of one operation's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDesc>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDesc>) -> Self {
        Self { columns }
    }

    /// A schema of `n` string columns.
    pub fn strings(n: usize) -> Self {
        Self {
            columns: vec![ColumnDesc::string(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_type() {
        assert_eq!(decoded_type("VARCHAR"), ScanType::String);
        assert_eq!(decoded_type("TINYINT"), ScanType::Int8);
        assert_eq!(decoded_type("DATETIME"), ScanType::DateTime);
        assert_eq!(decoded_type("DECIMAL"), ScanType::String);
        assert_eq!(decoded_type("DATE"), ScanType::String);
    }

    #[test]
    fn test_column_desc_value_type_follows_database_type() {
        let col = ColumnDesc::new("d", "DECIMAL", ScanType::String).with_precision_scale(10, 2);
        assert_eq!(col.value_type, ScanType::String);
        assert!(col.has_precision_scale);
        assert!(!col.has_length);
        assert!(!col.not_null);
    }

    #[test]
    fn test_strings_schema() {
        let schema = TableSchema::strings(4);
        assert_eq!(schema.len(), 4);
        assert!(schema
            .columns
            .iter()
            .all(|c| c.database_type_name == "STRING"));
    }
}
