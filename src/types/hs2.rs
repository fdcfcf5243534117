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

//! HiveServer2 (TCLIService) request/response types.
//!
//! These types mirror the structures of the HiveServer2 binary RPC protocol.
//! The on-wire encoding is owned by the [`HiveServer2Client`](crate::client::HiveServer2Client)
//! implementation; this crate only reads and writes typed fields.

use std::collections::HashMap;
use std::fmt;

/// Protocol version sent at session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TProtocolVersion {
    V1,
    V6,
    #[default]
    V7,
}

/// Status code carried by every RPC response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TStatusCode {
    #[default]
    Success,
    SuccessWithInfo,
    StillExecuting,
    Error,
    InvalidHandle,
    /// A code this client does not know about.
    Unknown(i32),
}

impl TStatusCode {
    pub fn value(&self) -> i32 {
        match self {
            TStatusCode::Success => 0,
            TStatusCode::SuccessWithInfo => 1,
            TStatusCode::StillExecuting => 2,
            TStatusCode::Error => 3,
            TStatusCode::InvalidHandle => 4,
            TStatusCode::Unknown(code) => *code,
        }
    }
}

impl From<i32> for TStatusCode {
    fn from(value: i32) -> Self {
        match value {
            0 => TStatusCode::Success,
            1 => TStatusCode::SuccessWithInfo,
            2 => TStatusCode::StillExecuting,
            3 => TStatusCode::Error,
            4 => TStatusCode::InvalidHandle,
            other => TStatusCode::Unknown(other),
        }
    }
}

impl fmt::Display for TStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TStatusCode::Success => write!(f, "SUCCESS_STATUS"),
            TStatusCode::SuccessWithInfo => write!(f, "SUCCESS_WITH_INFO_STATUS"),
            TStatusCode::StillExecuting => write!(f, "STILL_EXECUTING_STATUS"),
            TStatusCode::Error => write!(f, "ERROR_STATUS"),
            TStatusCode::InvalidHandle => write!(f, "INVALID_HANDLE_STATUS"),
            TStatusCode::Unknown(code) => write!(f, "TStatusCode({code})"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TStatus {
    pub status_code: TStatusCode,
    pub info_messages: Option<Vec<String>>,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl TStatus {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_code(status_code: TStatusCode) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: TStatusCode::Error,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

/// Server-side lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TOperationState {
    #[default]
    Initialized,
    Running,
    Finished,
    Canceled,
    Closed,
    Error,
    Unknown,
    Pending,
    TimedOut,
}

impl fmt::Display for TOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TOperationState::Initialized => "INITIALIZED_STATE",
            TOperationState::Running => "RUNNING_STATE",
            TOperationState::Finished => "FINISHED_STATE",
            TOperationState::Canceled => "CANCELED_STATE",
            TOperationState::Closed => "CLOSED_STATE",
            TOperationState::Error => "ERROR_STATE",
            TOperationState::Unknown => "UKNOWN_STATE",
            TOperationState::Pending => "PENDING_STATE",
            TOperationState::TimedOut => "TIMEDOUT_STATE",
        };
        f.write_str(name)
    }
}

/// Primitive type identifiers of the result set metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TTypeId {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Timestamp,
    Binary,
    Array,
    Map,
    Struct,
    Union,
    UserDefined,
    Decimal,
    Null,
    Date,
    Varchar,
    Char,
    IntervalYearMonth,
    IntervalDayTime,
}

impl fmt::Display for TTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TTypeId::Boolean => "BOOLEAN_TYPE",
            TTypeId::TinyInt => "TINYINT_TYPE",
            TTypeId::SmallInt => "SMALLINT_TYPE",
            TTypeId::Int => "INT_TYPE",
            TTypeId::BigInt => "BIGINT_TYPE",
            TTypeId::Float => "FLOAT_TYPE",
            TTypeId::Double => "DOUBLE_TYPE",
            TTypeId::String => "STRING_TYPE",
            TTypeId::Timestamp => "TIMESTAMP_TYPE",
            TTypeId::Binary => "BINARY_TYPE",
            TTypeId::Array => "ARRAY_TYPE",
            TTypeId::Map => "MAP_TYPE",
            TTypeId::Struct => "STRUCT_TYPE",
            TTypeId::Union => "UNION_TYPE",
            TTypeId::UserDefined => "USER_DEFINED_TYPE",
            TTypeId::Decimal => "DECIMAL_TYPE",
            TTypeId::Null => "NULL_TYPE",
            TTypeId::Date => "DATE_TYPE",
            TTypeId::Varchar => "VARCHAR_TYPE",
            TTypeId::Char => "CHAR_TYPE",
            TTypeId::IntervalYearMonth => "INTERVAL_YEAR_MONTH_TYPE",
            TTypeId::IntervalDayTime => "INTERVAL_DAY_TIME_TYPE",
        };
        f.write_str(name)
    }
}

/// Qualifier values attached to a primitive type (lengths, precision and scale).
#[derive(Debug, Clone, PartialEq)]
pub enum TTypeQualifierValue {
    I32(i32),
    String(String),
}

pub const CHARACTER_MAXIMUM_LENGTH: &str = "characterMaximumLength";
pub const PRECISION: &str = "precision";
pub const SCALE: &str = "scale";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TTypeQualifiers {
    pub qualifiers: HashMap<String, TTypeQualifierValue>,
}

impl TTypeQualifiers {
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        match self.qualifiers.get(key) {
            Some(TTypeQualifierValue::I32(v)) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TPrimitiveTypeEntry {
    pub type_id: TTypeId,
    pub type_qualifiers: Option<TTypeQualifiers>,
}

impl TPrimitiveTypeEntry {
    pub fn new(type_id: TTypeId) -> Self {
        Self {
            type_id,
            type_qualifiers: None,
        }
    }
}

/// One node of a type descriptor. Complex entries only carry their kind here:
/// values of complex columns arrive as strings.
#[derive(Debug, Clone, PartialEq)]
pub enum TTypeEntry {
    Primitive(TPrimitiveTypeEntry),
    Array,
    Map,
    Struct,
    Union,
    UserDefined(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TTypeDesc {
    pub types: Vec<TTypeEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TColumnDesc {
    pub column_name: String,
    pub type_desc: TTypeDesc,
    pub position: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TTableSchema {
    pub columns: Vec<TColumnDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct THandleIdentifier {
    pub guid: Vec<u8>,
    pub secret: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TSessionHandle {
    pub session_id: THandleIdentifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TOperationType {
    #[default]
    ExecuteStatement,
    GetTypeInfo,
    GetCatalogs,
    GetSchemas,
    GetTables,
    GetTableTypes,
    GetColumns,
    GetFunctions,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TOperationHandle {
    pub operation_id: THandleIdentifier,
    pub operation_type: TOperationType,
    pub has_result_set: bool,
    pub modified_row_count: Option<f64>,
}

/// A typed value array with its null bitmap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TTypedColumn<T> {
    pub values: Vec<T>,
    pub nulls: Vec<u8>,
}

impl<T> TTypedColumn<T> {
    pub fn new(values: Vec<T>, nulls: Vec<u8>) -> Self {
        Self { values, nulls }
    }
}

/// One column of a columnar row batch. Exactly one typed array is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TColumn {
    pub bool_val: Option<TTypedColumn<bool>>,
    pub byte_val: Option<TTypedColumn<i8>>,
    pub i16_val: Option<TTypedColumn<i16>>,
    pub i32_val: Option<TTypedColumn<i32>>,
    pub i64_val: Option<TTypedColumn<i64>>,
    pub double_val: Option<TTypedColumn<f64>>,
    pub string_val: Option<TTypedColumn<String>>,
    pub binary_val: Option<TTypedColumn<Vec<u8>>>,
}

impl TColumn {
    pub fn strings(values: Vec<String>, nulls: Vec<u8>) -> Self {
        Self {
            string_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn bytes(values: Vec<i8>, nulls: Vec<u8>) -> Self {
        Self {
            byte_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn i16s(values: Vec<i16>, nulls: Vec<u8>) -> Self {
        Self {
            i16_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn i32s(values: Vec<i32>, nulls: Vec<u8>) -> Self {
        Self {
            i32_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn i64s(values: Vec<i64>, nulls: Vec<u8>) -> Self {
        Self {
            i64_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn bools(values: Vec<bool>, nulls: Vec<u8>) -> Self {
        Self {
            bool_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }

    pub fn doubles(values: Vec<f64>, nulls: Vec<u8>) -> Self {
        Self {
            double_val: Some(TTypedColumn::new(values, nulls)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TRowSet {
    pub start_row_offset: i64,
    pub columns: Vec<TColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TFetchOrientation {
    #[default]
    FetchNext,
    FetchPrior,
    FetchRelative,
    FetchAbsolute,
    FetchFirst,
    FetchLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TGetInfoType {
    CliServerName,
    CliDbmsName,
    CliDbmsVer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TGetInfoValue {
    StringValue(String),
    SmallIntValue(i16),
    IntegerBitmask(i32),
    IntegerFlag(i32),
    BinaryValue(i32),
    LenValue(i64),
}

impl TGetInfoValue {
    pub fn string_value(&self) -> &str {
        match self {
            TGetInfoValue::StringValue(s) => s,
            _ => "",
        }
    }
}

impl Default for TGetInfoValue {
    fn default() -> Self {
        TGetInfoValue::StringValue(String::new())
    }
}

/// Any response that carries a [`TStatus`].
pub trait RpcResponse {
    fn status(&self) -> &TStatus;
}

macro_rules! rpc_response {
    ($($name:ident),* $(,)?) => {
        $(
            impl RpcResponse for $name {
                fn status(&self) -> &TStatus {
                    &self.status
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TOpenSessionReq {
    pub client_protocol: TProtocolVersion,
    pub username: Option<String>,
    pub password: Option<String>,
    pub configuration: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TOpenSessionResp {
    pub status: TStatus,
    pub server_protocol_version: TProtocolVersion,
    pub session_handle: TSessionHandle,
    pub configuration: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TCloseSessionReq {
    pub session_handle: TSessionHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TCloseSessionResp {
    pub status: TStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TGetInfoReq {
    pub session_handle: TSessionHandle,
    pub info_type: TGetInfoType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetInfoResp {
    pub status: TStatus,
    pub info_value: TGetInfoValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TExecuteStatementReq {
    pub session_handle: TSessionHandle,
    pub statement: String,
    pub conf_overlay: Option<HashMap<String, String>>,
    pub run_async: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TExecuteStatementResp {
    pub status: TStatus,
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetOperationStatusReq {
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetOperationStatusResp {
    pub status: TStatus,
    pub operation_state: TOperationState,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TFetchResultsReq {
    pub operation_handle: TOperationHandle,
    pub orientation: TFetchOrientation,
    pub max_rows: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TFetchResultsResp {
    pub status: TStatus,
    pub has_more_rows: Option<bool>,
    pub results: Option<TRowSet>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetResultSetMetadataReq {
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetResultSetMetadataResp {
    pub status: TStatus,
    pub schema: Option<TTableSchema>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TCloseOperationReq {
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TCloseOperationResp {
    pub status: TStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetTablesReq {
    pub session_handle: TSessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub table_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetTablesResp {
    pub status: TStatus,
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetColumnsReq {
    pub session_handle: TSessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetColumnsResp {
    pub status: TStatus,
    pub operation_handle: TOperationHandle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetSchemasReq {
    pub session_handle: TSessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TGetSchemasResp {
    pub status: TStatus,
    pub operation_handle: TOperationHandle,
}

rpc_response!(
    TOpenSessionResp,
    TCloseSessionResp,
    TGetInfoResp,
    TExecuteStatementResp,
    TGetOperationStatusResp,
    TFetchResultsResp,
    TGetResultSetMetadataResp,
    TCloseOperationResp,
    TGetTablesResp,
    TGetColumnsResp,
    TGetSchemasResp,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_from_i32() {
        assert_eq!(TStatusCode::from(2), TStatusCode::StillExecuting);
        assert_eq!(TStatusCode::from(42), TStatusCode::Unknown(42));
        assert_eq!(TStatusCode::Unknown(42).value(), 42);
    }

    #[test]
    fn test_type_id_display_has_type_suffix() {
        assert_eq!(TTypeId::TinyInt.to_string(), "TINYINT_TYPE");
        assert_eq!(TTypeId::UserDefined.to_string(), "USER_DEFINED_TYPE");
    }

    #[test]
    fn test_qualifiers_get_i32() {
        let mut q = TTypeQualifiers::default();
        q.qualifiers
            .insert(PRECISION.to_string(), TTypeQualifierValue::I32(10));
        q.qualifiers.insert(
            SCALE.to_string(),
            TTypeQualifierValue::String("2".to_string()),
        );
        assert_eq!(q.get_i32(PRECISION), Some(10));
        assert_eq!(q.get_i32(SCALE), None);
        assert_eq!(q.get_i32(CHARACTER_MAXIMUM_LENGTH), None);
    }
}
