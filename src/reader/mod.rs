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

//! Arrow reader over query rows.
//!
//! Decoded rows are accumulated into Arrow arrays, `batch_size` rows per
//! record batch. The underlying operation is closed exactly once: when the
//! rows are exhausted, on the first error, or when the reader is dropped.
//! The reader holds the connection open until then and fetches under the
//! connection lock.

use crate::connection::{close_if_last, lock};
use crate::error::{HiveError, HiveResult};
use crate::metadata::type_mapping::arrow_type_of;
use crate::result::schema::TableSchema;
use crate::result::value::Value;
use crate::sql::rows::Rows;
use crate::sql::Conn;
use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Float64Builder, Int16Builder, Int32Builder, Int64Builder,
    Int8Builder, NullBuilder, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions, RecordBatchReader};
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Arrow schema of a result set.
pub fn arrow_schema_of(schema: &TableSchema) -> Schema {
    Schema::new(
        schema
            .columns
            .iter()
            .map(|c| Field::new(&c.name, arrow_type_of(c), !c.not_null))
            .collect::<Vec<_>>(),
    )
}

/// Builds one Arrow column from decoded values.
enum ColumnBuilder {
    Null(NullBuilder),
    Boolean(BooleanBuilder),
    Int8(Int8Builder),
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Timestamp(TimestampMicrosecondBuilder),
    Binary(BinaryBuilder),
    Utf8(StringBuilder),
}

impl ColumnBuilder {
    fn new(data_type: &DataType, capacity: usize) -> Self {
        match data_type {
            DataType::Null => Self::Null(NullBuilder::new()),
            DataType::Boolean => Self::Boolean(BooleanBuilder::with_capacity(capacity)),
            DataType::Int8 => Self::Int8(Int8Builder::with_capacity(capacity)),
            DataType::Int16 => Self::Int16(Int16Builder::with_capacity(capacity)),
            DataType::Int32 => Self::Int32(Int32Builder::with_capacity(capacity)),
            DataType::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
            DataType::Float64 => Self::Float64(Float64Builder::with_capacity(capacity)),
            DataType::Timestamp(TimeUnit::Microsecond, tz) => Self::Timestamp(
                TimestampMicrosecondBuilder::with_capacity(capacity).with_timezone_opt(tz.clone()),
            ),
            DataType::Binary => Self::Binary(BinaryBuilder::with_capacity(capacity, 0)),
            _ => Self::Utf8(StringBuilder::with_capacity(capacity, 0)),
        }
    }

    fn append(&mut self, value: &Value) -> HiveResult<()> {
        match (self, value) {
            (Self::Null(b), Value::Null) => b.append_null(),
            (Self::Boolean(b), Value::Null) => b.append_null(),
            (Self::Int8(b), Value::Null) => b.append_null(),
            (Self::Int16(b), Value::Null) => b.append_null(),
            (Self::Int32(b), Value::Null) => b.append_null(),
            (Self::Int64(b), Value::Null) => b.append_null(),
            (Self::Float64(b), Value::Null) => b.append_null(),
            (Self::Timestamp(b), Value::Null) => b.append_null(),
            (Self::Binary(b), Value::Null) => b.append_null(),
            (Self::Utf8(b), Value::Null) => b.append_null(),
            (Self::Boolean(b), Value::Bool(v)) => b.append_value(*v),
            (Self::Int8(b), Value::Int8(v)) => b.append_value(*v),
            (Self::Int16(b), Value::Int16(v)) => b.append_value(*v),
            (Self::Int32(b), Value::Int32(v)) => b.append_value(*v),
            (Self::Int64(b), Value::Int64(v)) => b.append_value(*v),
            (Self::Float64(b), Value::Float64(v)) => b.append_value(*v),
            (Self::Timestamp(b), Value::DateTime(t)) => b.append_value(t.timestamp_micros()),
            (Self::Binary(b), Value::Bytes(v)) => b.append_value(v),
            (Self::Binary(b), Value::String(v)) => b.append_value(v.as_bytes()),
            (Self::Utf8(b), Value::String(v)) => b.append_value(v),
            (Self::Utf8(b), other) => b.append_value(other.to_string()),
            (_, other) => {
                return Err(HiveError::Decode(format!(
                    "unexpected value {other:?} for column"
                )))
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Null(b) => Arc::new(b.finish()),
            Self::Boolean(b) => Arc::new(b.finish()),
            Self::Int8(b) => Arc::new(b.finish()),
            Self::Int16(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
            Self::Binary(b) => Arc::new(b.finish()),
            Self::Utf8(b) => Arc::new(b.finish()),
        }
    }
}

/// `RecordBatchReader` over the rows of one query.
#[derive(Debug)]
pub struct RowsReader {
    rows: Option<Rows>,
    schema: SchemaRef,
    conn: Arc<Mutex<Conn>>,
    runtime: Arc<Runtime>,
    batch_size: usize,
}

impl RowsReader {
    pub fn new(
        rows: Rows,
        conn: Arc<Mutex<Conn>>,
        runtime: Arc<Runtime>,
        batch_size: usize,
    ) -> Self {
        Self {
            schema: Arc::new(arrow_schema_of(rows.schema())),
            rows: Some(rows),
            conn,
            runtime,
            batch_size: batch_size.max(1),
        }
    }

    fn read_batch(&mut self) -> HiveResult<Option<RecordBatch>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };

        let mut builders: Vec<ColumnBuilder> = self
            .schema
            .fields()
            .iter()
            .map(|f| ColumnBuilder::new(f.data_type(), self.batch_size))
            .collect();
        let mut row = vec![Value::Null; builders.len()];
        let mut count = 0;
        let mut exhausted = false;

        {
            let _conn = lock(&self.conn)?;
            while count < self.batch_size {
                if !self.runtime.block_on(rows.next(&mut row))? {
                    exhausted = true;
                    break;
                }
                for (builder, value) in builders.iter_mut().zip(&row) {
                    builder.append(value)?;
                }
                count += 1;
            }
        }

        if exhausted {
            self.close()?;
        }
        if count == 0 {
            return Ok(None);
        }

        debug!("read batch of {} rows", count);
        let columns: Vec<ArrayRef> = builders.iter_mut().map(ColumnBuilder::finish).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(count));
        RecordBatch::try_new_with_options(self.schema.clone(), columns, &options)
            .map(Some)
            .map_err(|e| HiveError::Decode(e.to_string()))
    }

    /// Closes the underlying operation. Later calls are no-ops.
    pub fn close(&mut self) -> HiveResult<()> {
        match self.rows.take() {
            Some(mut rows) => {
                let _conn = lock(&self.conn)?;
                self.runtime.block_on(rows.close())
            }
            None => Ok(()),
        }
    }
}

impl Iterator for RowsReader {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => {
                if let Err(close_err) = self.close() {
                    warn!("failed to close operation after read error: {}", close_err);
                }
                Some(Err(ArrowError::ExternalError(Box::new(e))))
            }
        }
    }
}

impl RecordBatchReader for RowsReader {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

impl Drop for RowsReader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close operation: {}", e);
        }
        close_if_last(&self.conn, &self.runtime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::schema::{ColumnDesc, ScanType};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_arrow_schema_of() {
        let schema = TableSchema::new(vec![
            ColumnDesc::new("id", "BIGINT", ScanType::Int64),
            ColumnDesc::new("ts", "TIMESTAMP", ScanType::DateTime),
            ColumnDesc::new("price", "DECIMAL", ScanType::String).with_precision_scale(9, 2),
        ]);
        let arrow = arrow_schema_of(&schema);
        assert_eq!(arrow.field(0).data_type(), &DataType::Int64);
        assert!(arrow.field(0).is_nullable());
        assert_eq!(
            arrow.field(1).data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(arrow.field(2).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_column_builder_timestamp() {
        let data_type = DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()));
        let mut builder = ColumnBuilder::new(&data_type, 2);
        let t = Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap();
        builder.append(&Value::DateTime(t)).unwrap();
        builder.append(&Value::Null).unwrap();
        let array = builder.finish();
        assert_eq!(array.data_type(), &data_type);
        assert_eq!(array.len(), 2);
        assert_eq!(array.null_count(), 1);
    }

    #[test]
    fn test_column_builder_rejects_mismatch() {
        let mut builder = ColumnBuilder::new(&DataType::Int32, 1);
        assert!(builder.append(&Value::String("x".into())).is_err());
    }

    #[test]
    fn test_column_builder_utf8_formats_other_values() {
        let mut builder = ColumnBuilder::new(&DataType::Utf8, 1);
        builder.append(&Value::Int64(5)).unwrap();
        let array = builder.finish();
        let strings = array
            .as_any()
            .downcast_ref::<arrow_array::StringArray>()
            .unwrap();
        assert_eq!(strings.value(0), "5");
    }
}
