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

//! Statement implementation for the Impala ADBC driver.

use crate::connection::{close_if_last, lock};
use crate::context::Context;
use crate::error::{HiveError, HiveResult, ImpalaErrorHelper};
use crate::reader::{arrow_schema_of, RowsReader};
use crate::result::value::Value;
use crate::sql::statement::{NamedValue, Stmt};
use crate::sql::Conn;
use adbc_core::error::Result;
use adbc_core::options::{OptionStatement, OptionValue};
use adbc_core::Optionable;
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, RecordBatch, RecordBatchReader};
use arrow_schema::{DataType, Schema, TimeUnit};
use chrono::{DateTime, NaiveDate, Utc};
use driverbase::error::ErrorHelper;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Client-side deadline for each execution, in milliseconds.
pub const OPTION_TIMEOUT_MS: &str = "impala.statement.timeout_ms";

/// Represents a SQL statement that can be executed against Impala.
///
/// A Statement is created from a Connection and shares its session.
/// Parameters are substituted client-side: `?` placeholders bind by
/// position, `@name` markers bind by the name of the bound column.
#[derive(Debug)]
pub struct Statement {
    conn: Arc<Mutex<Conn>>,
    runtime: Arc<Runtime>,
    conn_cancel: Arc<Mutex<CancellationToken>>,
    // Token of the latest execution, cancelled by `cancel`.
    token: Option<CancellationToken>,
    query: Option<String>,
    prepared: Option<Stmt>,
    bound: Vec<Vec<NamedValue>>,
    timeout: Option<Duration>,
    batch_size: usize,
}

impl Statement {
    pub(crate) fn new(
        conn: Arc<Mutex<Conn>>,
        runtime: Arc<Runtime>,
        conn_cancel: Arc<Mutex<CancellationToken>>,
        batch_size: usize,
    ) -> Self {
        Self {
            conn,
            runtime,
            conn_cancel,
            token: None,
            query: None,
            prepared: None,
            bound: Vec::new(),
            timeout: None,
            batch_size,
        }
    }

    /// Returns the current SQL query.
    pub fn sql_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Binds parameter values directly, one row.
    pub fn bind_values(&mut self, values: Vec<NamedValue>) {
        self.bound = vec![values];
    }

    fn sql(&self) -> HiveResult<&str> {
        self.query
            .as_deref()
            .ok_or_else(|| HiveError::InvalidState("no SQL query set".to_string()))
    }

    /// A context for one execution: cancelled by this statement, by its
    /// connection, or by the statement timeout.
    fn context(&mut self) -> HiveResult<Context> {
        let token = lock(&self.conn_cancel)?.child_token();
        self.token = Some(token.clone());
        let ctx = Context::from_token(token);
        Ok(match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        })
    }

    fn single_row(&self) -> HiveResult<Vec<NamedValue>> {
        match self.bound.as_slice() {
            [] => Ok(Vec::new()),
            [row] => Ok(row.clone()),
            rows => Err(HiveError::InvalidArgument(format!(
                "a query takes one row of parameters, got {}",
                rows.len()
            ))),
        }
    }

    fn query_rows(&mut self) -> HiveResult<crate::sql::rows::Rows> {
        let args = self.single_row()?;
        let ctx = self.context()?;
        let mut conn = lock(&self.conn)?;
        self.runtime.block_on(async {
            match &self.prepared {
                Some(stmt) => conn.query_stmt(&ctx, stmt, &args).await,
                None => conn.query(&ctx, self.sql()?, &args).await,
            }
        })
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        close_if_last(&self.conn, &self.runtime);
    }
}

/// Converts bound Arrow rows into parameter values.
///
/// Columns whose field name is empty or numeric (optionally prefixed with
/// `$` or `?`) bind by position; any other name binds `@name`.
pub(crate) fn bound_rows(batch: &RecordBatch) -> HiveResult<Vec<Vec<NamedValue>>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let mut values = Vec::with_capacity(batch.num_columns());
        for (i, (field, column)) in schema.fields().iter().zip(batch.columns()).enumerate() {
            let value = value_at(column.as_ref(), row)?;
            values.push(if is_positional(field.name()) {
                NamedValue::positional(i + 1, value)
            } else {
                NamedValue::named(field.name().trim_start_matches('@'), value)
            });
        }
        rows.push(values);
    }
    Ok(rows)
}

fn is_positional(name: &str) -> bool {
    let digits = name.trim_start_matches(['$', '?']);
    digits.chars().all(|c| c.is_ascii_digit())
}

fn value_at(array: &dyn Array, row: usize) -> HiveResult<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Value::Int8(array.as_primitive::<Int8Type>().value(row)),
        DataType::Int16 => Value::Int16(array.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Value::Int32(array.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Value::Int64(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Int64(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Int64(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Int64(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            Value::Int64(i64::try_from(v).map_err(|_| {
                HiveError::InvalidArgument(format!("parameter {v} overflows BIGINT"))
            })?)
        }
        DataType::Float32 => Value::Float64(array.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float64(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Binary => Value::Bytes(array.as_binary::<i32>().value(row).to_vec()),
        DataType::LargeBinary => Value::Bytes(array.as_binary::<i64>().value(row).to_vec()),
        DataType::Date32 => {
            let days = array.as_primitive::<Date32Type>().value(row);
            let date = days
                .checked_add(EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| HiveError::InvalidArgument(format!("date out of range: {days}")))?;
            Value::String(date.format("%Y-%m-%d").to_string())
        }
        DataType::Timestamp(unit, _) => Value::DateTime(timestamp_at(array, *unit, row)?),
        other => {
            return Err(HiveError::InvalidArgument(format!(
                "unsupported parameter type {other}"
            )))
        }
    };
    Ok(value)
}

// Days from 0001-01-01 to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn timestamp_at(array: &dyn Array, unit: TimeUnit, row: usize) -> HiveResult<DateTime<Utc>> {
    let t = match unit {
        TimeUnit::Second => {
            DateTime::from_timestamp(array.as_primitive::<TimestampSecondType>().value(row), 0)
        }
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(
            array.as_primitive::<TimestampMillisecondType>().value(row),
        ),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(
            array.as_primitive::<TimestampMicrosecondType>().value(row),
        ),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
            array.as_primitive::<TimestampNanosecondType>().value(row),
        )),
    };
    t.ok_or_else(|| HiveError::InvalidArgument("timestamp out of range".to_string()))
}

impl Optionable for Statement {
    type Option = OptionStatement;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        match key {
            OptionStatement::Other(ref s) if s == OPTION_TIMEOUT_MS => {
                let ms = match value {
                    OptionValue::String(ref v) => v.parse::<u64>().ok(),
                    OptionValue::Int(v) => u64::try_from(v).ok(),
                    _ => None,
                };
                match ms {
                    Some(0) => {
                        self.timeout = None;
                        Ok(())
                    }
                    Some(ms) => {
                        self.timeout = Some(Duration::from_millis(ms));
                        Ok(())
                    }
                    None => Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc()),
                }
            }
            _ => Err(ImpalaErrorHelper::set_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        match key {
            OptionStatement::Other(ref s) if s == OPTION_TIMEOUT_MS => Ok(self
                .timeout
                .map_or(0, |t| i64::try_from(t.as_millis()).unwrap_or(i64::MAX))),
            _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }
}

impl adbc_core::Statement for Statement {
    fn set_sql_query(&mut self, query: impl AsRef<str>) -> Result<()> {
        self.query = Some(query.as_ref().to_string());
        self.prepared = None;
        Ok(())
    }

    fn set_substrait_plan(&mut self, _plan: impl AsRef<[u8]>) -> Result<()> {
        Err(ImpalaErrorHelper::not_implemented()
            .message("Substrait plans")
            .to_adbc())
    }

    fn prepare(&mut self) -> Result<()> {
        let ctx = self.context()?;
        let query = self.sql()?.to_string();
        let mut conn = lock(&self.conn)?;
        let stmt = self.runtime.block_on(conn.prepare(&ctx, &query))?;
        debug!("prepared: {}", stmt.query());
        self.prepared = Some(stmt);
        Ok(())
    }

    fn get_parameter_schema(&self) -> Result<Schema> {
        Err(ImpalaErrorHelper::not_implemented()
            .message("get_parameter_schema")
            .to_adbc())
    }

    fn bind(&mut self, batch: RecordBatch) -> Result<()> {
        self.bound = bound_rows(&batch)?;
        Ok(())
    }

    fn bind_stream(&mut self, stream: Box<dyn RecordBatchReader + Send>) -> Result<()> {
        let mut bound = Vec::new();
        for batch in stream {
            let batch = batch.map_err(|e| {
                ImpalaErrorHelper::invalid_argument()
                    .message(format!("bind stream: {}", e))
                    .to_adbc()
            })?;
            bound.extend(bound_rows(&batch)?);
        }
        self.bound = bound;
        Ok(())
    }

    fn execute(&mut self) -> Result<impl RecordBatchReader + Send> {
        let rows = self.query_rows()?;
        Ok(RowsReader::new(
            rows,
            self.conn.clone(),
            self.runtime.clone(),
            self.batch_size,
        ))
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        let ctx = self.context()?;
        let rows = if self.bound.is_empty() {
            vec![Vec::new()]
        } else {
            self.bound.clone()
        };

        let mut conn = lock(&self.conn)?;
        let mut total = Some(0);
        for args in &rows {
            let result = self.runtime.block_on(async {
                match &self.prepared {
                    Some(stmt) => conn.exec_stmt(&ctx, stmt, args).await,
                    None => conn.exec(&ctx, self.sql()?, args).await,
                }
            })?;
            total = match (total, result.rows_affected) {
                (Some(sum), Some(n)) => sum.checked_add(n),
                _ => None,
            };
        }
        Ok(total)
    }

    fn execute_schema(&mut self) -> Result<Schema> {
        let mut rows = self.query_rows()?;
        let schema = arrow_schema_of(rows.schema());
        self.runtime.block_on(rows.close())?;
        Ok(schema)
    }

    fn execute_partitions(&mut self) -> Result<adbc_core::PartitionedResult> {
        Err(ImpalaErrorHelper::not_implemented()
            .message("execute_partitions")
            .to_adbc())
    }

    fn cancel(&mut self) -> Result<()> {
        if let Some(token) = &self.token {
            token.cancel();
        }
        Ok(())
    }
}
