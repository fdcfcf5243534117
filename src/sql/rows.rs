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

//! Rows iterator over an executed query.

use crate::client::operation::Operation;
use crate::context::Context;
use crate::error::HiveResult;
use crate::result::schema::{ScanType, TableSchema};
use crate::result::value::Value;
use crate::result::ResultSet;
use std::sync::Arc;

/// The rows of one query, with the column metadata of its result set.
///
/// Owns the operation and closes it on [`Rows::close`].
#[derive(Debug)]
pub struct Rows {
    rs: ResultSet,
    schema: Arc<TableSchema>,
    op: Option<Operation>,
    ctx: Context,
}

impl Rows {
    pub(crate) fn new(rs: ResultSet, op: Operation, ctx: Context) -> Self {
        Self {
            schema: rs.schema().clone(),
            rs,
            op: Some(op),
            ctx,
        }
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Column names, in result order.
    pub fn columns(&self) -> Vec<String> {
        self.schema.column_names()
    }

    pub fn column_type_scan_type(&self, index: usize) -> Option<ScanType> {
        self.schema.columns.get(index).map(|c| c.scan_type)
    }

    pub fn column_type_database_type_name(&self, index: usize) -> Option<&str> {
        self.schema
            .columns
            .get(index)
            .map(|c| c.database_type_name.as_str())
    }

    pub fn column_type_nullable(&self, index: usize) -> Option<bool> {
        self.schema.columns.get(index).map(|c| !c.not_null)
    }

    /// Precision and scale, for DECIMAL columns.
    pub fn column_type_precision_scale(&self, index: usize) -> Option<(i64, i64)> {
        self.schema
            .columns
            .get(index)
            .filter(|c| c.has_precision_scale)
            .map(|c| (c.precision, c.scale))
    }

    /// Maximum length, for CHAR and VARCHAR columns.
    pub fn column_type_length(&self, index: usize) -> Option<i64> {
        self.schema
            .columns
            .get(index)
            .filter(|c| c.has_length)
            .map(|c| c.length)
    }

    /// Decodes the next row into `dest`. Returns `Ok(false)` at end of data.
    pub async fn next(&mut self, dest: &mut [Value]) -> HiveResult<bool> {
        self.rs.next(dest).await
    }

    pub fn is_closed(&self) -> bool {
        self.op.is_none()
    }

    /// Closes the operation. Later calls are no-ops.
    pub async fn close(&mut self) -> HiveResult<()> {
        match self.op.take() {
            Some(op) => {
                self.ctx
                    .with_fallback(|ctx| async move { op.close(&ctx).await })
                    .await
            }
            None => Ok(()),
        }
    }
}
