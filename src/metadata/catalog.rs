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

//! Schema introspection through the catalog RPCs.
//!
//! Each accessor issues a catalog call with LIKE-style patterns and returns a
//! [`CatalogSeq`], a forward-only cursor over the decoded records. The cursor
//! owns the server-side operation and closes it exactly once: on end of data,
//! on error, on cancellation, or through [`CatalogSeq::close`] when the caller
//! stops early.

use crate::client::operation::Operation;
use crate::client::status::check_status;
use crate::client::HiveClient;
use crate::context::Context;
use crate::error::HiveResult;
use crate::result::schema::TableSchema;
use crate::result::value::Value;
use crate::result::ResultSet;
use crate::types::hs2::{
    TGetColumnsReq, TGetSchemasReq, TGetTablesReq, TOperationHandle, TSessionHandle,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// A table or view reported by [`DbMetadata::get_tables_seq`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableName {
    pub schema: String,
    pub name: String,
    /// `TABLE` or `VIEW`.
    pub table_type: String,
}

/// A column reported by [`DbMetadata::get_columns_seq`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnName {
    pub schema: String,
    pub table_name: String,
    pub column_name: String,
}

// Tables and columns responses are read through their first four columns,
// schemas responses through their first one.
const TABLE_COLUMNS: usize = 4;
const SCHEMA_COLUMNS: usize = 1;

/// Exposes the database schema of one session.
///
/// Does not own the session, which must stay open while this accessor and
/// its sequences are used.
#[derive(Debug, Clone)]
pub struct DbMetadata {
    client: HiveClient,
    handle: TSessionHandle,
}

impl DbMetadata {
    pub(crate) fn new(client: HiveClient, handle: TSessionHandle) -> Self {
        Self { client, handle }
    }

    /// Tables and views matching the patterns, across schemas.
    pub async fn get_tables_seq(
        &self,
        ctx: &Context,
        schema_pattern: &str,
        table_name_pattern: &str,
    ) -> HiveResult<CatalogSeq<TableName>> {
        let req = TGetTablesReq {
            session_handle: self.handle.clone(),
            schema_name: Some(schema_pattern.to_string()),
            table_name: Some(table_name_pattern.to_string()),
            ..TGetTablesReq::default()
        };
        let resp = self.client.rpc().get_tables(ctx, req).await?;
        check_status(&resp)?;
        self.open_seq(ctx, resp.operation_handle, TABLE_COLUMNS, |row| TableName {
            schema: text(&row[1]),
            name: text(&row[2]),
            table_type: text(&row[3]),
        })
        .await
    }

    /// Columns matching the patterns.
    pub async fn get_columns_seq(
        &self,
        ctx: &Context,
        schema_pattern: &str,
        table_name_pattern: &str,
        column_name_pattern: &str,
    ) -> HiveResult<CatalogSeq<ColumnName>> {
        let req = TGetColumnsReq {
            session_handle: self.handle.clone(),
            schema_name: Some(schema_pattern.to_string()),
            table_name: Some(table_name_pattern.to_string()),
            column_name: Some(column_name_pattern.to_string()),
            ..TGetColumnsReq::default()
        };
        let resp = self.client.rpc().get_columns(ctx, req).await?;
        check_status(&resp)?;
        self.open_seq(ctx, resp.operation_handle, TABLE_COLUMNS, |row| ColumnName {
            schema: text(&row[1]),
            table_name: text(&row[2]),
            column_name: text(&row[3]),
        })
        .await
    }

    /// Schema names matching the pattern.
    pub async fn get_schemas_seq(
        &self,
        ctx: &Context,
        schema_pattern: &str,
    ) -> HiveResult<CatalogSeq<String>> {
        let req = TGetSchemasReq {
            session_handle: self.handle.clone(),
            schema_name: Some(schema_pattern.to_string()),
            ..TGetSchemasReq::default()
        };
        let resp = self.client.rpc().get_schemas(ctx, req).await?;
        check_status(&resp)?;
        self.open_seq(ctx, resp.operation_handle, SCHEMA_COLUMNS, |row| text(&row[0]))
            .await
    }

    async fn open_seq<T>(
        &self,
        ctx: &Context,
        handle: TOperationHandle,
        width: usize,
        decode: fn(&[Value]) -> T,
    ) -> HiveResult<CatalogSeq<T>> {
        let op = Operation::new(self.client.clone(), handle);
        let schema = Arc::new(TableSchema::strings(width));
        match op.fetch_results(ctx, schema).await {
            Ok(rs) => Ok(CatalogSeq {
                ctx: ctx.clone(),
                op: Some(op),
                rs,
                row: vec![Value::Null; width],
                decode,
            }),
            Err(err) => {
                let close = ctx.with_fallback(|ctx| async move { op.close(&ctx).await });
                if let Err(close_err) = close.await {
                    warn!("failed to close catalog operation: {}", close_err);
                }
                Err(err)
            }
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Lazy, single-pass sequence of catalog records.
pub struct CatalogSeq<T> {
    ctx: Context,
    op: Option<Operation>,
    rs: ResultSet,
    row: Vec<Value>,
    decode: fn(&[Value]) -> T,
}

impl<T> std::fmt::Debug for CatalogSeq<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSeq")
            .field("op", &self.op)
            .field("rs", &self.rs)
            .finish_non_exhaustive()
    }
}

impl<T> CatalogSeq<T> {
    /// Returns the next record, or `None` once the sequence is exhausted.
    ///
    /// The operation is closed before the last `None` or the first error is
    /// returned. Calling `next` again afterwards yields `None`.
    pub async fn next(&mut self) -> HiveResult<Option<T>> {
        if self.op.is_none() {
            return Ok(None);
        }
        match self.advance().await {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.close().await?;
                Ok(None)
            }
            Err(err) => {
                if let Err(close_err) = self.close().await {
                    warn!("failed to close catalog operation: {}", close_err);
                }
                Err(err)
            }
        }
    }

    async fn advance(&mut self) -> HiveResult<Option<T>> {
        self.ctx.check()?;
        if !self.rs.next(&mut self.row).await? {
            return Ok(None);
        }
        self.ctx.check()?;
        Ok(Some((self.decode)(&self.row)))
    }

    /// Closes the underlying operation. Idempotent.
    pub async fn close(&mut self) -> HiveResult<()> {
        let Some(op) = self.op.take() else {
            return Ok(());
        };
        debug!("closing catalog sequence");
        self.ctx
            .with_fallback(|ctx| async move { op.close(&ctx).await })
            .await
    }

    /// Feeds records to `f` until it returns `false` or the sequence ends.
    /// The operation is closed on every exit path.
    pub async fn try_for_each<F>(mut self, mut f: F) -> HiveResult<()>
    where
        F: FnMut(T) -> bool,
    {
        while let Some(item) = self.next().await? {
            if !f(item) {
                break;
            }
        }
        self.close().await
    }

    /// Drains the sequence into a vector.
    pub async fn collect(self) -> HiveResult<Vec<T>> {
        let mut items = Vec::new();
        self.try_for_each(|item| {
            items.push(item);
            true
        })
        .await?;
        Ok(items)
    }
}
