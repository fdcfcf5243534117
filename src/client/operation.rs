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

//! Submitted-statement handle: state polling, result fetch and close.

use crate::client::status::{check_state, check_status, guid};
use crate::client::HiveClient;
use crate::context::Context;
use crate::error::{HiveError, HiveResult};
use crate::metadata::type_mapping::describe_type;
use crate::result::schema::{ColumnDesc, TableSchema};
use crate::result::{length, BatchSource, ResultSet};
use crate::types::hs2::{
    TCloseOperationReq, TFetchOrientation, TFetchResultsReq, TFetchResultsResp,
    TGetOperationStatusReq, TGetResultSetMetadataReq, TOperationHandle, TOperationState,
    TStatusCode, TTypeEntry, CHARACTER_MAXIMUM_LENGTH, PRECISION, SCALE,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff used while waiting on the server.
///
/// Starts at 100ms and doubles up to 1s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub const INITIAL: Duration = Duration::from_millis(100);
    pub const MAX: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            current: Self::INITIAL,
        }
    }

    /// Returns the delay to sleep now and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(Self::MAX);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// A statement running on the server.
///
/// Must be released with [`Operation::close`], which consumes the handle so it
/// runs at most once.
#[derive(Debug)]
pub struct Operation {
    client: HiveClient,
    handle: TOperationHandle,
    closed: bool,
}

impl Operation {
    pub(crate) fn new(client: HiveClient, handle: TOperationHandle) -> Self {
        Self {
            client,
            handle,
            closed: false,
        }
    }

    pub fn handle(&self) -> &TOperationHandle {
        &self.handle
    }

    pub fn has_result_set(&self) -> bool {
        self.handle.has_result_set
    }

    /// Rows modified by the operation, when the server reports it.
    pub fn rows_affected(&self) -> Option<f64> {
        self.handle.modified_row_count
    }

    /// Polls once. Returns the state if both the status and the state are ok.
    pub async fn check_state_and_status(&self, ctx: &Context) -> HiveResult<TOperationState> {
        let req = TGetOperationStatusReq {
            operation_handle: self.handle.clone(),
        };
        let resp = self.client.rpc().get_operation_status(ctx, req).await?;
        check_status(&resp)?;
        check_state(&resp)?;

        let state = resp.operation_state;
        debug!(
            "op {} reached success or non-terminal state {}",
            guid(&self.handle.operation_id),
            state
        );
        Ok(state)
    }

    /// Waits for the operation to reach `FINISHED_STATE`.
    ///
    /// Fails if the operation fails on the server or the context is done.
    pub async fn wait_to_finish(&self, ctx: &Context) -> HiveResult<()> {
        let mut backoff = Backoff::new();
        let mut state = self.check_state_and_status(ctx).await?;
        while state != TOperationState::Finished {
            ctx.sleep(backoff.next_delay()).await;
            state = self.check_state_and_status(ctx).await?;
            // the client should have failed already if ctx is done
            ctx.check()?;
        }
        Ok(())
    }

    /// Fetches the first batch and wraps it in a cursor that fetches the rest
    /// on demand under `ctx`.
    pub async fn fetch_results(
        &self,
        ctx: &Context,
        schema: Arc<TableSchema>,
    ) -> HiveResult<ResultSet> {
        let fetcher = OperationFetcher {
            client: self.client.clone(),
            handle: self.handle.clone(),
            ctx: ctx.clone(),
        };
        let first = fetcher.fetch_next().await?;
        Ok(ResultSet::new(first, schema, Box::new(fetcher)))
    }

    /// Fetches the column descriptors of the result set.
    pub async fn get_result_set_metadata(&self, ctx: &Context) -> HiveResult<TableSchema> {
        debug!(
            "fetch metadata for operation: {}",
            guid(&self.handle.operation_id)
        );
        let req = TGetResultSetMetadataReq {
            operation_handle: self.handle.clone(),
        };
        let resp = self.client.rpc().get_result_set_metadata(ctx, req).await?;
        check_status(&resp)?;

        let mut schema = TableSchema::default();
        let Some(table) = resp.schema else {
            return Ok(schema);
        };

        for desc in table.columns {
            let entry = desc.type_desc.types.first().ok_or_else(|| {
                HiveError::Decode(format!("column {} has no type", desc.column_name))
            })?;
            let (db_type, scan_type) = describe_type(entry);
            let mut col = ColumnDesc::new(desc.column_name, db_type, scan_type);

            if let TTypeEntry::Primitive(primitive) = entry {
                if let Some(qualifiers) = &primitive.type_qualifiers {
                    if let Some(len) = qualifiers.get_i32(CHARACTER_MAXIMUM_LENGTH) {
                        col = col.with_length(i64::from(len));
                    }
                    if let (Some(p), Some(s)) =
                        (qualifiers.get_i32(PRECISION), qualifiers.get_i32(SCALE))
                    {
                        col = col.with_precision_scale(i64::from(p), i64::from(s));
                    }
                }
            }
            schema.columns.push(col);
        }

        for col in &schema.columns {
            debug!("fetch schema: {:?}", col);
        }
        Ok(schema)
    }

    /// Releases the operation on the server.
    pub async fn close(mut self, ctx: &Context) -> HiveResult<()> {
        self.closed = true;
        let req = TCloseOperationReq {
            operation_handle: self.handle.clone(),
        };
        let resp = self.client.rpc().close_operation(ctx, req).await?;
        check_status(&resp)?;

        debug!("close operation: {}", guid(&self.handle.operation_id));
        Ok(())
    }
}

impl Drop for Operation {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "operation {} dropped without close",
                guid(&self.handle.operation_id)
            );
        }
    }
}

/// Re-fetches pages of one operation under the context it was created with.
#[derive(Debug)]
struct OperationFetcher {
    client: HiveClient,
    handle: TOperationHandle,
    ctx: Context,
}

impl OperationFetcher {
    /// One logical fetch. Retries with backoff while the server reports
    /// `STILL_EXECUTING_STATUS`.
    async fn fetch_next(&self) -> HiveResult<TFetchResultsResp> {
        let req = TFetchResultsReq {
            operation_handle: self.handle.clone(),
            orientation: TFetchOrientation::FetchNext,
            max_rows: self.client.options().max_rows,
        };
        let op_id = guid(&self.handle.operation_id);
        debug!("fetch results for operation: {}", op_id);

        let mut backoff: Option<Backoff> = None;
        loop {
            self.ctx.check()?;
            match backoff.as_mut() {
                None => backoff = Some(Backoff::new()),
                Some(backoff) => self.ctx.sleep(backoff.next_delay()).await,
            }

            let resp = self
                .client
                .rpc()
                .fetch_results(&self.ctx, req.clone())
                .await?;
            check_status(&resp)?;

            if resp.status.status_code != TStatusCode::StillExecuting {
                self.ctx.check()?;
                debug!(
                    "results for operation {}: {} rows, more: {:?}",
                    op_id,
                    length(resp.results.as_ref()),
                    resp.has_more_rows
                );
                return Ok(resp);
            }
            debug!("operation {} still executing, retrying fetch", op_id);
        }
    }
}

#[async_trait]
impl BatchSource for OperationFetcher {
    async fn fetch(&mut self) -> HiveResult<TFetchResultsResp> {
        self.fetch_next().await
    }
}
