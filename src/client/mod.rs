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

//! HiveServer2 protocol client.
//!
//! This module provides:
//! - `HiveServer2Client` trait: the typed RPC surface of the server. The binary
//!   codec, socket, TLS and SASL layers live behind it.
//! - `Transport` / `Connector`: ownership and construction of the physical link.
//! - `HiveClient`: opens [`Session`]s with the configured session options.

pub mod operation;
pub mod session;
pub mod status;

use crate::context::Context;
use crate::error::HiveResult;
use crate::types::hs2::{
    TCloseOperationReq, TCloseOperationResp, TCloseSessionReq, TCloseSessionResp,
    TExecuteStatementReq, TExecuteStatementResp, TFetchResultsReq, TFetchResultsResp,
    TGetColumnsReq, TGetColumnsResp, TGetInfoReq, TGetInfoResp, TGetOperationStatusReq,
    TGetOperationStatusResp, TGetResultSetMetadataReq, TGetResultSetMetadataResp,
    TGetSchemasReq, TGetSchemasResp, TGetTablesReq, TGetTablesResp, TOpenSessionReq,
    TOpenSessionResp, TProtocolVersion,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub use operation::Operation;
pub use session::Session;
pub use status::{check_state, check_status, guid};

/// Typed request/response calls of the HiveServer2 service.
///
/// Implementations own the wire encoding. Each call blocks (asynchronously)
/// until its response arrives and should give up when `ctx` is done, returning
/// the context's error. Transport failures are reported as
/// [`HiveError::Rpc`](crate::HiveError::Rpc) with the underlying message.
#[async_trait]
pub trait HiveServer2Client: Send + Sync + std::fmt::Debug {
    async fn open_session(&self, ctx: &Context, req: TOpenSessionReq)
        -> HiveResult<TOpenSessionResp>;

    async fn close_session(
        &self,
        ctx: &Context,
        req: TCloseSessionReq,
    ) -> HiveResult<TCloseSessionResp>;

    async fn get_info(&self, ctx: &Context, req: TGetInfoReq) -> HiveResult<TGetInfoResp>;

    async fn execute_statement(
        &self,
        ctx: &Context,
        req: TExecuteStatementReq,
    ) -> HiveResult<TExecuteStatementResp>;

    async fn get_operation_status(
        &self,
        ctx: &Context,
        req: TGetOperationStatusReq,
    ) -> HiveResult<TGetOperationStatusResp>;

    async fn fetch_results(
        &self,
        ctx: &Context,
        req: TFetchResultsReq,
    ) -> HiveResult<TFetchResultsResp>;

    async fn get_result_set_metadata(
        &self,
        ctx: &Context,
        req: TGetResultSetMetadataReq,
    ) -> HiveResult<TGetResultSetMetadataResp>;

    async fn close_operation(
        &self,
        ctx: &Context,
        req: TCloseOperationReq,
    ) -> HiveResult<TCloseOperationResp>;

    async fn get_tables(&self, ctx: &Context, req: TGetTablesReq) -> HiveResult<TGetTablesResp>;

    async fn get_columns(&self, ctx: &Context, req: TGetColumnsReq)
        -> HiveResult<TGetColumnsResp>;

    async fn get_schemas(&self, ctx: &Context, req: TGetSchemasReq)
        -> HiveResult<TGetSchemasResp>;
}

/// The physical link a connection owns and closes last.
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn close(&self) -> HiveResult<()>;
}

/// Dials the server: builds the socket, TLS and authentication layers.
pub trait Connector: Send + Sync + std::fmt::Debug {
    fn connect(
        &self,
        uri: Option<&str>,
    ) -> HiveResult<(Arc<dyn HiveServer2Client>, Box<dyn Transport>)>;
}

/// Session-scoped runtime options, sent once at session open.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Rows requested per fetch.
    pub max_rows: i64,
    /// Value of the `MEM_LIMIT` session setting.
    pub mem_limit: String,
    /// Value of the `QUERY_TIMEOUT_S` session setting, in seconds.
    pub query_timeout_s: i32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_rows: 1024,
            mem_limit: String::new(),
            query_timeout_s: 0,
        }
    }
}

impl ClientOptions {
    /// Session configuration key/value pairs.
    pub fn session_configuration(&self) -> HashMap<String, String> {
        HashMap::from([
            ("MEM_LIMIT".to_string(), self.mem_limit.clone()),
            (
                "QUERY_TIMEOUT_S".to_string(),
                self.query_timeout_s.to_string(),
            ),
        ])
    }
}

/// Opens sessions against a HiveServer2 endpoint.
#[derive(Debug, Clone)]
pub struct HiveClient {
    rpc: Arc<dyn HiveServer2Client>,
    opts: Arc<ClientOptions>,
}

impl HiveClient {
    pub fn new(rpc: Arc<dyn HiveServer2Client>, opts: ClientOptions) -> Self {
        Self {
            rpc,
            opts: Arc::new(opts),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.opts
    }

    pub(crate) fn rpc(&self) -> &Arc<dyn HiveServer2Client> {
        &self.rpc
    }

    /// Opens a new server-side session carrying the session options.
    pub async fn open_session(&self, ctx: &Context) -> HiveResult<Session> {
        let req = TOpenSessionReq {
            client_protocol: TProtocolVersion::V7,
            configuration: self.opts.session_configuration(),
            ..TOpenSessionReq::default()
        };

        let resp = self.rpc.open_session(ctx, req).await?;
        check_status(&resp)?;

        debug!(
            "open session: {}",
            guid(&resp.session_handle.session_id)
        );
        debug!("session config: {:?}", resp.configuration);
        Ok(Session::new(self.clone(), resp.session_handle))
    }
}
