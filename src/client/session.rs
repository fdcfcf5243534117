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

//! Server-side session handle.

use crate::client::operation::Operation;
use crate::client::status::{check_status, guid};
use crate::client::HiveClient;
use crate::context::Context;
use crate::error::HiveResult;
use crate::metadata::catalog::DbMetadata;
use crate::types::hs2::{
    RpcResponse, TCloseSessionReq, TExecuteStatementReq, TGetInfoReq, TGetInfoType,
    TSessionHandle,
};
use tracing::{debug, info};

/// A HiveServer2 session. Scopes configuration and the operations issued in it.
#[derive(Debug)]
pub struct Session {
    client: HiveClient,
    handle: TSessionHandle,
}

impl Session {
    pub(crate) fn new(client: HiveClient, handle: TSessionHandle) -> Self {
        Self { client, handle }
    }

    pub fn handle(&self) -> &TSessionHandle {
        &self.handle
    }

    /// Checks the session with a lightweight server info call.
    pub async fn ping(&self, ctx: &Context) -> HiveResult<()> {
        let req = TGetInfoReq {
            session_handle: self.handle.clone(),
            info_type: TGetInfoType::CliServerName,
        };
        let resp = self.client.rpc().get_info(ctx, req).await?;
        self.check_status(&resp)?;

        debug!("ping. server name: {}", resp.info_value.string_value());
        Ok(())
    }

    /// Submits `stmt` and returns the handle of the operation running it.
    pub async fn execute_statement(&self, ctx: &Context, stmt: &str) -> HiveResult<Operation> {
        let req = TExecuteStatementReq {
            session_handle: self.handle.clone(),
            statement: stmt.to_string(),
            ..TExecuteStatementReq::default()
        };
        let resp = self.client.rpc().execute_statement(ctx, req).await?;
        self.check_status(&resp)?;

        let handle = resp.operation_handle;
        debug!(
            "execute operation: {}; stmt: {}; status code: {}",
            guid(&handle.operation_id),
            stmt,
            resp.status.status_code
        );
        debug!("operation. has resultset: {}", handle.has_result_set);
        debug!(
            "operation. modified row count: {:?}",
            handle.modified_row_count
        );
        Ok(Operation::new(self.client.clone(), handle))
    }

    /// Schema introspection bound to this session.
    ///
    /// The returned accessor does not own the session, which must stay open
    /// while it and its sequences are used.
    pub fn db_metadata(&self) -> DbMetadata {
        DbMetadata::new(self.client.clone(), self.handle.clone())
    }

    /// Releases the session on the server.
    pub async fn close(&self, ctx: &Context) -> HiveResult<()> {
        debug!("close session: {}", guid(&self.handle.session_id));
        let req = TCloseSessionReq {
            session_handle: self.handle.clone(),
        };
        let resp = self.client.rpc().close_session(ctx, req).await?;
        self.check_status(&resp)
    }

    fn check_status(&self, resp: &impl RpcResponse) -> HiveResult<()> {
        check_status(resp)?;
        if let Some(messages) = &resp.status().info_messages {
            for msg in messages {
                info!("info message: {}", msg);
            }
        }
        Ok(())
    }
}
