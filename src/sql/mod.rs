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

//! Connection-level SQL surface.
//!
//! [`Conn`] owns one physical link and at most one lazily opened session. It
//! is not safe for concurrent use: callers serialize access per connection.

pub mod rows;
pub mod statement;

use crate::client::operation::Operation;
use crate::client::session::Session;
use crate::client::{HiveClient, Transport};
use crate::context::Context;
use crate::error::{HiveError, HiveResult};
use crate::result::ResultSet;
use rows::Rows;
use statement::{render, template, NamedValue, Stmt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecResult {
    /// Rows modified, when the server reports it.
    pub rows_affected: Option<i64>,
}

/// A connection to an Impala coordinator.
#[derive(Debug)]
pub struct Conn {
    client: HiveClient,
    transport: Option<Box<dyn Transport>>,
    session: Option<Session>,
}

impl Conn {
    pub fn new(client: HiveClient, transport: Box<dyn Transport>) -> Self {
        Self {
            client,
            transport: Some(transport),
            session: None,
        }
    }

    pub fn client(&self) -> &HiveClient {
        &self.client
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Checks the connection, opening a session if needed.
    ///
    /// Socket resets surfaced by the ping are reported as bad connections.
    pub async fn ping(&mut self, ctx: &Context) -> HiveResult<()> {
        let session = self.open_session(ctx).await?;
        session.ping(ctx).await.map_err(infer_bad_connection)
    }

    /// Returns the open session, opening one first if there is none.
    ///
    /// A failure to open is always a bad connection.
    pub async fn open_session(&mut self, ctx: &Context) -> HiveResult<&Session> {
        if self.session.is_none() {
            match self.client.open_session(ctx).await {
                Ok(session) => self.session = Some(session),
                Err(err) => {
                    warn!("failed to open session: {}", err);
                    return Err(HiveError::BadConnection(err.to_string()));
                }
            }
        }
        self.session
            .as_ref()
            .ok_or_else(|| HiveError::InvalidState("session not open".to_string()))
    }

    /// Closes and forgets the current session. No-op without one.
    pub async fn reset_session(&mut self, ctx: &Context) -> HiveResult<()> {
        match self.session.take() {
            Some(session) => {
                ctx.with_fallback(|ctx| async move { session.close(&ctx).await })
                    .await
            }
            None => Ok(()),
        }
    }

    /// Closes the session, then the transport.
    ///
    /// Both are attempted. When both fail the transport failure is reported
    /// first. Closing twice is a no-op.
    pub async fn close(&mut self, ctx: &Context) -> HiveResult<()> {
        debug!("close connection");
        let session = match self.session.take() {
            Some(session) => ctx
                .with_fallback(|ctx| async move { session.close(&ctx).await })
                .await
                .err(),
            None => None,
        };
        let transport = self.transport.take().and_then(|t| t.close().err());
        if session.is_none() && transport.is_none() {
            return Ok(());
        }
        Err(HiveError::Close {
            session: session.map(Box::new),
            transport: transport.map(Box::new),
        })
    }

    /// Templates `query`. Opens the session if needed.
    pub async fn prepare(&mut self, ctx: &Context, query: &str) -> HiveResult<Stmt> {
        self.open_session(ctx).await?;
        Ok(Stmt::new(query))
    }

    /// Runs a query and returns its rows.
    pub async fn query(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> HiveResult<Rows> {
        let stmt = render(&template(query), args)?;
        self.query_rendered(ctx, &stmt).await
    }

    /// Runs a statement that returns no rows and waits for it to finish.
    pub async fn exec(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> HiveResult<ExecResult> {
        let stmt = render(&template(query), args)?;
        self.exec_rendered(ctx, &stmt).await
    }

    /// Runs a prepared statement and returns its rows.
    pub async fn query_stmt(
        &mut self,
        ctx: &Context,
        stmt: &Stmt,
        args: &[NamedValue],
    ) -> HiveResult<Rows> {
        let stmt = stmt.render(args)?;
        self.query_rendered(ctx, &stmt).await
    }

    /// Runs a prepared statement that returns no rows.
    pub async fn exec_stmt(
        &mut self,
        ctx: &Context,
        stmt: &Stmt,
        args: &[NamedValue],
    ) -> HiveResult<ExecResult> {
        let stmt = stmt.render(args)?;
        self.exec_rendered(ctx, &stmt).await
    }

    /// Transactions have no HiveServer2 equivalent.
    pub fn begin(&self) -> HiveResult<()> {
        Err(HiveError::NotSupported)
    }

    async fn query_rendered(&mut self, ctx: &Context, stmt: &str) -> HiveResult<Rows> {
        let session = self.open_session(ctx).await?;
        let op = session.execute_statement(ctx, stmt).await?;

        match fetch_first(ctx, &op).await {
            Ok(rs) => Ok(Rows::new(rs, op, ctx.clone())),
            Err(err) => {
                close_after_error(ctx, op).await;
                Err(err)
            }
        }
    }

    async fn exec_rendered(&mut self, ctx: &Context, stmt: &str) -> HiveResult<ExecResult> {
        let session = self.open_session(ctx).await?;
        let op = session.execute_statement(ctx, stmt).await?;

        // DDL and DML run asynchronously on the server
        if let Err(err) = op.wait_to_finish(ctx).await {
            close_after_error(ctx, op).await;
            return Err(err);
        }

        let result = ExecResult {
            rows_affected: op.rows_affected().map(|n| n as i64),
        };
        ctx.with_fallback(|ctx| async move { op.close(&ctx).await })
            .await?;
        Ok(result)
    }
}

async fn fetch_first(ctx: &Context, op: &Operation) -> HiveResult<ResultSet> {
    let schema = op.get_result_set_metadata(ctx).await?;
    op.fetch_results(ctx, Arc::new(schema)).await
}

async fn close_after_error(ctx: &Context, op: Operation) {
    let closed = ctx
        .with_fallback(|ctx| async move { op.close(&ctx).await })
        .await;
    if let Err(err) = closed {
        warn!("failed to close operation after error: {}", err);
    }
}

/// Reclassifies socket resets as bad connections.
///
/// The transport reports OS-level socket errors as plain text, so they can
/// only be recognized by message.
pub fn infer_bad_connection(err: HiveError) -> HiveError {
    const MARKERS: [&str; 2] = ["broken pipe", "connection reset by peer"];
    if err.is_bad_connection() {
        return err;
    }
    let msg = err.to_string();
    if MARKERS.iter().any(|marker| msg.contains(marker)) {
        HiveError::BadConnection(msg)
    } else {
        err
    }
}
