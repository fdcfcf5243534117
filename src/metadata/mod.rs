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

//! Database schema introspection.
//!
//! [`catalog`] holds the session-level catalog sequences. [`Metadata`] is the
//! connection-level facade: it reaches the backing [`Conn`] through a
//! [`RawConn`] accessor and drains each sequence inside that call, so no
//! cursor outlives the borrowed connection.

pub mod catalog;
pub mod type_mapping;

use crate::context::Context;
use crate::error::HiveResult;
use crate::sql::Conn;
use catalog::{ColumnName, TableName};
use tokio::runtime::Runtime;

/// Gives scoped access to a backing connection.
///
/// The `&mut Conn` handed to `f` is only valid for the duration of the call.
pub trait RawConn {
    fn raw(&self, f: &mut dyn FnMut(&mut Conn, &Runtime) -> HiveResult<()>) -> HiveResult<()>;
}

/// Lists tables, columns and schemas through a [`RawConn`].
///
/// Patterns use SQL `LIKE` syntax (`%` and `_`).
pub struct Metadata<'a> {
    conn: &'a dyn RawConn,
}

impl<'a> Metadata<'a> {
    pub fn new(conn: &'a dyn RawConn) -> Self {
        Self { conn }
    }

    pub fn get_tables(
        &self,
        ctx: &Context,
        schema_pattern: &str,
        table_name_pattern: &str,
    ) -> HiveResult<Vec<TableName>> {
        let mut tables = Vec::new();
        self.conn.raw(&mut |conn, runtime| {
            tables = runtime.block_on(async {
                let session = conn.open_session(ctx).await?;
                session
                    .db_metadata()
                    .get_tables_seq(ctx, schema_pattern, table_name_pattern)
                    .await?
                    .collect()
                    .await
            })?;
            Ok(())
        })?;
        Ok(tables)
    }

    pub fn get_columns(
        &self,
        ctx: &Context,
        schema_pattern: &str,
        table_name_pattern: &str,
        column_name_pattern: &str,
    ) -> HiveResult<Vec<ColumnName>> {
        let mut columns = Vec::new();
        self.conn.raw(&mut |conn, runtime| {
            columns = runtime.block_on(async {
                let session = conn.open_session(ctx).await?;
                session
                    .db_metadata()
                    .get_columns_seq(
                        ctx,
                        schema_pattern,
                        table_name_pattern,
                        column_name_pattern,
                    )
                    .await?
                    .collect()
                    .await
            })?;
            Ok(())
        })?;
        Ok(columns)
    }

    pub fn get_schemas(&self, ctx: &Context, schema_pattern: &str) -> HiveResult<Vec<String>> {
        let mut schemas = Vec::new();
        self.conn.raw(&mut |conn, runtime| {
            schemas = runtime.block_on(async {
                let session = conn.open_session(ctx).await?;
                session
                    .db_metadata()
                    .get_schemas_seq(ctx, schema_pattern)
                    .await?
                    .collect()
                    .await
            })?;
            Ok(())
        })?;
        Ok(schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{batch, MockClient};
    use crate::client::{ClientOptions, HiveClient, Transport};
    use crate::error::HiveError;
    use crate::types::hs2::{TColumn, TStatus};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct NoopTransport;

    impl Transport for NoopTransport {
        fn close(&self) -> HiveResult<()> {
            Ok(())
        }
    }

    struct TestConn {
        conn: Mutex<Conn>,
        runtime: Runtime,
    }

    impl TestConn {
        fn new(mock: &Arc<MockClient>) -> Self {
            let client = HiveClient::new(mock.clone(), ClientOptions::default());
            Self {
                conn: Mutex::new(Conn::new(client, Box::new(NoopTransport))),
                runtime: tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap(),
            }
        }
    }

    impl RawConn for TestConn {
        fn raw(
            &self,
            f: &mut dyn FnMut(&mut Conn, &Runtime) -> HiveResult<()>,
        ) -> HiveResult<()> {
            let mut conn = self.conn.lock().unwrap();
            f(&mut conn, &self.runtime)
        }
    }

    fn strings(values: &[&str]) -> TColumn {
        TColumn::strings(values.iter().map(|v| v.to_string()).collect(), vec![])
    }

    #[test]
    fn test_get_tables_through_raw_conn() {
        let mock = Arc::new(MockClient::default());
        mock.push_fetch(batch(
            TStatus::success(),
            Some(vec![
                strings(&[""]),
                strings(&["default"]),
                strings(&["test"]),
                strings(&["TABLE"]),
            ]),
            false,
        ));
        let conn = TestConn::new(&mock);

        let tables = Metadata::new(&conn)
            .get_tables(&Context::background(), "defaul%", "tes%")
            .unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].schema, "default");
        assert_eq!(tables[0].name, "test");
        assert_eq!(mock.close_operation_calls.load(Ordering::SeqCst), 1);
        assert!(conn.conn.lock().unwrap().has_session());
    }

    #[test]
    fn test_get_schemas_reuses_session() {
        let mock = Arc::new(MockClient::default());
        mock.push_fetch(batch(
            TStatus::success(),
            Some(vec![strings(&["default", "functional"])]),
            false,
        ));
        let conn = TestConn::new(&mock);
        let metadata = Metadata::new(&conn);

        let schemas = metadata.get_schemas(&Context::background(), "%").unwrap();
        assert_eq!(schemas, vec!["default".to_string(), "functional".to_string()]);
        metadata.get_schemas(&Context::background(), "%").unwrap();
        assert_eq!(mock.open_session_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_columns_propagates_fetch_error() {
        let mock = Arc::new(MockClient::default());
        mock.push_fetch(Err(HiveError::Rpc("connection reset by peer".into())));
        let conn = TestConn::new(&mock);

        let err = Metadata::new(&conn)
            .get_columns(&Context::background(), "%", "%", "%")
            .unwrap_err();

        assert_eq!(err, HiveError::Rpc("connection reset by peer".into()));
        assert_eq!(mock.close_operation_calls.load(Ordering::SeqCst), 1);
    }
}
