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

//! Connection implementation for the Impala ADBC driver.

use crate::context::Context;
use crate::error::{HiveError, HiveResult, ImpalaErrorHelper};
use crate::metadata::{Metadata, RawConn};
use crate::reader::arrow_schema_of;
use crate::sql::Conn;
use crate::statement::Statement;
use adbc_core::error::Result;
use adbc_core::options::{InfoCode, ObjectDepth, OptionConnection, OptionValue};
use adbc_core::schemas::GET_TABLE_TYPES_SCHEMA;
use adbc_core::Optionable;
use arrow_array::{RecordBatch, RecordBatchIterator, RecordBatchReader, StringArray};
use arrow_schema::{ArrowError, Schema};
use driverbase::error::ErrorHelper;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Table types reported by `get_table_types`.
const TABLE_TYPES: [&str; 2] = ["TABLE", "VIEW"];

/// Represents an active connection to an Impala coordinator.
///
/// The session is opened lazily by the first statement, ping or catalog
/// call. Statements created from this connection share its [`Conn`], so
/// calls are serialized on one lock.
#[derive(Debug)]
pub struct Connection {
    conn: Arc<Mutex<Conn>>,
    runtime: Arc<Runtime>,
    batch_size: usize,
    // Replaced after each cancel so later calls start live.
    cancel: Arc<Mutex<CancellationToken>>,
}

/// Type alias for our empty reader used in stub implementations.
type EmptyReader =
    RecordBatchIterator<std::vec::IntoIter<std::result::Result<RecordBatch, ArrowError>>>;

impl Connection {
    /// Called by `Database::new_connection()`.
    pub(crate) fn new(conn: Conn, runtime: Arc<Runtime>, batch_size: usize) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            runtime,
            batch_size,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub(crate) fn lock_conn(&self) -> HiveResult<MutexGuard<'_, Conn>> {
        lock(&self.conn)
    }

    /// A fresh context, cancelled by [`adbc_core::Connection::cancel`].
    pub(crate) fn context(&self) -> HiveResult<Context> {
        let token = lock(&self.cancel)?;
        Ok(Context::from_token(token.child_token()))
    }

    /// Checks the connection, opening a session if needed.
    ///
    /// A failure that means the connection must be discarded is reported with
    /// [`HiveError::is_bad_connection`] set.
    pub fn ping(&self) -> HiveResult<()> {
        let ctx = self.context()?;
        let mut conn = self.lock_conn()?;
        self.runtime.block_on(conn.ping(&ctx))
    }

    /// Closes the current session. The next call opens a new one.
    pub fn reset_session(&self) -> HiveResult<()> {
        let ctx = self.context()?;
        let mut conn = self.lock_conn()?;
        self.runtime.block_on(conn.reset_session(&ctx))
    }

    /// Table, column and schema listing over this connection.
    pub fn metadata(&self) -> Metadata<'_> {
        Metadata::new(self)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> HiveResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| HiveError::InvalidState("connection lock poisoned".to_string()))
}

impl RawConn for Connection {
    fn raw(&self, f: &mut dyn FnMut(&mut Conn, &Runtime) -> HiveResult<()>) -> HiveResult<()> {
        let mut conn = self.lock_conn()?;
        f(&mut conn, &self.runtime)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        close_if_last(&self.conn, &self.runtime);
    }
}

/// Backtick-quotes an identifier, doubling any embedded backticks.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Closes the connection when `conn` is its last holder.
///
/// Statements keep the connection alive, so whichever of them or the
/// connection goes last does the close.
pub(crate) fn close_if_last(conn: &Arc<Mutex<Conn>>, runtime: &Runtime) {
    if Arc::strong_count(conn) > 1 {
        return;
    }
    let Ok(mut conn) = conn.lock() else {
        return;
    };
    debug!("closing connection");
    if let Err(e) = runtime.block_on(conn.close(&Context::background())) {
        warn!("failed to close connection: {}", e);
    }
}

impl Optionable for Connection {
    type Option = OptionConnection;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        match key {
            OptionConnection::AutoCommit => match value {
                // Impala has no transactions: every statement commits on its own.
                OptionValue::String(ref v) if v == "true" => Ok(()),
                OptionValue::String(ref v) if v == "false" => {
                    Err(ImpalaErrorHelper::not_implemented()
                        .message("transactions are not supported")
                        .to_adbc())
                }
                _ => Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc()),
            },
            _ => Err(ImpalaErrorHelper::set_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        match key {
            OptionConnection::AutoCommit => Ok("true".to_string()),
            _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }
}

impl adbc_core::Connection for Connection {
    type StatementType = Statement;

    fn new_statement(&mut self) -> Result<Self::StatementType> {
        Ok(Statement::new(
            self.conn.clone(),
            self.runtime.clone(),
            self.cancel.clone(),
            self.batch_size,
        ))
    }

    fn cancel(&mut self) -> Result<()> {
        let mut token = lock(&self.cancel)?;
        debug!("cancelling in-flight calls");
        token.cancel();
        *token = CancellationToken::new();
        Ok(())
    }

    fn get_info(&self, codes: Option<HashSet<InfoCode>>) -> Result<impl RecordBatchReader + Send> {
        use driverbase::InfoBuilder;

        let mut builder = InfoBuilder::new();

        // Filter by requested codes or return all if none specified
        let return_all = codes.is_none();
        let codes = codes.unwrap_or_default();

        if return_all || codes.contains(&InfoCode::DriverName) {
            builder.add_string(InfoCode::DriverName as u32, "Impala ADBC Driver");
        }
        if return_all || codes.contains(&InfoCode::DriverVersion) {
            builder.add_string(InfoCode::DriverVersion as u32, env!("CARGO_PKG_VERSION"));
        }
        if return_all || codes.contains(&InfoCode::VendorName) {
            builder.add_string(InfoCode::VendorName as u32, "Apache Impala");
        }

        Ok(builder.build())
    }

    fn get_objects(
        &self,
        _depth: ObjectDepth,
        _catalog: Option<&str>,
        _db_schema: Option<&str>,
        _table_name: Option<&str>,
        _table_type: Option<Vec<&str>>,
        _column_name: Option<&str>,
    ) -> Result<impl RecordBatchReader + Send> {
        Err::<EmptyReader, _>(
            ImpalaErrorHelper::not_implemented()
                .message("get_objects")
                .to_adbc(),
        )
    }

    fn get_table_schema(
        &self,
        _catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: &str,
    ) -> Result<Schema> {
        let table = match db_schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table_name)),
            None => quote_ident(table_name),
        };
        let query = format!("SELECT * FROM {} LIMIT 0", table);

        let ctx = self.context()?;
        let mut conn = self.lock_conn()?;
        let schema = self.runtime.block_on(async {
            let mut rows = conn.query(&ctx, &query, &[]).await?;
            let schema = arrow_schema_of(rows.schema());
            rows.close().await?;
            Ok::<_, HiveError>(schema)
        })?;
        Ok(schema)
    }

    fn get_table_types(&self) -> Result<impl RecordBatchReader + Send> {
        let array = StringArray::from(TABLE_TYPES.to_vec());
        let batch = RecordBatch::try_new(GET_TABLE_TYPES_SCHEMA.clone(), vec![Arc::new(array)])
            .map_err(|e| {
                ImpalaErrorHelper::io()
                    .message(format!("Failed to build get_table_types result: {}", e))
                    .to_adbc()
            })?;

        Ok(RecordBatchIterator::new(
            vec![Ok(batch)],
            GET_TABLE_TYPES_SCHEMA.clone(),
        ))
    }

    fn read_partition(
        &self,
        _partition: impl AsRef<[u8]>,
    ) -> Result<impl RecordBatchReader + Send> {
        Err::<EmptyReader, _>(
            ImpalaErrorHelper::not_implemented()
                .message("read_partition")
                .to_adbc(),
        )
    }

    fn commit(&mut self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.begin()?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.begin()?;
        Ok(())
    }

    fn get_statistic_names(&self) -> Result<impl RecordBatchReader + Send> {
        Err::<EmptyReader, _>(
            ImpalaErrorHelper::not_implemented()
                .message("get_statistic_names")
                .to_adbc(),
        )
    }

    fn get_statistics(
        &self,
        _catalog: Option<&str>,
        _db_schema: Option<&str>,
        _table_name: Option<&str>,
        _approximate: bool,
    ) -> Result<impl RecordBatchReader + Send> {
        Err::<EmptyReader, _>(
            ImpalaErrorHelper::not_implemented()
                .message("get_statistics")
                .to_adbc(),
        )
    }
}
