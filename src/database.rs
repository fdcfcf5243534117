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

//! Database implementation for the Impala ADBC driver.

use crate::client::{ClientOptions, Connector, HiveClient};
use crate::connection::Connection;
use crate::error::{HiveError, HiveResult, ImpalaErrorHelper};
use crate::logging::{init_logging, LogConfig};
use crate::metadata::RawConn;
use crate::sql::Conn;
use adbc_core::error::Result;
use adbc_core::options::{OptionConnection, OptionDatabase, OptionValue};
use adbc_core::Optionable;
use driverbase::error::ErrorHelper;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Represents a database instance that holds connection configuration.
///
/// A Database is created from a Driver and is used to establish Connections.
/// The session options set here are sent by every connection when it opens
/// its session. Dialing the server is delegated to a [`Connector`].
#[derive(Debug, Default)]
pub struct Database {
    uri: Option<String>,
    opts: ClientOptions,
    log_config: LogConfig,
    connector: Option<Arc<dyn Connector>>,
}

impl Database {
    /// Creates a new Database instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connector used to dial the server.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Returns the configured URI.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns the session options.
    pub fn client_options(&self) -> &ClientOptions {
        &self.opts
    }

    /// Parse an integer option value.
    fn parse_int_option(value: &OptionValue) -> Option<i64> {
        match value {
            OptionValue::String(s) => s.parse().ok(),
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn connect(&self) -> HiveResult<Connection> {
        let connector = self.connector.as_ref().ok_or_else(|| {
            HiveError::InvalidState("no connector configured".to_string())
        })?;
        debug!("connecting to {:?}", self.uri);
        let (rpc, transport) = connector.connect(self.uri.as_deref())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| HiveError::Rpc(format!("failed to create runtime: {e}")))?;

        let batch_size = usize::try_from(self.opts.max_rows).unwrap_or(1);
        let client = HiveClient::new(rpc, self.opts.clone());
        Ok(Connection::new(
            Conn::new(client, transport),
            Arc::new(runtime),
            batch_size,
        ))
    }
}

impl Optionable for Database {
    type Option = OptionDatabase;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        match key {
            OptionDatabase::Uri => {
                if let OptionValue::String(s) = value {
                    self.uri = Some(s);
                    Ok(())
                } else {
                    Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc())
                }
            }
            OptionDatabase::Other(ref s) => match s.as_str() {
                "impala.batch_size" => match Self::parse_int_option(&value) {
                    Some(v) if v > 0 => {
                        self.opts.max_rows = v;
                        Ok(())
                    }
                    _ => Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc()),
                },
                "impala.mem_limit" => {
                    if let OptionValue::String(v) = value {
                        self.opts.mem_limit = v;
                        Ok(())
                    } else {
                        Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc())
                    }
                }
                "impala.query_timeout_s" => {
                    match Self::parse_int_option(&value).and_then(|v| i32::try_from(v).ok()) {
                        Some(v) if v >= 0 => {
                            self.opts.query_timeout_s = v;
                            Ok(())
                        }
                        _ => Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc()),
                    }
                }
                "impala.log_level" => {
                    if let OptionValue::String(v) = value {
                        self.log_config.level = Some(v);
                        Ok(())
                    } else {
                        Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc())
                    }
                }
                "impala.log_file" => {
                    if let OptionValue::String(v) = value {
                        self.log_config.file = Some(v);
                        Ok(())
                    } else {
                        Err(ImpalaErrorHelper::set_invalid_option(&key, &value).to_adbc())
                    }
                }
                _ => Err(ImpalaErrorHelper::set_unknown_option(&key).to_adbc()),
            },
            _ => Err(ImpalaErrorHelper::set_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        match key {
            OptionDatabase::Uri => self.uri.clone().ok_or_else(|| {
                ImpalaErrorHelper::invalid_state()
                    .message("option 'uri' is not set")
                    .to_adbc()
            }),
            OptionDatabase::Other(ref s) => match s.as_str() {
                "impala.mem_limit" => Ok(self.opts.mem_limit.clone()),
                "impala.log_level" => self.log_config.level.clone().ok_or_else(|| {
                    ImpalaErrorHelper::invalid_state()
                        .message("option 'impala.log_level' is not set")
                        .to_adbc()
                }),
                "impala.log_file" => self.log_config.file.clone().ok_or_else(|| {
                    ImpalaErrorHelper::invalid_state()
                        .message("option 'impala.log_file' is not set")
                        .to_adbc()
                }),
                _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
            },
            _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        match key {
            OptionDatabase::Other(ref s) => match s.as_str() {
                "impala.batch_size" => Ok(self.opts.max_rows),
                "impala.query_timeout_s" => Ok(self.opts.query_timeout_s.into()),
                _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
            },
            _ => Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc()),
        }
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        Err(ImpalaErrorHelper::get_unknown_option(&key).to_adbc())
    }
}

impl adbc_core::Database for Database {
    type ConnectionType = Connection;

    fn new_connection(&self) -> Result<Self::ConnectionType> {
        init_logging(&self.log_config);
        Ok(self.connect()?)
    }

    fn new_connection_with_opts(
        &self,
        opts: impl IntoIterator<Item = (OptionConnection, OptionValue)>,
    ) -> Result<Self::ConnectionType> {
        let mut connection = self.new_connection()?;
        for (key, value) in opts {
            connection.set_option(key, value)?;
        }
        Ok(connection)
    }
}

/// Catalog calls on a `Database` check out a fresh connection, closed when
/// the call returns.
impl RawConn for Database {
    fn raw(
        &self,
        f: &mut dyn FnMut(&mut Conn, &Runtime) -> HiveResult<()>,
    ) -> HiveResult<()> {
        init_logging(&self.log_config);
        let connection = self.connect()?;
        connection.raw(f)
    }
}
