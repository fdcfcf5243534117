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

//! Impala ADBC Driver for Rust
//!
//! This crate provides an ADBC (Arrow Database Connectivity) driver for
//! Apache Impala, speaking the HiveServer2 protocol.
//!
//! ## Overview
//!
//! The driver implements the standard ADBC traits from `adbc_core`:
//! - [`Driver`] - Entry point for creating database connections
//! - [`Database`] - Holds connection configuration and session options
//! - [`Connection`] - Active connection to an Impala coordinator
//! - [`Statement`] - SQL statement execution
//!
//! Underneath, [`sql::Conn`] drives the protocol: sessions, asynchronous
//! operations polled to completion, paged columnar fetches and catalog
//! listings. The wire codec is supplied by the embedding application as a
//! [`client::Connector`] returning a [`client::HiveServer2Client`].
//!
//! ## Example
//!
//! ```ignore
//! use impala_adbc::Driver;
//! use adbc_core::{Connection as _, Database as _, Driver as _, Statement as _};
//!
//! let mut driver = Driver::with_connector(my_connector);
//! let mut database = driver.new_database()?;
//! database.set_option(OptionDatabase::Uri, "impala://coordinator:21050".into())?;
//! database.set_option(OptionDatabase::Other("impala.mem_limit".into()), "2g".into())?;
//!
//! let mut connection = database.new_connection()?;
//! let mut statement = connection.new_statement()?;
//! statement.set_sql_query("SELECT * FROM functional.alltypes WHERE id = ?")?;
//! let result = statement.execute()?;
//! ```

pub mod client;
pub mod connection;
pub mod context;
pub mod database;
pub mod driver;
pub mod error;
pub(crate) mod logging;
pub mod metadata;
pub mod reader;
pub mod result;
pub mod sql;
pub mod statement;
pub mod types;

pub use connection::Connection;
pub use context::Context;
pub use database::Database;
pub use driver::Driver;
pub use error::{Error, HiveError, HiveResult, ImpalaErrorHelper, Result};
pub use result::value::Value;
pub use sql::Conn;
pub use statement::Statement;
