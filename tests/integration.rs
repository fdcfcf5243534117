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

//! Integration tests for the Impala ADBC driver.

mod common;

use adbc_core::options::{OptionDatabase, OptionValue};
use adbc_core::Connection as _;
use adbc_core::Database as _;
use adbc_core::Driver as _;
use adbc_core::Optionable;
use adbc_core::Statement as _;
use arrow_array::cast::AsArray;
use arrow_array::types::{Int8Type, TimestampMicrosecondType};
use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::{DataType, TimeUnit};
use common::{driver, strings, Script, ScriptedServer, GET_COLUMNS, GET_TABLES};
use impala_adbc::types::hs2::{TColumn, TTypeId};
use impala_adbc::Context;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn read_all(reader: impl RecordBatchReader) -> Vec<RecordBatch> {
    reader
        .collect::<Result<Vec<_>, _>>()
        .expect("Failed to read batches")
}

#[test]
fn test_driver_database_connection_flow() {
    let server = Arc::new(ScriptedServer::default());
    let mut driver = driver(&server);

    let mut database = driver.new_database().expect("Failed to create database");
    database
        .set_option(
            OptionDatabase::Uri,
            OptionValue::String("impala://coordinator:21050".into()),
        )
        .expect("Failed to set uri");
    database
        .set_option(
            OptionDatabase::Other("impala.query_timeout_s".into()),
            OptionValue::String("60".into()),
        )
        .expect("Failed to set query timeout");

    assert_eq!(
        database.get_option_string(OptionDatabase::Uri).unwrap(),
        "impala://coordinator:21050"
    );

    let mut connection = database.new_connection().expect("Failed to connect");
    {
        let info = connection.get_info(None);
        assert!(info.is_ok());
    }
    connection.ping().expect("Failed to ping");

    let mut statement = connection
        .new_statement()
        .expect("Failed to create statement");
    statement
        .set_sql_query("SELECT 1")
        .expect("Failed to set query");

    drop(statement);
    drop(connection);
    assert_eq!(server.close_session_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_select_one() {
    let server = Arc::new(ScriptedServer::default());
    server.script(
        "SELECT 1",
        Script::new(vec![("1", TTypeId::TinyInt)])
            .page(vec![TColumn::bytes(vec![1], vec![])], false),
    );
    let mut connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query("SELECT 1").unwrap();

    let reader = statement.execute().unwrap();
    assert_eq!(reader.schema().field(0).data_type(), &DataType::Int8);
    let batches = read_all(reader);

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_rows(), 1);
    assert_eq!(batches[0].num_columns(), 1);
    assert_eq!(batches[0].column(0).as_primitive::<Int8Type>().value(0), 1);
    assert_eq!(server.close_operation_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reader_keeps_session_open() {
    let server = Arc::new(ScriptedServer::default());
    server.script(
        "SELECT 1",
        Script::new(vec![("1", TTypeId::TinyInt)])
            .page(vec![TColumn::bytes(vec![1], vec![])], false),
    );
    let mut connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query("SELECT 1").unwrap();

    let reader = statement.execute().unwrap();
    drop(statement);
    drop(connection);
    assert_eq!(server.close_session_calls.load(Ordering::SeqCst), 0);

    let batches = read_all(reader);
    assert_eq!(batches[0].column(0).as_primitive::<Int8Type>().value(0), 1);
    assert_eq!(server.close_operation_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.close_session_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_select_timestamp() {
    let query = "SELECT CAST('2019-01-01 12:00:00' AS TIMESTAMP)";
    let server = Arc::new(ScriptedServer::default());
    server.script(
        query,
        Script::new(vec![("ts", TTypeId::Timestamp)])
            .page(vec![strings(&["2019-01-01 12:00:00"])], false),
    );
    let mut connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query(query).unwrap();

    let batches = read_all(statement.execute().unwrap());

    let column = batches[0].column(0);
    assert_eq!(
        column.data_type(),
        &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
    );
    let expected = chrono::DateTime::parse_from_rfc3339("2019-01-01T12:00:00Z")
        .unwrap()
        .timestamp_micros();
    assert_eq!(
        column.as_primitive::<TimestampMicrosecondType>().value(0),
        expected
    );
}

#[test]
fn test_table_and_column_introspection() {
    let server = Arc::new(ScriptedServer::default());
    server.script(
        GET_TABLES,
        Script::default().page(
            vec![
                strings(&[""]),
                strings(&["default"]),
                strings(&["test"]),
                strings(&["TABLE"]),
            ],
            false,
        ),
    );
    server.script(
        GET_COLUMNS,
        Script::default().page(
            vec![
                strings(&["", ""]),
                strings(&["default", "default"]),
                strings(&["test", "test"]),
                strings(&["a", "b"]),
            ],
            false,
        ),
    );
    let connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let ctx = Context::background();

    let tables = connection
        .metadata()
        .get_tables(&ctx, "defaul%", "tes%")
        .unwrap();
    assert!(tables
        .iter()
        .any(|t| t.schema == "default" && t.name == "test"));

    let columns = connection
        .metadata()
        .get_columns(&ctx, "defaul%", "tes%", "%")
        .unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(server.close_operation_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_fetch_still_executing_then_success() {
    let query = "SELECT count(*) FROM functional.alltypes";
    let server = Arc::new(ScriptedServer::default());
    server.script(
        query,
        Script::new(vec![("count(*)", TTypeId::TinyInt)])
            .still_executing(3)
            .page(vec![TColumn::bytes(vec![8], vec![])], false),
    );
    let mut connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query(query).unwrap();

    let batches = read_all(statement.execute().unwrap());

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].column(0).as_primitive::<Int8Type>().value(0), 8);
    assert_eq!(server.fetch_calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_paged_results_across_batches() {
    let query = "SELECT id FROM t";
    let server = Arc::new(ScriptedServer::default());
    server.script(
        query,
        Script::new(vec![("id", TTypeId::BigInt)])
            .page(vec![TColumn::i64s(vec![1, 2], vec![])], true)
            .page(vec![TColumn::i64s(vec![], vec![])], true)
            .page(vec![TColumn::i64s(vec![3], vec![0b1])], false),
    );
    let mut database = driver(&server).new_database().unwrap();
    database
        .set_option(
            OptionDatabase::Other("impala.batch_size".into()),
            OptionValue::Int(2),
        )
        .unwrap();
    let mut connection = database.new_connection().unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query(query).unwrap();

    let batches = read_all(statement.execute().unwrap());

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].num_rows(), 2);
    assert_eq!(batches[1].num_rows(), 1);
    assert!(batches[1].column(0).is_null(0));
    assert_eq!(server.close_operation_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropped_reader_closes_operation() {
    let query = "SELECT id FROM t";
    let server = Arc::new(ScriptedServer::default());
    server.script(
        query,
        Script::new(vec![("id", TTypeId::BigInt)])
            .page(vec![TColumn::i64s(vec![1, 2], vec![])], true),
    );
    let mut connection = driver(&server)
        .new_database()
        .unwrap()
        .new_connection()
        .unwrap();
    let mut statement = connection.new_statement().unwrap();
    statement.set_sql_query(query).unwrap();

    drop(statement.execute().unwrap());

    assert_eq!(server.close_operation_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_adbc_traits_implemented() {
    fn assert_driver<T: adbc_core::Driver>() {}
    fn assert_database<T: adbc_core::Database>() {}
    fn assert_connection<T: adbc_core::Connection>() {}
    fn assert_statement<T: adbc_core::Statement>() {}

    assert_driver::<impala_adbc::Driver>();
    assert_database::<impala_adbc::Database>();
    assert_connection::<impala_adbc::Connection>();
    assert_statement::<impala_adbc::Statement>();
}
