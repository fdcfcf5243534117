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

//! In-memory HiveServer2 server for integration tests.
//!
//! Each statement text (or catalog call name) is scripted with a result
//! schema and a queue of fetch responses. Operations get a fresh handle so
//! fetches and closes can be tracked per operation.

#![allow(dead_code)]

use async_trait::async_trait;
use impala_adbc::client::{Connector, HiveServer2Client, Transport};
use impala_adbc::types::hs2::*;
use impala_adbc::{Context, Driver, HiveError, HiveResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const GET_TABLES: &str = "GetTables";
pub const GET_COLUMNS: &str = "GetColumns";
pub const GET_SCHEMAS: &str = "GetSchemas";

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub schema: Option<TTableSchema>,
    pub pages: VecDeque<TFetchResultsResp>,
}

impl Script {
    pub fn new(columns: Vec<(&str, TTypeId)>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, (name, type_id))| TColumnDesc {
                column_name: name.to_string(),
                type_desc: TTypeDesc {
                    types: vec![TTypeEntry::Primitive(TPrimitiveTypeEntry::new(type_id))],
                },
                position: i as i32 + 1,
                comment: None,
            })
            .collect();
        Self {
            schema: Some(TTableSchema { columns }),
            pages: VecDeque::new(),
        }
    }

    pub fn page(mut self, columns: Vec<TColumn>, has_more_rows: bool) -> Self {
        self.pages.push_back(TFetchResultsResp {
            status: TStatus::success(),
            has_more_rows: Some(has_more_rows),
            results: Some(TRowSet {
                start_row_offset: 0,
                columns,
            }),
        });
        self
    }

    pub fn still_executing(mut self, times: usize) -> Self {
        for _ in 0..times {
            self.pages.push_back(TFetchResultsResp {
                status: TStatus::with_code(TStatusCode::StillExecuting),
                has_more_rows: Some(true),
                results: None,
            });
        }
        self
    }
}

#[derive(Debug, Default)]
pub struct ScriptedServer {
    scripts: Mutex<HashMap<String, Script>>,
    running: Mutex<HashMap<Vec<u8>, Script>>,
    next_id: AtomicUsize,
    pub statements: Mutex<Vec<String>>,
    pub fetch_calls: AtomicUsize,
    pub close_operation_calls: AtomicUsize,
    pub close_session_calls: AtomicUsize,
}

impl ScriptedServer {
    pub fn script(&self, key: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(key.to_string(), script);
    }

    fn start(&self, key: &str) -> TOperationHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u8 + 1;
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default();
        let operation_id = THandleIdentifier {
            guid: vec![id; 16],
            secret: vec![0; 16],
        };
        self.running
            .lock()
            .unwrap()
            .insert(operation_id.guid.clone(), script);
        TOperationHandle {
            operation_id,
            has_result_set: true,
            ..TOperationHandle::default()
        }
    }

    fn script_of<T>(
        &self,
        handle: &TOperationHandle,
        f: impl FnOnce(&mut Script) -> T,
    ) -> HiveResult<T> {
        let mut running = self.running.lock().unwrap();
        running
            .get_mut(&handle.operation_id.guid)
            .map(f)
            .ok_or(HiveError::InvalidHandle)
    }
}

#[async_trait]
impl HiveServer2Client for ScriptedServer {
    async fn open_session(
        &self,
        ctx: &Context,
        req: TOpenSessionReq,
    ) -> HiveResult<TOpenSessionResp> {
        ctx.check()?;
        Ok(TOpenSessionResp {
            session_handle: TSessionHandle {
                session_id: THandleIdentifier {
                    guid: vec![0xAB; 16],
                    secret: vec![0; 16],
                },
            },
            configuration: Some(req.configuration),
            ..TOpenSessionResp::default()
        })
    }

    async fn close_session(
        &self,
        _ctx: &Context,
        _req: TCloseSessionReq,
    ) -> HiveResult<TCloseSessionResp> {
        self.close_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TCloseSessionResp::default())
    }

    async fn get_info(&self, ctx: &Context, _req: TGetInfoReq) -> HiveResult<TGetInfoResp> {
        ctx.check()?;
        Ok(TGetInfoResp {
            status: TStatus::success(),
            info_value: TGetInfoValue::StringValue("Impala".to_string()),
        })
    }

    async fn execute_statement(
        &self,
        ctx: &Context,
        req: TExecuteStatementReq,
    ) -> HiveResult<TExecuteStatementResp> {
        ctx.check()?;
        self.statements.lock().unwrap().push(req.statement.clone());
        Ok(TExecuteStatementResp {
            status: TStatus::success(),
            operation_handle: self.start(&req.statement),
        })
    }

    async fn get_operation_status(
        &self,
        ctx: &Context,
        _req: TGetOperationStatusReq,
    ) -> HiveResult<TGetOperationStatusResp> {
        ctx.check()?;
        Ok(TGetOperationStatusResp {
            operation_state: TOperationState::Finished,
            ..TGetOperationStatusResp::default()
        })
    }

    async fn fetch_results(
        &self,
        ctx: &Context,
        req: TFetchResultsReq,
    ) -> HiveResult<TFetchResultsResp> {
        ctx.check()?;
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.script_of(&req.operation_handle, |script| {
            script.pages.pop_front().unwrap_or(TFetchResultsResp {
                status: TStatus::success(),
                has_more_rows: Some(false),
                results: None,
            })
        })
    }

    async fn get_result_set_metadata(
        &self,
        ctx: &Context,
        req: TGetResultSetMetadataReq,
    ) -> HiveResult<TGetResultSetMetadataResp> {
        ctx.check()?;
        let schema = self.script_of(&req.operation_handle, |script| script.schema.clone())?;
        Ok(TGetResultSetMetadataResp {
            status: TStatus::success(),
            schema,
        })
    }

    async fn close_operation(
        &self,
        _ctx: &Context,
        req: TCloseOperationReq,
    ) -> HiveResult<TCloseOperationResp> {
        self.close_operation_calls.fetch_add(1, Ordering::SeqCst);
        self.running
            .lock()
            .unwrap()
            .remove(&req.operation_handle.operation_id.guid);
        Ok(TCloseOperationResp::default())
    }

    async fn get_tables(&self, ctx: &Context, _req: TGetTablesReq) -> HiveResult<TGetTablesResp> {
        ctx.check()?;
        Ok(TGetTablesResp {
            status: TStatus::success(),
            operation_handle: self.start(GET_TABLES),
        })
    }

    async fn get_columns(
        &self,
        ctx: &Context,
        _req: TGetColumnsReq,
    ) -> HiveResult<TGetColumnsResp> {
        ctx.check()?;
        Ok(TGetColumnsResp {
            status: TStatus::success(),
            operation_handle: self.start(GET_COLUMNS),
        })
    }

    async fn get_schemas(
        &self,
        ctx: &Context,
        _req: TGetSchemasReq,
    ) -> HiveResult<TGetSchemasResp> {
        ctx.check()?;
        Ok(TGetSchemasResp {
            status: TStatus::success(),
            operation_handle: self.start(GET_SCHEMAS),
        })
    }
}

#[derive(Debug)]
pub struct NoopTransport;

impl Transport for NoopTransport {
    fn close(&self) -> HiveResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScriptedConnector(pub Arc<ScriptedServer>);

impl Connector for ScriptedConnector {
    fn connect(
        &self,
        _uri: Option<&str>,
    ) -> HiveResult<(Arc<dyn HiveServer2Client>, Box<dyn Transport>)> {
        Ok((self.0.clone(), Box::new(NoopTransport)))
    }
}

pub fn driver(server: &Arc<ScriptedServer>) -> Driver {
    Driver::with_connector(Arc::new(ScriptedConnector(server.clone())))
}

pub fn strings(values: &[&str]) -> TColumn {
    TColumn::strings(values.iter().map(|v| v.to_string()).collect(), vec![])
}
