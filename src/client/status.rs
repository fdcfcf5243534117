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

//! Classification of server status codes and operation states.

use crate::error::{HiveError, HiveResult};
use crate::types::hs2::{
    RpcResponse, TGetOperationStatusResp, THandleIdentifier, TOperationState, TStatusCode,
};

/// Checks the status envelope of an RPC response.
///
/// `STILL_EXECUTING` counts as success here; callers that care (fetch) inspect
/// the code themselves.
pub fn check_status(resp: &impl RpcResponse) -> HiveResult<()> {
    let status = resp.status();
    match status.status_code {
        TStatusCode::Success | TStatusCode::SuccessWithInfo | TStatusCode::StillExecuting => {
            Ok(())
        }
        TStatusCode::Error => Err(HiveError::Status {
            code: status.status_code,
            message: status.error_message().to_string(),
        }),
        TStatusCode::InvalidHandle => Err(HiveError::InvalidHandle),
        TStatusCode::Unknown(code) => Err(HiveError::UnexpectedStatus {
            code,
            message: status.error_message().to_string(),
        }),
    }
}

/// Checks the operation state independently of the status envelope.
///
/// The server may report `SUCCESS_STATUS` together with `ERROR_STATE` (for
/// example when the metastore rejects DDL that the coordinator accepted).
pub fn check_state(resp: &TGetOperationStatusResp) -> HiveResult<()> {
    match resp.operation_state {
        TOperationState::Canceled => Err(HiveError::OperationCanceled),
        TOperationState::Error => Err(HiveError::OperationError {
            state: resp.operation_state,
            message: resp.error_message.clone().unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

/// Formats a handle identifier as a UUID-style string for logs.
pub fn guid(id: &THandleIdentifier) -> String {
    let b = &id.guid;
    if b.len() < 16 {
        return hex(b);
    }
    format!(
        "{}-{}-{}-{}-{}",
        hex(&b[0..4]),
        hex(&b[4..6]),
        hex(&b[6..8]),
        hex(&b[8..10]),
        hex(&b[10..16])
    )
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
