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

//! Error types for the Impala ADBC driver.
//!
//! Two layers live here:
//! - [`HiveError`]: the protocol client's own taxonomy. Callers match on it to
//!   tell fatal connection failures, server status errors, operation state
//!   errors and context errors apart.
//! - [`Error`]: the driverbase error used at the ADBC boundary, so messages
//!   carry the driver name prefix and integrate with the ADBC error model.

use crate::types::hs2::{TOperationState, TStatusCode};
use adbc_core::error::Status;
use driverbase::error::ErrorHelper;
use thiserror::Error;

/// Error helper for Impala driver errors.
///
/// This type implements the driverbase `ErrorHelper` trait to provide
/// consistent error formatting with the driver name prefix.
#[derive(Clone)]
pub struct ImpalaErrorHelper;

impl ErrorHelper for ImpalaErrorHelper {
    const NAME: &'static str = "Impala";
}

/// The error type for Impala ADBC driver operations.
pub type Error = driverbase::error::Error<ImpalaErrorHelper>;

/// A convenient alias for Results with Impala errors.
pub type Result<T> = std::result::Result<T, Error>;

/// A convenient alias for Results with protocol client errors.
pub type HiveResult<T> = std::result::Result<T, HiveError>;

/// Errors raised by the HiveServer2 protocol client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HiveError {
    /// The connection can't be reused and must be discarded by the caller.
    #[error("bad connection inferred from error: {0}")]
    BadConnection(String),

    /// The RPC collaborator failed to deliver a request or a response.
    #[error("{0}")]
    Rpc(String),

    /// The server answered with `ERROR_STATUS`.
    #[error("{code}: {message}")]
    Status { code: TStatusCode, message: String },

    #[error("thrift: invalid handle")]
    InvalidHandle,

    #[error("unexpected code: {code}; message: {message}")]
    UnexpectedStatus { code: i32, message: String },

    #[error("operation cancelled on the server")]
    OperationCanceled,

    /// The operation reached `ERROR_STATE`, possibly behind a successful status.
    #[error("{state}: {message}")]
    OperationError {
        state: TOperationState,
        message: String,
    },

    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The operation has no HiveServer2 equivalent (transactions).
    #[error("impala: not supported")]
    NotSupported,

    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Closing a connection failed; both halves are reported.
    #[error("{}", format_close(.session, .transport))]
    Close {
        session: Option<Box<HiveError>>,
        transport: Option<Box<HiveError>>,
    },
}

fn format_close(session: &Option<Box<HiveError>>, transport: &Option<Box<HiveError>>) -> String {
    match (session, transport) {
        (Some(s), Some(t)) => format!(
            "failed to close underlying transport while closing connection: {t} \
             (session close also failed: {s})"
        ),
        (None, Some(t)) => {
            format!("failed to close underlying transport while closing connection: {t}")
        }
        (Some(s), None) => {
            format!("failed to close underlying session while closing connection: {s}")
        }
        (None, None) => "failed to close connection".to_string(),
    }
}

impl HiveError {
    /// Returns true if the connection that produced this error must be discarded.
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, HiveError::BadConnection(_))
    }

    /// Returns true for cancellation and deadline errors coming from a [`Context`](crate::Context).
    pub fn is_context_error(&self) -> bool {
        matches!(self, HiveError::Cancelled | HiveError::DeadlineExceeded)
    }

    /// Converts into the driverbase error used at the ADBC boundary.
    pub fn to_driver_error(&self) -> Error {
        let helper = match self {
            HiveError::BadConnection(_)
            | HiveError::Rpc(_)
            | HiveError::Status { .. }
            | HiveError::UnexpectedStatus { .. }
            | HiveError::OperationError { .. }
            | HiveError::Close { .. } => ImpalaErrorHelper::io(),
            HiveError::InvalidHandle
            | HiveError::OperationCanceled
            | HiveError::InvalidState(_)
            | HiveError::Cancelled
            | HiveError::DeadlineExceeded => ImpalaErrorHelper::invalid_state(),
            HiveError::NotSupported => ImpalaErrorHelper::not_implemented(),
            HiveError::Decode(_) | HiveError::InvalidArgument(_) => {
                ImpalaErrorHelper::invalid_argument()
            }
        };
        helper.message(self.to_string())
    }

    /// Converts into an ADBC error, keeping cancellation and timeouts distinguishable.
    pub fn to_adbc(&self) -> adbc_core::error::Error {
        let mut error = self.to_driver_error().to_adbc();
        match self {
            HiveError::Cancelled => error.status = Status::Cancelled,
            HiveError::DeadlineExceeded => error.status = Status::Timeout,
            HiveError::Decode(_) => error.status = Status::InvalidData,
            _ => {}
        }
        error
    }
}

impl From<HiveError> for adbc_core::error::Error {
    fn from(err: HiveError) -> Self {
        err.to_adbc()
    }
}
