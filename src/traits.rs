//! Traits for the host seams: world state access and cross-component invocation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::*;

/// One key-value pair produced by a range scan
pub type KeyValue = (String, Vec<u8>);

/// Versioned key-value world state supplied by the host
///
/// Each call commits independently from the caller's point of view; there is
/// no cross-key transaction. Version conflicts detected by the host surface
/// as [`LedgerError::Conflict`].
#[async_trait]
pub trait WorldState: Send + Sync {
    /// Read the bytes stored under `key`, `None` if absent
    async fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()>;

    /// Remove `key`
    async fn del_state(&self, key: &str) -> LedgerResult<()>;

    /// Open a scan over `[start_key, end_key)`
    ///
    /// An empty bound is open-ended, so `("", "")` scans the whole namespace.
    async fn get_state_by_range(&self, start_key: &str, end_key: &str) -> LedgerResult<StateScan>;
}

/// Host-side cursor behind a [`StateScan`]
pub trait StateIterator: Send {
    /// Next entry, or `None` once the range is exhausted
    fn next_entry(&mut self) -> Option<LedgerResult<KeyValue>>;

    /// Release the host resource. Called exactly once.
    fn close(&mut self);
}

/// Lazy, finite, non-restartable sequence of `(key, bytes)` entries
///
/// The underlying cursor is released when the scan is dropped, so every exit
/// path of a consumer (exhaustion, early `?` return, panic) closes it.
pub struct StateScan {
    inner: Box<dyn StateIterator>,
    closed: bool,
}

impl StateScan {
    /// Wrap a host cursor
    pub fn new(inner: Box<dyn StateIterator>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Iterator for StateScan {
    type Item = LedgerResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        let entry = self.inner.next_entry();
        if entry.is_none() {
            self.release();
        }
        entry
    }
}

impl Drop for StateScan {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StateScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateScan")
            .field("closed", &self.closed)
            .finish()
    }
}

/// Status code of a successful invocation
pub const STATUS_OK: i32 = 200;

/// Status code of a failed invocation
pub const STATUS_ERROR: i32 = 500;

/// Status code of an invocation that lost a world-state version conflict
///
/// The caller may resubmit the whole invocation.
pub const STATUS_CONFLICT: i32 = 409;

/// Outcome of invoking a chaincode function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub payload: Vec<u8>,
}

impl Response {
    /// Successful response carrying `payload`
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: STATUS_OK,
            payload,
        }
    }

    /// Failed response carrying the error text as payload
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            payload: message.into().into_bytes(),
        }
    }

    /// Failed response for a world-state version conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_CONFLICT,
            payload: message.into().into_bytes(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Payload rendered as text, lossy for non-UTF-8 bytes
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl<T: Serialize> From<LedgerResult<T>> for Response {
    fn from(result: LedgerResult<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_vec(&value) {
                Ok(payload) => Response::success(payload),
                Err(e) => Response::error(e.to_string()),
            },
            Err(LedgerError::Conflict(msg)) => Response::conflict(msg),
            Err(e) => Response::error(e.to_string()),
        }
    }
}

/// A component whose functions are reachable by name
///
/// `args[0]` is the function name, the rest are its arguments. Failures are
/// reported through the response status rather than as `Err`.
#[async_trait]
pub trait Chaincode: Send + Sync {
    async fn invoke(&self, args: &[Vec<u8>]) -> Response;
}

/// Synchronous call into another component across a namespace boundary
///
/// The callee commits independently of the caller; there is no shared
/// transaction context. `Err` means the call never reached the callee.
#[async_trait]
pub trait ChaincodeInvoker: Send + Sync {
    async fn invoke_chaincode(
        &self,
        component: &str,
        args: Vec<Vec<u8>>,
        channel: &str,
    ) -> LedgerResult<Response>;
}

#[async_trait]
impl<T: ChaincodeInvoker + ?Sized> ChaincodeInvoker for Arc<T> {
    async fn invoke_chaincode(
        &self,
        component: &str,
        args: Vec<Vec<u8>>,
        channel: &str,
    ) -> LedgerResult<Response> {
        (**self).invoke_chaincode(component, args, channel).await
    }
}

#[async_trait]
impl<T: WorldState + ?Sized> WorldState for Arc<T> {
    async fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get_state(key).await
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        (**self).put_state(key, value).await
    }

    async fn del_state(&self, key: &str) -> LedgerResult<()> {
        (**self).del_state(key).await
    }

    async fn get_state_by_range(&self, start_key: &str, end_key: &str) -> LedgerResult<StateScan> {
        (**self).get_state_by_range(start_key, end_key).await
    }
}

/// Decode chaincode arguments into strings, checking the function's arity
pub fn string_args(function: &str, args: &[Vec<u8>], arity: usize) -> LedgerResult<Vec<String>> {
    if args.len() != arity {
        return Err(LedgerError::InvalidArguments(format!(
            "{function} expects {arity} arguments, got {}",
            args.len()
        )));
    }
    args.iter()
        .map(|arg| {
            String::from_utf8(arg.clone()).map_err(|_| {
                LedgerError::InvalidArguments(format!("{function}: argument is not valid UTF-8"))
            })
        })
        .collect()
}
