//! Execution results and the stream that carries them.
//!
//! Every delivery produces a fresh, immutable `ExecutionResult`; a later
//! delivery never mutates an earlier one. `version` increases by one per
//! result of the same execution.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use super::errors::{ExecutorError, ResultError};
use crate::parser::{OrderBySpec, StatementType};
use crate::store::SubscriptionHandle;

/// One result of an execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub statement_type: StatementType,
    /// Collection the statement targets
    pub path: String,
    /// Query text as executed, after cleaning
    pub query: String,
    /// `None` on error
    pub payload: Option<Value>,
    /// Ordering for the caller to apply; never applied here
    pub order_bys: Option<Vec<OrderBySpec>>,
    /// Number of records an INSERT plans or wrote
    pub insert_count: Option<usize>,
    /// Live subscription behind this result, if still open
    pub subscription: Option<SubscriptionHandle>,
    pub error: Option<ResultError>,
    /// Starts at 1
    pub version: u64,
    /// True once the mutation has been written
    pub committed: bool,
}

impl ExecutionResult {
    /// Returns true if the result carries an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Payload, or `Null` when absent
    pub fn payload_or_null(&self) -> &Value {
        self.payload.as_ref().unwrap_or(&Value::Null)
    }
}

/// Fields shared by every result of one execution
#[derive(Debug, Clone)]
pub struct ResultHeader {
    pub statement_type: StatementType,
    pub path: String,
    pub query: String,
    pub order_bys: Option<Vec<OrderBySpec>>,
}

impl ResultHeader {
    pub fn new(statement_type: StatementType, path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            statement_type,
            path: path.into(),
            query: query.into(),
            order_bys: None,
        }
    }

    pub fn with_order_bys(mut self, order_bys: Option<Vec<OrderBySpec>>) -> Self {
        self.order_bys = order_bys;
        self
    }
}

/// Producer side of a `ResultStream`
#[derive(Debug)]
pub struct ResultEmitter {
    header: ResultHeader,
    sender: mpsc::UnboundedSender<ExecutionResult>,
    version: u64,
}

impl ResultEmitter {
    /// Creates a connected emitter and stream
    pub fn channel(header: ResultHeader) -> (Self, ResultStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let emitter = Self {
            header,
            sender,
            version: 0,
        };
        (emitter, ResultStream { receiver })
    }

    pub fn header(&self) -> &ResultHeader {
        &self.header
    }

    /// Number of results emitted so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the consumer dropped the stream
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Emits a payload. Returns false if the stream is gone.
    pub fn payload(
        &mut self,
        payload: Value,
        subscription: Option<SubscriptionHandle>,
        committed: bool,
        insert_count: Option<usize>,
    ) -> bool {
        let result = self.build(Some(payload), subscription, None, committed, insert_count);
        self.sender.send(result).is_ok()
    }

    /// Emits an error result. Returns false if the stream is gone.
    pub fn error(&mut self, err: &ExecutorError) -> bool {
        let result = self.build(None, None, Some(ResultError::from(err)), false, None);
        self.sender.send(result).is_ok()
    }

    fn build(
        &mut self,
        payload: Option<Value>,
        subscription: Option<SubscriptionHandle>,
        error: Option<ResultError>,
        committed: bool,
        insert_count: Option<usize>,
    ) -> ExecutionResult {
        self.version += 1;
        ExecutionResult {
            statement_type: self.header.statement_type,
            path: self.header.path.clone(),
            query: self.header.query.clone(),
            payload,
            order_bys: self.header.order_bys.clone(),
            insert_count,
            subscription,
            error,
            version: self.version,
            committed,
        }
    }
}

/// Results of one execution, in delivery order. Ends when the execution
/// finishes or is superseded.
#[derive(Debug)]
pub struct ResultStream {
    receiver: mpsc::UnboundedReceiver<ExecutionResult>,
}

impl ResultStream {
    /// Waits for the next result
    pub async fn next(&mut self) -> Option<ExecutionResult> {
        self.receiver.recv().await
    }

    /// Returns a result if one is already waiting
    pub fn try_next(&mut self) -> Option<ExecutionResult> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for ResultStream {
    type Item = ExecutionResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
