//! Node-local event logging (§4.10, §6).
//!
//! [`NodeLogger`] is the seam between THE CORE and wherever log lines
//! actually go. [`TracingLogger`] emits structured `tracing` events for
//! production use; [`RecordingLogger`] buffers [`LogEvent`]s in memory so
//! tests can assert on exactly what happened, matching the `coordinator_side`
//! flag the test harness needs to tell a client-facing decision apart from
//! a storage-server one.

use std::cell::RefCell;

use annulus_types::{Address, Operation};

/// Whether a logged operation succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Fail,
}

/// One logged decision: a server-side CRUD application, or a
/// coordinator-side terminal decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub op: Operation,
    pub outcome: Outcome,
    pub node: Address,
    pub coordinator_side: bool,
    pub transaction_id: i64,
    pub key: String,
    pub value: Option<String>,
}

/// The six-operation logging interface THE CORE depends on (§6): paired
/// success/fail calls for each of create/read/update/delete, each tagged
/// with whether it is the coordinator's final decision or a single
/// server's local application of the operation.
///
/// Implementors need only provide [`NodeLogger::log`]; the named methods
/// are thin wrappers so call sites at the coordinator and server read
/// naturally (`logger.log_create_fail(...)`).
pub trait NodeLogger {
    fn log(&self, event: LogEvent);

    fn log_create_success(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Create, Outcome::Success, node, coordinator_side, transaction_id, key, value);
    }

    fn log_create_fail(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Create, Outcome::Fail, node, coordinator_side, transaction_id, key, value);
    }

    fn log_read_success(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Read, Outcome::Success, node, coordinator_side, transaction_id, key, value);
    }

    fn log_read_fail(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Read, Outcome::Fail, node, coordinator_side, transaction_id, key, value);
    }

    fn log_update_success(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Update, Outcome::Success, node, coordinator_side, transaction_id, key, value);
    }

    fn log_update_fail(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Update, Outcome::Fail, node, coordinator_side, transaction_id, key, value);
    }

    fn log_delete_success(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Delete, Outcome::Success, node, coordinator_side, transaction_id, key, value);
    }

    fn log_delete_fail(&self, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.emit(Operation::Delete, Outcome::Fail, node, coordinator_side, transaction_id, key, value);
    }

    #[doc(hidden)]
    fn emit(&self, op: Operation, outcome: Outcome, node: Address, coordinator_side: bool, transaction_id: i64, key: &str, value: Option<&str>) {
        self.log(LogEvent {
            op,
            outcome,
            node,
            coordinator_side,
            transaction_id,
            key: key.to_string(),
            value: value.map(str::to_string),
        });
    }
}

/// Emits one `tracing` event per logged operation.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl NodeLogger for TracingLogger {
    fn log(&self, event: LogEvent) {
        match event.outcome {
            Outcome::Success => tracing::info!(
                op = %event.op,
                node = %event.node,
                coordinator_side = event.coordinator_side,
                transaction_id = event.transaction_id,
                key = %event.key,
                value = event.value.as_deref(),
                "operation succeeded"
            ),
            Outcome::Fail => tracing::warn!(
                op = %event.op,
                node = %event.node,
                coordinator_side = event.coordinator_side,
                transaction_id = event.transaction_id,
                key = %event.key,
                value = event.value.as_deref(),
                "operation failed"
            ),
        }
    }
}

/// Buffers every logged event for test assertions. Interior mutability
/// lets the logger be shared behind `&self` the way [`NodeLogger`] callers
/// expect, without requiring a `&mut` borrow through the whole tick path.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: RefCell<Vec<LogEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.borrow().clone()
    }
}

impl NodeLogger for RecordingLogger {
    fn log(&self, event: LogEvent) {
        self.events.borrow_mut().push(event);
    }
}
