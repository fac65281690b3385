#![allow(dead_code)]

use repokit_core::{
    CallInterceptor, CallOutcome, ConnectionFactory, DbError, DbResult, Invocation, UnitHandle,
    UnitResult,
};
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Counters shared by a mock factory and every handle it opened.
#[derive(Debug, Default)]
pub struct MockState {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_open: AtomicBool,
    pub fail_close: AtomicBool,
}

impl MockState {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub state: Arc<MockState>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.state.fail_close.store(fail, Ordering::SeqCst);
    }
}

impl ConnectionFactory for MockFactory {
    type Handle = MockHandle;

    fn open(&self) -> DbResult<MockHandle> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("mock open refused".to_string()));
        }
        let serial = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockHandle {
            unit_id: Uuid::new_v4(),
            serial,
            close_calls: Cell::new(0),
            statements: RefCell::new(Vec::new()),
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle that records statements and counts close calls.
#[derive(Debug)]
pub struct MockHandle {
    unit_id: Uuid,
    pub serial: usize,
    close_calls: Cell<usize>,
    statements: RefCell<Vec<String>>,
    state: Arc<MockState>,
}

impl MockHandle {
    pub fn execute(&self, statement: impl Into<String>) -> DbResult<()> {
        if self.is_closed() {
            return Err(DbError::HandleClosed {
                unit_id: self.unit_id,
            });
        }
        self.statements.borrow_mut().push(statement.into());
        Ok(())
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.get()
    }
}

impl UnitHandle for MockHandle {
    fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    fn close(&self) -> DbResult<()> {
        self.close_calls.set(self.close_calls.get() + 1);
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("mock close refused".to_string()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.close_calls.get() > 0
    }
}

/// Interceptor that records every callback it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingInterceptor {
    pub label: &'static str,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingInterceptor {
    pub fn new(label: &'static str, events: Arc<Mutex<Vec<String>>>) -> Self {
        Self { label, events }
    }

    fn push(&self, event: String) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl CallInterceptor for RecordingInterceptor {
    fn before(&self, invocation: &Invocation) {
        self.push(format!("{}:before:{}", self.label, invocation.method));
    }

    fn after(&self, invocation: &Invocation, outcome: &CallOutcome<'_>) {
        let outcome = match outcome {
            CallOutcome::Returned => "returned".to_string(),
            CallOutcome::Failed(err) => format!("failed({err})"),
            CallOutcome::Panicked => "panicked".to_string(),
        };
        self.push(format!("{}:after:{}:{}", self.label, invocation.method, outcome));
    }

    fn around(&self, invocation: &Invocation, proceed: &mut dyn FnMut()) -> UnitResult<()> {
        self.push(format!("{}:enter:{}", self.label, invocation.method));
        proceed();
        self.push(format!("{}:exit:{}", self.label, invocation.method));
        Ok(())
    }
}
