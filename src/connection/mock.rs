//! Scripted in-memory [`Driver`] for exercising the data layer without a
//! database.
//!
//! Responses are queued up front and consumed in statement order; every
//! statement is recorded together with its bound parameters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use super::driver::Driver;
use super::driver::DriverConnection;
use crate::error::Error;
use crate::error::Result;
use crate::value::Params;
use crate::value::Row;
use crate::value::Value;

#[derive(Clone, Debug)]
pub enum MockResult {
    Rows(Vec<Row>),
    Write { affected: u64, last_insert_id: i64 },
    Error(String),
}

/// A statement as the driver received it.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub sql:    String,
    pub params: Option<Params>,
}

#[derive(Debug, Default)]
struct MockState {
    queue:        VecDeque<MockResult>,
    statements:   Vec<Recorded>,
    opened:       usize,
    closed:       usize,
    fail_connect: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().queue.push_back(MockResult::Rows(rows));
        self
    }

    /// Queue the single-row answer of a `COUNT(1) `cnt`` query.
    pub fn push_count(&self, count: i64) -> &Self {
        let row = Row::from([("cnt".to_string(), Value::Integer(count))]);
        self.push_rows(vec![row])
    }

    pub fn push_write(&self, affected: u64, last_insert_id: i64) -> &Self {
        self.state().queue.push_back(MockResult::Write { affected, last_insert_id });
        self
    }

    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.state().queue.push_back(MockResult::Error(message.into()));
        self
    }

    /// Make every following `connect` fail with `message`.
    pub fn fail_connect(&self, message: impl Into<String>) -> &Self {
        self.state().fail_connect = Some(message.into());
        self
    }

    pub fn statements(&self) -> Vec<Recorded> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<Recorded> {
        self.state().statements.last().cloned()
    }

    pub fn opened(&self) -> usize {
        self.state().opened
    }

    pub fn closed(&self) -> usize {
        self.state().closed
    }
}

impl Driver for MockDriver {
    fn connect(&self) -> Result<Box<dyn DriverConnection>> {
        let mut state = self.state();
        if let Some(message) = &state.fail_connect {
            return Err(Error::Backend(message.clone()));
        }
        state.opened += 1;
        Ok(Box::new(MockConnection { driver: self.clone(), last_insert_id: 0 }))
    }
}

struct MockConnection {
    driver:         MockDriver,
    last_insert_id: i64,
}

impl MockConnection {
    fn next(&self, sql: &str, params: Option<&Params>) -> Option<MockResult> {
        let mut state = self.driver.state();
        state.statements.push(Recorded { sql: sql.to_string(), params: params.cloned() });
        state.queue.pop_front()
    }
}

impl DriverConnection for MockConnection {
    fn query(&mut self, sql: &str, params: Option<&Params>) -> Result<Vec<Row>> {
        match self.next(sql, params) {
            Some(MockResult::Rows(rows)) => Ok(rows),
            Some(MockResult::Error(message)) => Err(Error::Backend(message)),
            Some(MockResult::Write { .. }) | None => Ok(Vec::new()),
        }
    }

    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<u64> {
        match self.next(sql, params) {
            Some(MockResult::Write { affected, last_insert_id }) => {
                self.last_insert_id = last_insert_id;
                Ok(affected)
            }
            Some(MockResult::Error(message)) => Err(Error::Backend(message)),
            Some(MockResult::Rows(_)) => Ok(0),
            None => Ok(1),
        }
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    fn close(&mut self) {
        self.driver.state().closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_in_order() {
        let driver = MockDriver::new();
        driver.push_count(3).push_write(1, 42);

        let mut conn = driver.connect().unwrap();
        let rows = conn.query("SELECT COUNT(1) `cnt` FROM `order`", None).unwrap();
        assert_eq!(rows[0]["cnt"], Value::Integer(3));

        assert_eq!(conn.execute("INSERT INTO `order` DEFAULT VALUES", None).unwrap(), 1);
        assert_eq!(conn.last_insert_id(), 42);
        assert_eq!(driver.statements().len(), 2);
    }

    #[test]
    fn test_mock_error_and_connect_failure() {
        let driver = MockDriver::new();
        driver.push_error("syntax error");

        let mut conn = driver.connect().unwrap();
        assert!(matches!(conn.query("SELEC", None), Err(Error::Backend(m)) if m == "syntax error"));

        driver.fail_connect("connection refused");
        assert!(driver.connect().is_err());
        assert_eq!(driver.opened(), 1);
    }

    #[test]
    fn test_mock_counts_closes() {
        let driver = MockDriver::new();
        let mut conn = driver.connect().unwrap();
        conn.close();
        assert_eq!(driver.opened(), 1);
        assert_eq!(driver.closed(), 1);
    }
}
