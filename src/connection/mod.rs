//! Connection lifecycle for one set of credentials.
//!
//! A [`Manager`] never holds an open connection between statements: each
//! call to [`Manager::execute`] opens one through a [`Session`] guard and the
//! guard closes it again on every exit path.

pub(crate) mod builder;
pub(crate) mod database;
pub(crate) mod driver;
#[cfg(any(test, feature = "test-util"))]
pub(crate) mod mock;
pub(crate) mod opts;
pub(crate) mod registry;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

pub use builder::Builder;
pub use database::TursoDriver;
pub use driver::Driver;
pub use driver::DriverConnection;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockDriver;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockResult;
#[cfg(any(test, feature = "test-util"))]
pub use mock::Recorded;
pub use opts::Credentials;
pub use registry::Connector;
pub use registry::Registry;

use crate::error::Error;
use crate::error::Result;
use crate::events::Dispatch;
use crate::events::EventName;
use crate::events::Events;
use crate::events::Payload;
use crate::value::Params;
use crate::value::Row;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    /// `Read` when the first keyword of `sql` is `SELECT`, in any case.
    pub fn classify(sql: &str) -> Self {
        match sql.split_whitespace().next() {
            Some(keyword) if keyword.eq_ignore_ascii_case("select") => StatementKind::Read,
            _ => StatementKind::Write,
        }
    }
}

/// Outcome of a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatementHandle {
    pub affected_rows:  u64,
    pub last_insert_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Executed {
    Rows(Vec<Row>),
    Statement(StatementHandle),
}

impl Executed {
    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            Executed::Rows(rows) => Ok(rows),
            Executed::Statement(handle) => {
                Err(Error::NotARead(format!("write affected {} row(s)", handle.affected_rows)))
            }
        }
    }

    pub fn affected_rows(&self) -> u64 {
        match self {
            Executed::Rows(_) => 0,
            Executed::Statement(handle) => handle.affected_rows,
        }
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        match self {
            Executed::Rows(_) => None,
            Executed::Statement(handle) => handle.last_insert_id,
        }
    }
}

/// Owns the connection lifecycle for one set of credentials.
pub struct Manager {
    credentials:    Credentials,
    key:            String,
    driver:         Box<dyn Driver>,
    events:         Arc<Events>,
    last_insert_id: Mutex<Option<i64>>,
}

impl Manager {
    pub fn new(credentials: Credentials, driver: Box<dyn Driver>, events: Arc<Events>) -> Self {
        let key = credentials.fingerprint();
        Self { credentials, key, driver, events, last_insert_id: Mutex::new(None) }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Credentials fingerprint this manager is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn prefix(&self) -> &str {
        &self.credentials.prefix
    }

    /// Row id generated by the most recent insert through this manager.
    pub fn new_id(&self) -> Option<i64> {
        *self.last_insert_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one statement on a fresh connection.
    ///
    /// Reads come back as [`Executed::Rows`], everything else as
    /// [`Executed::Statement`]. Parameters are bound by name; an empty map
    /// runs the text as-is.
    pub fn execute(&self, sql: &str, params: &Params) -> Result<Executed> {
        let mut sql = sql.to_string();
        let mut params = params.clone();

        let pending = Payload::Statement { sql: sql.clone(), params: params.clone() };
        match self.events.notify(EventName::ExecutingQuery, pending) {
            Dispatch::Abort => {
                return Err(Error::Query(format!("statement vetoed by handler: {}", sql)));
            }
            Dispatch::Proceed(Payload::Statement { sql: replaced, params: bound }) => {
                sql = replaced;
                params = bound;
            }
            Dispatch::Proceed(_) => {}
        }

        tracing::debug!(sql = %sql, params = ?params, "executing statement");

        let mut session = Session::open(self)?;
        let bound = (!params.is_empty()).then_some(&params);

        let result = match StatementKind::classify(&sql) {
            StatementKind::Read => Executed::Rows(session.connection.query(&sql, bound)?),
            StatementKind::Write => {
                let affected_rows = session.connection.execute(&sql, bound)?;
                let id = session.connection.last_insert_id();
                Executed::Statement(StatementHandle { affected_rows, last_insert_id: (id > 0).then_some(id) })
            }
        };

        if let Some(id) = result.last_insert_id() {
            *self.last_insert_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        }

        if self.events.has_handlers(EventName::QueryExecuted) {
            self.events.notify(EventName::QueryExecuted, Payload::Executed { sql, params, result: result.clone() });
        }

        Ok(result)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("credentials", &self.credentials)
            .field("key", &self.key)
            .field("last_insert_id", &self.new_id())
            .finish()
    }
}

/// One open connection, closed when dropped.
pub(crate) struct Session<'a> {
    manager:    &'a Manager,
    connection: Box<dyn DriverConnection>,
}

impl<'a> Session<'a> {
    fn open(manager: &'a Manager) -> Result<Self> {
        let connection = manager.driver.connect()?;
        tracing::trace!(key = %manager.key, "connection opened");
        manager.events.notify(EventName::ConnectionOpened, Payload::Connection { key: manager.key.clone() });
        Ok(Self { manager, connection })
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.connection.close();
        tracing::trace!(key = %self.manager.key, "connection closed");
        self.manager.events.notify(EventName::ConnectionClosed, Payload::Connection { key: self.manager.key.clone() });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::events::Reply;
    use crate::value::Value;
    use crate::value::row;

    fn manager(driver: &MockDriver) -> (Manager, Arc<Events>) {
        let events = Arc::new(Events::new());
        (Manager::new(Credentials::local("shop.db"), Box::new(driver.clone()), events.clone()), events)
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatementKind::classify("SELECT * FROM `order`"), StatementKind::Read);
        assert_eq!(StatementKind::classify("  select 1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("\n\tSeLeCt 1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("UPDATE `order` SET `a` = 1"), StatementKind::Write);
        assert_eq!(StatementKind::classify("selector"), StatementKind::Write);
        assert_eq!(StatementKind::classify(""), StatementKind::Write);
    }

    #[test]
    fn test_execute_read_returns_rows() {
        let driver = MockDriver::new();
        driver.push_rows(vec![row([("id", Value::Integer(1))])]);
        let (manager, _) = manager(&driver);

        let rows = manager.execute("SELECT * FROM `order`", &Params::new()).unwrap().into_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(driver.last_statement().unwrap().params, None);
        assert_eq!(driver.opened(), 1);
        assert_eq!(driver.closed(), 1);
    }

    #[test]
    fn test_execute_write_remembers_new_id() {
        let driver = MockDriver::new();
        driver.push_write(1, 12);
        let (manager, _) = manager(&driver);

        let params = Params::from([(":name".to_string(), Value::Text("Ada".into()))]);
        let executed = manager.execute("INSERT INTO `customer` (`name`) VALUES (:name)", &params).unwrap();

        assert_eq!(executed.affected_rows(), 1);
        assert_eq!(manager.new_id(), Some(12));
        assert_eq!(driver.last_statement().unwrap().params, Some(params));
        assert!(executed.into_rows().is_err());
    }

    #[test]
    fn test_zero_insert_id_is_not_remembered() {
        let driver = MockDriver::new();
        driver.push_write(1, 12).push_write(3, 0);
        let (manager, _) = manager(&driver);

        manager.execute("INSERT INTO `customer` DEFAULT VALUES", &Params::new()).unwrap();
        manager.execute("UPDATE `customer` SET `name` = 'x'", &Params::new()).unwrap();
        assert_eq!(manager.new_id(), Some(12));
    }

    #[test]
    fn test_connection_closed_on_failure() {
        let driver = MockDriver::new();
        driver.push_error("no such table: order");
        let (manager, events) = manager(&driver);

        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        events.on(EventName::ConnectionClosed, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::Pass
        });

        let err = manager.execute("SELECT * FROM `order`", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert_eq!(driver.closed(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_failure_propagates() {
        let driver = MockDriver::new();
        driver.fail_connect("unable to open database file");
        let (manager, _) = manager(&driver);

        assert!(manager.execute("SELECT 1", &Params::new()).is_err());
        assert_eq!(driver.closed(), 0);
    }

    #[test]
    fn test_executing_query_may_rewrite_sql() {
        let driver = MockDriver::new();
        let (manager, events) = manager(&driver);
        events.on(EventName::ExecutingQuery, |payload| match payload {
            Payload::Statement { params, .. } => {
                Reply::Replace(Payload::Statement { sql: "SELECT 2".to_string(), params: params.clone() })
            }
            _ => Reply::Pass,
        });

        manager.execute("SELECT 1", &Params::new()).unwrap();
        assert_eq!(driver.last_statement().unwrap().sql, "SELECT 2");
    }

    #[test]
    fn test_executing_query_veto() {
        let driver = MockDriver::new();
        let (manager, events) = manager(&driver);
        events.on(EventName::ExecutingQuery, |_| Reply::Abort);

        assert!(matches!(manager.execute("DELETE FROM `order`", &Params::new()), Err(Error::Query(_))));
        assert_eq!(driver.opened(), 0);
    }

    #[test]
    fn test_query_executed_sees_result() {
        let driver = MockDriver::new();
        driver.push_write(2, 0);
        let (manager, events) = manager(&driver);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        events.on(EventName::QueryExecuted, move |payload| {
            if let Payload::Executed { result, .. } = payload {
                counter.store(result.affected_rows() as usize, Ordering::SeqCst);
            }
            Reply::Pass
        });

        manager.execute("DELETE FROM `order`", &Params::new()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
