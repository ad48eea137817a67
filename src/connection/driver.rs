use crate::error::Result;
use crate::value::Params;
use crate::value::Row;

/// A blocking database backend.
///
/// A driver is long-lived and shared between threads; every call to
/// [`connect`](Driver::connect) opens a fresh connection that serves exactly
/// one statement.
pub trait Driver: Send + Sync {
    fn connect(&self) -> Result<Box<dyn DriverConnection>>;
}

/// One open backend connection.
///
/// `params` is `None` when the statement carries no parameters; the
/// connection then runs the text as-is instead of preparing and binding it.
pub trait DriverConnection {
    /// Run a read and return every row as a column mapping.
    fn query(&mut self, sql: &str, params: Option<&Params>) -> Result<Vec<Row>>;

    /// Run a write and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<u64>;

    /// Row id generated by the last insert on this connection, 0 if none.
    fn last_insert_id(&self) -> i64;

    fn close(&mut self) {}
}
