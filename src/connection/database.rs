use std::sync::Arc;

use tokio::runtime::Runtime;

use super::builder::Builder;
use super::driver::Driver;
use super::driver::DriverConnection;
use super::opts::Credentials;
use crate::error::Error;
use crate::error::Result;
use crate::value::Params;
use crate::value::Row;
use crate::value::Value;

/// [`Driver`] over a local turso database.
///
/// The database file stays open for the driver's lifetime; connections are
/// opened per statement. Turso's async API is driven on a private
/// current-thread runtime, so calls block the caller.
#[derive(Clone)]
pub struct TursoDriver {
    database: turso::Database,
    runtime:  Arc<Runtime>,
    path:     String,
}

impl TursoDriver {
    pub(super) fn new(database: turso::Database, runtime: Arc<Runtime>, path: String) -> Self {
        Self { database, runtime, path }
    }

    pub fn open(credentials: &Credentials) -> Result<Self> {
        Builder::new_local(&credentials.database).build()
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

impl std::fmt::Debug for TursoDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TursoDriver").field("path", &self.path).finish()
    }
}

impl Driver for TursoDriver {
    fn connect(&self) -> Result<Box<dyn DriverConnection>> {
        let inner = self.database.connect()?;
        Ok(Box::new(TursoConnection { inner, runtime: self.runtime.clone() }))
    }
}

struct TursoConnection {
    inner:   turso::Connection,
    runtime: Arc<Runtime>,
}

fn named(params: &Params) -> Vec<(String, turso::Value)> {
    params.iter().map(|(key, value)| (key.clone(), turso::Value::from(value.clone()))).collect()
}

impl DriverConnection for TursoConnection {
    fn query(&mut self, sql: &str, params: Option<&Params>) -> Result<Vec<Row>> {
        let runtime = self.runtime.clone();
        let inner = &self.inner;

        runtime.block_on(async move {
            let mut statement = inner.prepare(sql).await?;
            let columns: Vec<String> =
                statement.columns().iter().map(|column| column.name().to_string()).collect();

            let mut rows = match params {
                Some(params) => statement.query(named(params)).await?,
                None => statement.query(()).await?,
            };

            let mut fetched = Vec::new();
            while let Some(row) = rows.next().await? {
                let mut record = Row::new();
                for (idx, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), Value::from(row.get_value(idx)?));
                }
                fetched.push(record);
            }

            Ok::<_, Error>(fetched)
        })
    }

    fn execute(&mut self, sql: &str, params: Option<&Params>) -> Result<u64> {
        let runtime = self.runtime.clone();
        let inner = &self.inner;

        runtime.block_on(async move {
            let affected = match params {
                Some(params) => inner.execute(sql, named(params)).await?,
                None => inner.execute(sql, ()).await?,
            };
            Ok::<_, Error>(affected)
        })
    }

    fn last_insert_id(&self) -> i64 {
        self.inner.last_insert_rowid()
    }
}
