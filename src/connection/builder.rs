use std::sync::Arc;

use super::database::TursoDriver;
use crate::error::Result;

/// Builder for a [`TursoDriver`] over a local database file.
pub struct Builder {
    pub(super) path: String,
}

impl Builder {
    pub fn new_local(path: &str) -> Self {
        Self { path: path.to_string() }
    }

    /// Open the database, blocking on a private current-thread runtime.
    ///
    /// Must not be called from inside an async runtime.
    pub fn build(self) -> Result<TursoDriver> {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        let database = runtime.block_on(turso::Builder::new_local(&self.path).build())?;
        tracing::debug!(path = %self.path, "opened turso database");

        Ok(TursoDriver::new(database, Arc::new(runtime), self.path))
    }
}
