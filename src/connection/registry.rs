use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use super::Manager;
use super::database::TursoDriver;
use super::driver::Driver;
use super::opts::Credentials;
use crate::error::Result;
use crate::events::Events;

/// Opens a backend for a set of credentials.
pub type Connector = Arc<dyn Fn(&Credentials) -> Result<Box<dyn Driver>> + Send + Sync>;

/// Shared managers keyed by credentials fingerprint.
///
/// Contexts built over equal credentials get the same [`Manager`] and so see
/// the same last inserted id. No connection is kept open here.
pub struct Registry {
    events:    Arc<Events>,
    connector: Connector,
    managers:  Mutex<HashMap<String, Arc<Manager>>>,
}

impl Registry {
    /// Registry opening every backend as a local turso database.
    pub fn new(events: Arc<Events>) -> Self {
        Self::with_connector(
            events,
            Arc::new(|credentials: &Credentials| {
                let driver = TursoDriver::open(credentials)?;
                Ok(Box::new(driver) as Box<dyn Driver>)
            }),
        )
    }

    pub fn with_connector(events: Arc<Events>, connector: Connector) -> Self {
        Self { events, connector, managers: Mutex::new(HashMap::new()) }
    }

    /// Registry handing out clones of one driver for every credentials.
    pub fn with_driver<D>(events: Arc<Events>, driver: D) -> Self
    where D: Driver + Clone + 'static {
        Self::with_connector(events, Arc::new(move |_: &Credentials| Ok(Box::new(driver.clone()) as Box<dyn Driver>)))
    }

    pub fn events(&self) -> &Arc<Events> {
        &self.events
    }

    /// The manager for `credentials`, created on first use.
    pub fn manager(&self, credentials: &Credentials) -> Result<Arc<Manager>> {
        let key = credentials.fingerprint();
        let mut managers = self.managers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(manager) = managers.get(&key) {
            return Ok(manager.clone());
        }

        let driver = (self.connector)(credentials)?;
        let manager = Arc::new(Manager::new(credentials.clone(), driver, self.events.clone()));
        tracing::debug!(key = %key, database = %credentials.database, "registered connection manager");
        managers.insert(key, manager.clone());

        Ok(manager)
    }

    /// Forget the manager registered under `key`; true if there was one.
    pub fn dispose(&self, key: &str) -> bool {
        let mut managers = self.managers.lock().unwrap_or_else(PoisonError::into_inner);
        managers.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.managers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("managers", &self.len()).finish()
    }
}
