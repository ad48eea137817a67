use std::sync::Arc;

use crate::config::Configuration;
use crate::connection::Credentials;
use crate::connection::Executed;
use crate::connection::Manager;
use crate::connection::Registry;
use crate::entity::Entity;
use crate::error::Result;
use crate::events::Events;
use crate::query::Select;
use crate::record::Record;
use crate::table::Table;
use crate::value::Params;
use crate::value::Row;

/// Handle through which builders, result sets and records reach the
/// database.
///
/// Cheap to clone; clones share the registry, the manager and the
/// configuration.
#[derive(Clone)]
pub struct Context {
    registry:      Arc<Registry>,
    manager:       Arc<Manager>,
    configuration: Arc<Configuration>,
}

impl Context {
    /// Context over the credentials found in `configuration`.
    pub fn new(registry: Arc<Registry>, configuration: Configuration) -> Result<Self> {
        let manager = registry.manager(&configuration.credentials())?;
        Ok(Self { registry, manager, configuration: Arc::new(configuration) })
    }

    /// Context with its own registry over a local turso database.
    pub fn connect(configuration: Configuration) -> Result<Self> {
        Self::new(Arc::new(Registry::new(Arc::new(Events::new()))), configuration)
    }

    /// Context sharing this one's registry and configuration but bound to
    /// other credentials.
    pub fn with_credentials(&self, credentials: &Credentials) -> Result<Self> {
        let manager = self.registry.manager(credentials)?;
        Ok(Self { registry: self.registry.clone(), manager, configuration: self.configuration.clone() })
    }

    pub fn events(&self) -> &Arc<Events> {
        self.registry.events()
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn prefix(&self) -> &str {
        self.manager.prefix()
    }

    pub fn table(&self, entity: &str) -> Table {
        Table::new(entity, self.prefix())
    }

    /// A fresh query builder over `entity`.
    pub fn set(&self, entity: impl Into<String>) -> Select {
        Select::new(self.clone(), entity)
    }

    pub fn find<E: Entity>(&self) -> Select {
        self.set(E::entity_name())
    }

    /// An attached record of `entity` over `row`.
    pub fn record(&self, entity: impl Into<String>, row: Row) -> Record {
        Record::new(entity, row).attach(self.clone())
    }

    /// An attached record holding the fields of `entity`.
    pub fn insert<E: Entity>(&self, entity: E) -> Record {
        Record::from_entity(entity).attach(self.clone())
    }

    pub fn execute(&self, sql: &str, params: &Params) -> Result<Executed> {
        self.manager.execute(sql, params)
    }

    pub fn new_id(&self) -> Option<i64> {
        self.manager.new_id()
    }

    /// Remove this context's manager from the registry.
    pub fn dispose(&self) -> bool {
        self.registry.dispose(self.manager.key())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("manager", &self.manager.key()).field("prefix", &self.prefix()).finish()
    }
}
