//! Key lookup over layered configuration sources.
//!
//! Settings are read from an optional `config/dbset.toml` file and then from
//! `DBSET__*` environment variables (`DBSET__DB__HOST` overrides `db.host`).
//!
//! | key             | meaning                                   | default  |
//! |-----------------|-------------------------------------------|----------|
//! | `db.host`       | backend host                              | `""`     |
//! | `db.database`   | database name (file path for turso)       | `""`     |
//! | `db.user`       | user name                                 | `""`     |
//! | `db.password`   | password                                  | `""`     |
//! | `db.prefix`     | table-name prefix                         | `""`     |
//! | `db.page_size`  | default page size of a new query set      | `10`     |
//! | `db.param_keys` | `"unique"` or `"overwrite"`               | `unique` |

use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use serde::de::DeserializeOwned;

use crate::connection::Credentials;
use crate::error::Result;
use crate::query::KeyPolicy;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

const DEFAULT_CONFIG_FILE: &str = "config/dbset";

#[derive(Clone, Debug, Default)]
pub struct Configuration {
    inner: Config,
}

impl Configuration {
    /// Load `config/dbset.toml` (optional) and the `DBSET__` environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let inner = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("DBSET").separator("__"))
            .build()?;

        Ok(Self { inner })
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let inner = Config::builder().add_source(File::from_str(source, FileFormat::Toml)).build()?;
        Ok(Self { inner })
    }

    pub fn from_config(inner: Config) -> Self {
        Self { inner }
    }

    /// Value at `key`, or `default` when the key is missing or does not
    /// deserialize as `T`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.inner.get::<T>(key).unwrap_or(default)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            host:     self.get_or("db.host", String::new()),
            database: self.get_or("db.database", String::new()),
            user:     self.get_or("db.user", String::new()),
            password: self.get_or("db.password", String::new()),
            prefix:   self.prefix(),
        }
    }

    pub fn prefix(&self) -> String {
        self.get_or("db.prefix", String::new())
    }

    pub fn page_size(&self) -> u64 {
        self.get_or("db.page_size", DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn key_policy(&self) -> KeyPolicy {
        match self.get_or("db.param_keys", String::new()).to_ascii_lowercase().as_str() {
            "overwrite" => KeyPolicy::Overwrite,
            _ => KeyPolicy::Unique,
        }
    }
}
