use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

/// Connection credentials for one backend.
///
/// Two contexts with equal credentials share one [`Manager`](super::Manager).
/// The turso driver opens `database` as a local path and ignores the rest.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    pub host:     String,
    pub database: String,
    pub user:     String,
    pub password: String,
    pub prefix:   String,
}

impl Credentials {
    pub fn local(path: impl Into<String>) -> Self {
        Self { database: path.into(), ..Default::default() }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Hex SHA-256 over every field; the registry key for these credentials.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [&self.host, &self.database, &self.user, &self.password, &self.prefix] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("prefix", &self.prefix)
            .finish()
    }
}
