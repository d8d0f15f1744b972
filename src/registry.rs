//! Publisher authority registry.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A registry organization matching a searched name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub auth_id: i64,
    pub name: String,
}

impl RegistryEntry {
    pub fn new(auth_id: i64, name: impl Into<String>) -> Self {
        Self {
            auth_id,
            name: name.into(),
        }
    }
}

/// Lookup of organization names in an authority registry.
pub trait PublisherRegistry: Send + Sync {
    /// Case-insensitive exact-name search, best match first.
    fn search(&self, name: &str) -> Result<Vec<RegistryEntry>>;
}

const SEARCH_SQL: &str = "SELECT DISTINCT O1.id, O2.name FROM organizations O1 \
     JOIN organizations O2 USING(id) \
     WHERE LOWER(O1.name) = ?1 AND O2.standard = 1 \
     ORDER BY O1.outdated, O1.standard DESC, O1.category DESC";

/// Registry backed by a read-only SQLite database with an `organizations`
/// table (`id`, `name`, `standard`, `outdated`, `category`).
pub struct SqliteRegistry {
    connection: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Open an existing registry file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Registry(format!(
                "registry file {} not found",
                path.display()
            )));
        }
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self::from_connection(connection))
    }

    /// Wrap an already opened connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }
}

impl PublisherRegistry for SqliteRegistry {
    fn search(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::Registry("registry connection poisoned".to_string()))?;
        let mut statement = connection.prepare_cached(SEARCH_SQL)?;
        let rows = statement.query_map([name.to_lowercase()], |row| {
            Ok(RegistryEntry {
                auth_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry").finish_non_exhaustive()
    }
}
