use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

#[derive(Clone)]
pub struct Database {
    db: Arc<libsql::Database>,
    /// `:memory:` databases live and die with a single connection, so every
    /// caller shares this one.
    pinned: Option<Connection>,
    replica: bool,
    busy_timeout_ms: u64,
    journal_mode: &'static str,
    synchronous: &'static str,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let journal_mode = normalize_journal_mode(&config.journal_mode);
        let synchronous = normalize_synchronous(&config.synchronous);

        let is_memory = config.url == ":memory:";
        let is_remote = config.url.starts_with("libsql://") || config.url.starts_with("https://");
        let replica = is_remote && config.local_path.is_some();
        let db = if is_remote {
            let token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    tracing::info!(url = %config.url, local_path, "Opening embedded replica");
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => {
                    tracing::info!(url = %config.url, "Opening remote database");
                    Builder::new_remote(config.url.clone(), token).build().await?
                }
            }
        } else if is_memory {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            tracing::info!(path, "Opening local database");
            Builder::new_local(path).build().await?
        };

        let pinned = if is_memory { Some(db.connect()?) } else { None };

        let database = Self {
            db: Arc::new(db),
            pinned,
            replica,
            busy_timeout_ms: config.busy_timeout_ms,
            journal_mode,
            synchronous,
        };
        if database.replica {
            database.sync().await?;
        }
        database.configure_database().await?;
        database.init_schema().await?;

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        match &self.pinned {
            Some(conn) => Ok(conn.clone()),
            None => Ok(self.db.connect()?),
        }
    }

    /// True when backed by an embedded replica of a remote primary.
    pub fn is_replica(&self) -> bool {
        self.replica
    }

    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;

        let pragmas = [
            ("busy_timeout", self.busy_timeout_ms.to_string()),
            ("journal_mode", self.journal_mode.to_string()),
            ("synchronous", self.synchronous.to_string()),
        ];
        for (pragma, value) in pragmas {
            if let Err(error) = conn.execute_batch(&format!("PRAGMA {pragma} = {value}")).await {
                tracing::warn!(pragma, value = %value, error = %error, "Failed to set SQLite pragma");
            }
        }

        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn).await
    }

    /// Pull from the primary when running as an embedded replica.
    pub async fn sync(&self) -> Result<()> {
        match self.db.sync().await {
            Ok(replicated) => tracing::info!("Database synced: {:?}", replicated),
            Err(error) => tracing::debug!(error = %error, "Database sync skipped"),
        }
        Ok(())
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_values_are_normalized() {
        assert_eq!(normalize_journal_mode(" delete "), "DELETE");
        assert_eq!(normalize_journal_mode("bogus"), "WAL");
        assert_eq!(normalize_synchronous("full"), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn local_database_is_not_a_replica() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = DatabaseConfig::local(format!("file:{}", dir.path().join("local.db").display()));
        // A replica path without a remote url is ignored.
        config.local_path = Some(dir.path().join("replica.db").display().to_string());

        let db = Database::new(&config).await.unwrap();
        assert!(!db.is_replica());
        assert!(!dir.path().join("replica.db").exists());
    }

    #[tokio::test]
    async fn memory_database_shares_one_connection() {
        let db = Database::new(&DatabaseConfig::local(":memory:")).await.unwrap();

        db.connect()
            .unwrap()
            .execute(
                "INSERT INTO family_members (id, memorial_id, name, relationship, created_at, updated_at)
                 VALUES ('a', 'm', 'Ada', 'Aunt', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                (),
            )
            .await
            .unwrap();

        let mut rows = db
            .connect()
            .unwrap()
            .query("SELECT COUNT(*) FROM family_members", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }
}
