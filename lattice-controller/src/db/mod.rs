//! SQLite-backed persistence for the controller.
//!
//! One controller instance owns one database file. The schema version lives
//! in the `Config` table; a mismatch at open is fatal (there is no automatic
//! migration). Writers are expected to serialize through the controller
//! lock; the pool is sized to a single connection and SQLite's own busy
//! handler covers cross-process contention.

pub mod blob;
mod error;
mod queries;
mod rows;

pub use error::*;
pub use queries::*;
pub use rows::*;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 2;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA_SQL: &str = r#"
CREATE TABLE Config (
  k TEXT PRIMARY KEY NOT NULL,
  v TEXT NOT NULL
);

CREATE TABLE Network (
  id TEXT PRIMARY KEY NOT NULL,
  name TEXT NOT NULL,
  private INTEGER NOT NULL DEFAULT(1),
  enableBroadcast INTEGER NOT NULL DEFAULT(1),
  allowPassiveBridging INTEGER NOT NULL DEFAULT(0),
  v4AssignMode TEXT NOT NULL DEFAULT('none'),
  v6AssignMode TEXT NOT NULL DEFAULT('none'),
  multicastLimit INTEGER NOT NULL DEFAULT(32),
  creationTime INTEGER NOT NULL DEFAULT(0),
  revision INTEGER NOT NULL DEFAULT(1)
);

CREATE TABLE Node (
  id TEXT PRIMARY KEY NOT NULL,
  identity TEXT NOT NULL,
  lastAt TEXT,
  lastSeen INTEGER NOT NULL DEFAULT(0),
  firstSeen INTEGER NOT NULL DEFAULT(0)
);

CREATE TABLE Member (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  nodeId TEXT NOT NULL,
  authorized INTEGER NOT NULL DEFAULT(0),
  activeBridge INTEGER NOT NULL DEFAULT(0),
  PRIMARY KEY (networkId, nodeId)
);

CREATE INDEX Member_networkId_activeBridge ON Member (networkId, activeBridge);

CREATE TABLE IpAssignment (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  nodeId TEXT NOT NULL,
  ip BLOB NOT NULL,
  ipNetmaskBits INTEGER NOT NULL DEFAULT(0),
  ipVersion INTEGER NOT NULL DEFAULT(4),
  routeIp BLOB
);

CREATE UNIQUE INDEX IpAssignment_networkId_ip_ipVersion ON IpAssignment (networkId, ip, ipVersion);

CREATE INDEX IpAssignment_networkId_nodeId ON IpAssignment (networkId, nodeId);

CREATE TABLE IpAssignmentPool (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  routeIp BLOB NOT NULL,
  ipFirst BLOB NOT NULL,
  ipLast BLOB NOT NULL
);

CREATE INDEX IpAssignmentPool_networkId ON IpAssignmentPool (networkId);

CREATE TABLE Route (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  nodeId TEXT,
  ip BLOB NOT NULL,
  ipNetmaskBits INTEGER NOT NULL,
  ipVersion INTEGER NOT NULL DEFAULT(4)
);

CREATE INDEX Route_networkId ON Route (networkId);

CREATE TABLE Relay (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  nodeId TEXT NOT NULL,
  phyAddress TEXT NOT NULL,
  PRIMARY KEY (networkId, nodeId)
);

CREATE TABLE Gateway (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  ip BLOB NOT NULL,
  ipVersion INTEGER NOT NULL DEFAULT(4),
  metric INTEGER NOT NULL DEFAULT(0)
);

CREATE UNIQUE INDEX Gateway_networkId_ip ON Gateway (networkId, ip);

CREATE TABLE Rule (
  networkId TEXT NOT NULL REFERENCES Network(id) ON DELETE CASCADE,
  ruleNo INTEGER NOT NULL,
  nodeId TEXT,
  vlanId INTEGER,
  vlanPcp INTEGER,
  etherType INTEGER,
  macSource TEXT,
  macDest TEXT,
  ipSource TEXT,
  ipDest TEXT,
  ipTos INTEGER,
  ipProtocol INTEGER,
  ipSourcePort INTEGER,
  ipDestPort INTEGER,
  flags INTEGER,
  invFlags INTEGER,
  action TEXT NOT NULL DEFAULT('accept')
);

CREATE UNIQUE INDEX Rule_networkId_ruleNo ON Rule (networkId, ruleNo);
"#;

#[derive(Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the controller database at `path`.
    ///
    /// A fresh database gets the full schema plus the `schemaVersion` config
    /// row; an existing database must carry exactly [`SCHEMA_VERSION`].
    pub async fn open(path: &str) -> Result<Store, Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Store { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), Error> {
        let config_table: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'Config'",
        )
        .fetch_optional(pool)
        .await?;

        if config_table.is_none() {
            info!("Empty database, initializing schema version {SCHEMA_VERSION}.");
            sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
            sqlx::query("INSERT INTO Config (k,v) VALUES ('schemaVersion',?)")
                .bind(SCHEMA_VERSION.to_string())
                .execute(pool)
                .await?;
            return Ok(());
        }

        let version = sqlx::query("SELECT v FROM Config WHERE k = 'schemaVersion'")
            .fetch_optional(pool)
            .await?
            .map(|row| row.get::<String, _>(0));
        match version {
            None => Err(Error::SchemaVersionMissing),
            Some(v) if v != SCHEMA_VERSION.to_string() => {
                Err(Error::SchemaVersionMismatch {
                    found: v,
                    expected: SCHEMA_VERSION,
                })
            }
            Some(v) => {
                debug!("Opened database at schema version {v}.");
                Ok(())
            }
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Close the pool, flushing any deferred writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) async fn open_in_memory() -> Store {
        Store::open(":memory:").await.expect("in-memory store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_initializes_schema() {
        let store = Store::open_in_memory().await;
        let ids = list_network_ids(store.pool()).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.db");
        let path = path.to_str().unwrap();

        {
            let store = Store::open(path).await.unwrap();
            sqlx::query("UPDATE Config SET v = '999' WHERE k = 'schemaVersion'")
                .execute(store.pool())
                .await
                .unwrap();
            store.close().await;
        }

        match Store::open(path).await {
            Err(Error::SchemaVersionMismatch { found, expected }) => {
                assert_eq!(found, "999");
                assert_eq!(expected, SCHEMA_VERSION);
            }
            other => panic!("expected schema version mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_network_delete_cascades_to_children() {
        let store = Store::open_in_memory().await;
        let pool = store.pool();

        create_network(pool, "deadbeefcafe0001", "demo", 1).await.unwrap();
        create_member(pool, "deadbeefcafe0001", "aaaaaaaaaa", true)
            .await
            .unwrap();
        insert_relay(pool, "deadbeefcafe0001", "bbbbbbbbbb", "1.2.3.4/9993")
            .await
            .unwrap();

        delete_network(pool, "deadbeefcafe0001").await.unwrap();

        assert!(member(pool, "deadbeefcafe0001", "aaaaaaaaaa")
            .await
            .unwrap()
            .is_none());
        assert!(relays(pool, "deadbeefcafe0001").await.unwrap().is_empty());
    }
}
