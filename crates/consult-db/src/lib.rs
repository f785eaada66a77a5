//! # consult-db
//!
//! libSQL persistence and the consultation coordinator for Consult.
//!
//! Holds all relational state: consultations, their participants, and the
//! minimal doctor/patient reference data the coordinator and search read.
//! `ConsultService` (see [`service`]) orchestrates every mutation together
//! with best-effort notification dispatch.
//!
//! Uses the `libsql` crate (C `SQLite` fork) in local mode.

pub mod error;
pub mod helpers;
mod migrations;
pub mod notify;
pub mod repos;
pub mod service;
mod test_support;

use std::path::PathBuf;
use std::time::Duration;

use error::DatabaseError;
use libsql::{Builder, Transaction, TransactionBehavior};
use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard};

/// Path that opens a throwaway database, removed when the handle drops.
pub const IN_MEMORY: &str = ":memory:";

/// Central database handle for all Consult state.
///
/// Every write goes through [`ConsultDb::begin_write`], which serializes
/// writers on an in-process gate and opens a `BEGIN IMMEDIATE` transaction so
/// the reserved lock is held from the first statement. Reads go through
/// [`ConsultDb::begin_read`] on their own connection, so they only ever see
/// committed state.
pub struct ConsultDb {
    db: libsql::Database,
    conn: libsql::Connection,
    busy_timeout: Duration,
    write_gate: Mutex<()>,
    // Last, so connections close before the directory is removed.
    _scratch: Option<TempDir>,
}

/// Per-connection settings in `SQLite`.
async fn configure(conn: &libsql::Connection, busy_timeout: Duration) -> Result<(), DatabaseError> {
    conn.execute("PRAGMA foreign_keys = ON", ())
        .await
        .map_err(|e| DatabaseError::Query(format!("PRAGMA foreign_keys: {e}")))?;
    conn.query(
        &format!("PRAGMA busy_timeout = {}", busy_timeout.as_millis()),
        (),
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("PRAGMA busy_timeout: {e}")))?;
    Ok(())
}

impl ConsultDb {
    /// Open a local database at the given path ([`IN_MEMORY`] for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open_local_with_timeout(path, Duration::from_secs(5)).await
    }

    /// Like [`Self::open_local`] with an explicit lock wait for writers in
    /// other processes.
    ///
    /// [`IN_MEMORY`] is backed by a file in a private temporary directory:
    /// readers need connections of their own, and separate `:memory:`
    /// connections would each see an empty database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local_with_timeout(
        path: &str,
        busy_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let (file, scratch) = if path == IN_MEMORY {
            let dir = tempfile::Builder::new().prefix("consult-db-").tempdir()?;
            (dir.path().join("consult.db"), Some(dir))
        } else {
            (PathBuf::from(path), None)
        };

        let db = Builder::new_local(&file).build().await?;
        let conn = db.connect()?;
        configure(&conn, busy_timeout).await?;

        // WAL readers keep a consistent snapshot while a writer is active.
        let mut rows = conn
            .query("PRAGMA journal_mode = WAL", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
        let mode = rows.next().await?.map(|row| row.get::<String>(0)).transpose()?;
        tracing::debug!(path = %file.display(), ?mode, "database opened");
        drop(rows);

        let consult_db = Self {
            db,
            conn,
            busy_timeout,
            write_gate: Mutex::new(()),
            _scratch: scratch,
        };
        consult_db.run_migrations().await?;
        Ok(consult_db)
    }

    /// The primary connection, shared with writers.
    ///
    /// Statements here see any write transaction in progress. Request paths
    /// read through [`Self::begin_read`] instead.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID. Returns e.g. `"con-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        generate_id(&self.conn, prefix).await
    }

    /// Take the write gate and open an IMMEDIATE transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction cannot be started.
    pub async fn begin_write(&self) -> Result<WriteTx<'_>, DatabaseError> {
        let guard = self.write_gate.lock().await;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok(WriteTx { _guard: guard, tx })
    }

    /// Open a read snapshot on a fresh connection.
    ///
    /// The first query fixes the snapshot; every later query through the
    /// same handle sees the same committed state. Dropping the handle closes
    /// the connection and ends the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection cannot be opened.
    pub async fn begin_read(&self) -> Result<ReadTx, DatabaseError> {
        let conn = self.db.connect()?;
        configure(&conn, self.busy_timeout).await?;
        conn.execute("BEGIN", ()).await?;
        Ok(ReadTx { conn })
    }
}

/// A read-only snapshot on a connection of its own.
pub struct ReadTx {
    conn: libsql::Connection,
}

impl ReadTx {
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

/// An open write transaction holding the database's write gate.
///
/// The gate is released when the transaction is committed or rolled back.
pub struct WriteTx<'a> {
    _guard: MutexGuard<'a, ()>,
    tx: Transaction,
}

impl WriteTx<'_> {
    /// Connection view scoped to the transaction.
    #[must_use]
    pub fn conn(&self) -> &libsql::Connection {
        &self.tx
    }

    /// Commit on `Ok`, roll back on `Err`, and pass the result through.
    ///
    /// # Errors
    ///
    /// Returns the body's error unchanged, or a `DatabaseError` (converted
    /// into `E`) if the commit itself fails.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                self.tx
                    .commit()
                    .await
                    .map_err(|e| E::from(DatabaseError::from(e)))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.tx.rollback().await {
                    tracing::error!(%rollback_error, "rollback failed");
                }
                Err(error)
            }
        }
    }
}

/// Generate a prefixed ID on any connection, including a transaction.
///
/// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
///
/// # Errors
///
/// Returns `DatabaseError` if the query fails or returns no rows.
pub async fn generate_id(conn: &libsql::Connection, prefix: &str) -> Result<String, DatabaseError> {
    let mut rows = conn
        .query("SELECT ?1 || '-' || lower(hex(randomblob(4)))", [prefix])
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    Ok(row.get::<String>(0)?)
}
