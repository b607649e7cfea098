//! SQLite-backed store.
//!
//! File databases open a connection per operation so that work on unrelated
//! licenses never waits on a shared handle; SQLite's own locking (WAL plus a
//! busy timeout) arbitrates concurrent writers. In-memory databases, used in
//! tests, share one connection.

use crate::error::{db, StoreError, StoreResult};
use crate::rights::{RightKind, RightsState};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Backend {
    File(PathBuf),
    Memory(Arc<Mutex<Connection>>),
}

/// Persistent store for rights, status documents and passphrases.
pub struct LcpStore {
    backend: Backend,
    /// One lock per license id, serializing consumption of the same license.
    license_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LcpStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_file(&path)?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .map_err(db("failed to enable WAL"))?;
        init_schema(&conn)?;
        info!(path = %path.display(), "license store opened");

        Ok(Self {
            backend: Backend::File(path),
            license_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(db("failed to open in-memory license store"))?;
        init_schema(&conn)?;

        Ok(Self {
            backend: Backend::Memory(Arc::new(Mutex::new(conn))),
            license_locks: Mutex::new(HashMap::new()),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        match &self.backend {
            Backend::File(path) => {
                let mut conn = open_file(path)?;
                f(&mut conn)
            }
            Backend::Memory(shared) => {
                let mut conn = shared.lock().map_err(|_| StoreError::LockPoisoned)?;
                f(&mut conn)
            }
        }
    }

    fn license_lock(&self, license_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .license_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(license_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other caller holds or waits on `lock`.
    fn release_license_lock(&self, license_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .license_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The map and `lock` itself account for two references.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(license_id);
        }
    }

    // ── Rights ───────────────────────────────────────────────────

    /// Creates the rights row from the license's declared rights.
    ///
    /// Existing rows are never overwritten. Returns true if a row was created.
    pub fn ensure_rights(
        &self,
        license_id: &str,
        print: Option<u32>,
        copy: Option<u32>,
    ) -> StoreResult<bool> {
        let inserted = self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO rights (license_id, print_remaining, copy_remaining, registered, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![license_id, print, copy, Utc::now().to_rfc3339()],
            )
            .map_err(db("failed to create rights"))
        })?;
        if inserted > 0 {
            debug!(license_id, ?print, ?copy, "rights created");
        }
        Ok(inserted > 0)
    }

    /// Loads the rights row, if the license is known.
    pub fn rights(&self, license_id: &str) -> StoreResult<Option<RightsState>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT print_remaining, copy_remaining, registered FROM rights WHERE license_id = ?1",
                params![license_id],
                |row| {
                    Ok(RightsState {
                        license_id: license_id.to_string(),
                        print_remaining: row.get(0)?,
                        copy_remaining: row.get(1)?,
                        registered: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(db("failed to load rights"))
        })
    }

    /// Consumes `quantity` units of a right, all or nothing.
    ///
    /// Unlimited rights always succeed without mutation. If `quantity`
    /// exceeds what is left, nothing changes and `false` is returned.
    /// Concurrent callers on the same license are serialized; callers on
    /// different licenses are not.
    pub fn try_consume(&self, kind: RightKind, quantity: u32, license_id: &str) -> StoreResult<bool> {
        let lock = self.license_lock(license_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.consume_locked(kind, quantity, license_id)
        };
        self.release_license_lock(license_id, lock);
        let granted = result?;

        debug!(license_id, right = %kind, quantity, granted, "consume");
        Ok(granted)
    }

    fn consume_locked(&self, kind: RightKind, quantity: u32, license_id: &str) -> StoreResult<bool> {
        let column = kind.column();
        self.with_conn(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db("failed to begin consume"))?;

            let remaining: Option<u32> = tx
                .query_row(
                    &format!("SELECT {column} FROM rights WHERE license_id = ?1"),
                    params![license_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db("failed to read rights"))?
                .ok_or_else(|| StoreError::UnknownLicense(license_id.to_string()))?;

            let granted = match remaining {
                None => true,
                Some(left) if quantity > left => false,
                Some(_) => {
                    tx.execute(
                        &format!("UPDATE rights SET {column} = {column} - ?1 WHERE license_id = ?2"),
                        params![quantity, license_id],
                    )
                    .map_err(db("failed to update rights"))?;
                    true
                }
            };

            tx.commit().map_err(db("failed to commit consume"))?;
            Ok(granted)
        })
    }

    /// Records that this device is registered with the status server.
    pub fn mark_registered(&self, license_id: &str) -> StoreResult<()> {
        let updated = self.with_conn(|conn| {
            conn.execute(
                "UPDATE rights SET registered = 1 WHERE license_id = ?1",
                params![license_id],
            )
            .map_err(db("failed to mark registered"))
        })?;
        if updated == 0 {
            return Err(StoreError::UnknownLicense(license_id.to_string()));
        }
        Ok(())
    }

    /// Whether this device registered the license. Unknown licenses are not.
    pub fn is_registered(&self, license_id: &str) -> StoreResult<bool> {
        Ok(self
            .rights(license_id)?
            .is_some_and(|rights| rights.registered))
    }

    // ── Status documents ─────────────────────────────────────────

    /// Replaces the last known Status Document for a license.
    pub fn save_status(&self, license_id: &str, document: &[u8]) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO status_documents (license_id, document, saved_at) VALUES (?1, ?2, ?3)",
                params![license_id, document, Utc::now().to_rfc3339()],
            )
            .map_err(db("failed to save status document"))
        })?;
        Ok(())
    }

    /// The raw bytes of the last saved Status Document.
    pub fn load_status(&self, license_id: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT document FROM status_documents WHERE license_id = ?1",
                params![license_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db("failed to load status document"))
        })
    }

    // ── Passphrases ──────────────────────────────────────────────

    /// Remembers a hashed passphrase that opened a license.
    pub fn add_passphrase(
        &self,
        license_id: &str,
        user_id: Option<&str>,
        hashed: &str,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO passphrases (license_id, user_id, passphrase, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![license_id, user_id, hashed, Utc::now().to_rfc3339()],
            )
            .map_err(db("failed to save passphrase"))
        })?;
        Ok(())
    }

    /// Hashed passphrases to try for a license: those recorded for it first,
    /// then those of the same user, newest first, without duplicates.
    pub fn passphrases(&self, license_id: &str, user_id: Option<&str>) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT passphrase FROM passphrases
                     WHERE license_id = ?1 OR (?2 IS NOT NULL AND user_id = ?2)
                     ORDER BY (license_id = ?1) DESC, rowid DESC",
                )
                .map_err(db("failed to prepare passphrase query"))?;
            let rows = stmt
                .query_map(params![license_id, user_id], |row| row.get::<_, String>(0))
                .map_err(db("failed to query passphrases"))?;

            let mut result: Vec<String> = Vec::new();
            for row in rows {
                let hashed = row.map_err(db("failed to read passphrase row"))?;
                if !result.contains(&hashed) {
                    result.push(hashed);
                }
            }
            Ok(result)
        })
    }
}

fn open_file(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path).map_err(db("failed to open license store"))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(db("failed to set busy timeout"))?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS rights (
            license_id TEXT PRIMARY KEY,
            print_remaining INTEGER CHECK (print_remaining >= 0),
            copy_remaining INTEGER CHECK (copy_remaining >= 0),
            registered INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS status_documents (
            license_id TEXT PRIMARY KEY,
            document BLOB NOT NULL,
            saved_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS passphrases (
            license_id TEXT NOT NULL,
            user_id TEXT,
            passphrase TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(license_id, passphrase)
        );
        ",
    )
    .map_err(db("failed to init license store schema"))
}
