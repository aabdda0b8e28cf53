// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! Relational persistence. Every node has a row in `node` and one row per
//! directed edge in `node_associations`; kinds with scalar attributes have
//! a row in their own table, keyed by the same identifier.

pub mod codec;
mod row;

pub use self::codec::Direction;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{Error, ResultExt};

/// A database locator. Cloned freely; every task opens its own connection
/// through it so concurrent workers never share a handle.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS node (
    id        TEXT PRIMARY KEY,
    kind_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS node_associations (
    id        TEXT NOT NULL,
    neighbor  TEXT NOT NULL,
    direction TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS node_associations_id
    ON node_associations (id);
CREATE TABLE IF NOT EXISTS organization (
    id     TEXT PRIMARY KEY,
    locked INTEGER NOT NULL DEFAULT 0,
    name   TEXT
);
CREATE TABLE IF NOT EXISTS product (
    id          TEXT PRIMARY KEY,
    title       TEXT,
    description TEXT
);
CREATE TABLE IF NOT EXISTS project (
    id          TEXT PRIMARY KEY,
    name        TEXT,
    description TEXT
);
CREATE TABLE IF NOT EXISTS requirement (
    id         TEXT PRIMARY KEY,
    title      TEXT,
    text       TEXT,
    functional INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS story (
    id      TEXT PRIMARY KEY,
    title   TEXT,
    goal    TEXT,
    benefit TEXT
);
CREATE TABLE IF NOT EXISTS use_case (
    id   TEXT PRIMARY KEY,
    name TEXT
);
CREATE TABLE IF NOT EXISTS text (
    id   TEXT PRIMARY KEY,
    text TEXT
);
CREATE TABLE IF NOT EXISTS completed (
    id          TEXT PRIMARY KEY,
    description TEXT
);
CREATE TABLE IF NOT EXISTS keyvalue (
    id    TEXT PRIMARY KEY,
    key   TEXT,
    value TEXT
);
CREATE TABLE IF NOT EXISTS time_estimate (
    id       TEXT PRIMARY KEY,
    text     TEXT,
    estimate INTEGER NOT NULL DEFAULT 0,
    started  INTEGER NOT NULL DEFAULT 0,
    start    TIMESTAMP
);
CREATE TABLE IF NOT EXISTS effort (
    id     TEXT PRIMARY KEY,
    text   TEXT,
    effort INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS role (
    id  TEXT PRIMARY KEY,
    who TEXT
);
CREATE TABLE IF NOT EXISTS actor (
    id    TEXT PRIMARY KEY,
    actor TEXT
);
CREATE TABLE IF NOT EXISTS goal (
    id                     TEXT PRIMARY KEY,
    action                 TEXT,
    outcome                TEXT,
    context                TEXT,
    target_date            TIMESTAMP,
    target_date_confidence TEXT,
    alignment              TEXT
);
CREATE TABLE IF NOT EXISTS purpose (
    id                  TEXT PRIMARY KEY,
    description         TEXT,
    deadline            TIMESTAMP,
    deadline_confidence TEXT
);
CREATE TABLE IF NOT EXISTS person (
    id         TEXT PRIMARY KEY,
    first_name TEXT,
    last_name  TEXT
);
CREATE TABLE IF NOT EXISTS email_address (
    id      TEXT PRIMARY KEY,
    address TEXT
);
CREATE TABLE IF NOT EXISTS phone_number (
    id          TEXT PRIMARY KEY,
    countrycode TEXT,
    number      TEXT,
    phone_type  TEXT
);
CREATE TABLE IF NOT EXISTS international_address (
    id            TEXT PRIMARY KEY,
    country_code  TEXT,
    address_lines TEXT,
    locality      TEXT,
    postal_code   TEXT
);
CREATE TABLE IF NOT EXISTS us_address (
    id            TEXT PRIMARY KEY,
    address_lines TEXT,
    city          TEXT,
    state         TEXT,
    zipcode       TEXT
);
CREATE TABLE IF NOT EXISTS event (
    id          TEXT PRIMARY KEY,
    name        TEXT,
    description TEXT
);
CREATE TABLE IF NOT EXISTS graph_node (
    id    TEXT PRIMARY KEY,
    title TEXT
);
CREATE TABLE IF NOT EXISTS recurring_todo (
    id                 TEXT PRIMARY KEY,
    description        TEXT,
    created            TIMESTAMP NOT NULL,
    recurring_interval INTEGER NOT NULL DEFAULT 0,
    seconds_flag       INTEGER NOT NULL DEFAULT 0,
    dom_flag           INTEGER NOT NULL DEFAULT 0,
    doy_flag           INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS todo (
    id             TEXT PRIMARY KEY,
    description    TEXT,
    created        TIMESTAMP NOT NULL,
    due            TIMESTAMP,
    completed      INTEGER NOT NULL DEFAULT 0,
    date_completed TIMESTAMP,
    spawned_from   TEXT
);
CREATE TABLE IF NOT EXISTS server_locator_node (
    id            TEXT PRIMARY KEY,
    graph_uuid    TEXT,
    graph_title   TEXT,
    graph_address TEXT
);
";

impl Db {
    pub fn new<P: AsRef<Path>>(path: P) -> Db {
        Db {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection. Write-ahead logging so that parallel
    /// workers can read while one of them writes; a busy timeout so that
    /// writers queue up instead of failing.
    pub fn connect(&self) -> Result<Connection, Error> {
        let conn = Connection::open(&self.path)
            .with_context(|_| format!("Could not open {:?}", self.path))?;

        conn.busy_timeout(Duration::from_secs(5))?;

        let _: String =
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Ok(conn)
    }

    /// Creates any missing tables. Idempotent.
    pub fn ensure_schema(&self) -> Result<(), Error> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .context("Failed creating store schema")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use tempfile::TempDir;

    /// A throwaway store for a single test. The directory (and with it the
    /// database) is removed when the value drops.
    pub(crate) fn scratch() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::new(dir.path().join("scratch.db"));
        db.ensure_schema().unwrap();
        (dir, db)
    }

    #[test]
    fn test_schema_idempotent() {
        let (_dir, db) = scratch();
        db.ensure_schema().unwrap();
        db.ensure_schema().unwrap();
    }

    #[test]
    fn test_every_kind_has_a_table() {
        use crate::node::Kind;

        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        for kind in &Kind::ALL {
            if let Some(table) = kind.table() {
                let count: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM {}", table),
                        [],
                        |row| row.get(0),
                    )
                    .unwrap();
                assert_eq!(count, 0, "table {} should exist", table);
            }
        }
    }
}
