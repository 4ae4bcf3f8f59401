use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::ingest::NodeStore;
use crate::parser::NodeRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

// No uniqueness on id: every ingest run appends a fresh snapshot.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS nodes (
            id         TEXT NOT NULL,
            isp        TEXT NOT NULL,
            country    TEXT NOT NULL,
            city       TEXT NOT NULL,
            disk       INTEGER NOT NULL,
            ttfb       INTEGER NOT NULL,
            traffic    INTEGER NOT NULL,
            bandwidth  INTEGER NOT NULL,
            weight     INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_nodes_id ON nodes(id);
        ",
    )
}

/// One row of the `nodes` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub id: String,
    pub isp: String,
    pub country: String,
    pub city: String,
    pub disk: u32,
    pub ttfb: u32,
    pub traffic: u32,
    pub bandwidth: u32,
    pub weight: i64,
}

impl From<&NodeRecord> for NodeRow {
    fn from(r: &NodeRecord) -> Self {
        NodeRow {
            id: r.id.clone(),
            isp: r.isp.clone(),
            country: r.country.clone(),
            city: r.city.clone(),
            disk: r.disk_gib,
            ttfb: r.ttfb_ms,
            traffic: r.traffic_gib,
            bandwidth: r.bandwidth_mbps,
            weight: r.weight,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;
        init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl NodeStore for SqliteStore {
    /// Insert all rows in one transaction; nothing is committed on error.
    fn batch_insert(&mut self, rows: &[NodeRow]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO nodes (id, isp, country, city, disk, ttfb, traffic, bandwidth, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.id, r.isp, r.country, r.city, r.disk, r.ttfb, r.traffic, r.bandwidth, r.weight,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

// ── Stats ──

pub struct Stats {
    pub rows: i64,
    pub nodes: i64,
    pub last_insert: Option<String>,
}

pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
    conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT id), MAX(created_at) FROM nodes",
        [],
        |row| {
            Ok(Stats {
                rows: row.get(0)?,
                nodes: row.get(1)?,
                last_insert: row.get(2)?,
            })
        },
    )
}
