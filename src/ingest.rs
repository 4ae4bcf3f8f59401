use tracing::info;

use crate::db::NodeRow;
use crate::error::{Result, StoreError};
use crate::fetch::Fetcher;
use crate::parser::{table, NodeRecord};

/// Destination for ingested node rows.
pub trait NodeStore {
    /// Write all rows atomically, returning how many were written.
    fn batch_insert(&mut self, rows: &[NodeRow]) -> Result<usize, StoreError>;
}

/// Fetch the stats page and store a snapshot of its active nodes.
pub fn run_ingestion(fetcher: &dyn Fetcher, store: &mut dyn NodeStore, url: &str) -> Result<usize> {
    let doc = fetcher.fetch(url)?;
    let records = table::scan(&doc);
    ingest(&records, store)
}

/// Insert the active records as a single batch. Inactive nodes are dropped.
pub fn ingest(records: &[NodeRecord], store: &mut dyn NodeStore) -> Result<usize> {
    let rows: Vec<NodeRow> = records.iter().filter(|r| r.active).map(NodeRow::from).collect();
    info!("active node count: {} (of {})", rows.len(), records.len());
    Ok(store.batch_insert(&rows)?)
}
