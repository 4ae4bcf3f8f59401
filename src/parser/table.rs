use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{row, NodeRecord};

static TBODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());

/// Walk the first table body and extract one record per row, in document order.
/// Rows that cannot be read are skipped with a warning.
pub fn scan(doc: &Html) -> Vec<NodeRecord> {
    let Some(tbody) = doc.select(&TBODY).next() else {
        warn!("No <tbody> found in stats page");
        return Vec::new();
    };

    let mut records = Vec::new();
    let rows = tbody
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr");
    for (i, tr) in rows.enumerate() {
        match row::extract(tr) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping row {}: {}", i, e),
        }
    }
    debug!("Scanned {} rows", records.len());
    records
}
