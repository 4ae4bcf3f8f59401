pub mod row;
pub mod table;
pub mod units;

/// One row of the stats table, normalized to canonical units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: String,
    pub active: bool,
    pub isp: String,
    pub city: String,
    pub country: String,
    pub disk_gib: u32,
    pub ttfb_ms: u32,
    pub traffic_gib: u32,
    pub bandwidth_mbps: u32,
    /// -1 when the cell is not an integer.
    pub weight: i64,
    /// The row's markup wrapped in `<tr>`; reporting only, never persisted.
    pub raw_markup: String,
}
