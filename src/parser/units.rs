use tracing::warn;

const GIB: u64 = 1 << 30;

const SIZE_SUFFIXES: &[(&str, u64)] = &[
    ("kb", 1 << 10),
    ("mb", 1 << 20),
    ("gb", 1 << 30),
    ("tb", 1 << 40),
    ("pb", 1 << 50),
];

const BANDWIDTH_SUFFIXES: &[(&str, u64)] = &[("mbps", 1), ("gbps", 1000)];

/// Convert a human-readable size such as "10.5GiB" or "800 MB" to whole GiB.
///
/// Unparsable input yields 0 and a warning; this never fails the caller.
pub fn capacity_to_gib(text: &str) -> u32 {
    let value = text.trim().to_lowercase().replacen('i', "", 1);
    match scale(&value, SIZE_SUFFIXES) {
        Some(bytes) => saturate(bytes / GIB),
        None => {
            warn!("Invalid size value: {:?}", text);
            0
        }
    }
}

/// Convert a bandwidth such as "200Mbps" or "1.5Gbps" to whole Mbps.
pub fn bandwidth_to_mbps(text: &str) -> u32 {
    let value = text.trim().to_lowercase();
    match scale(&value, BANDWIDTH_SUFFIXES) {
        Some(mbps) => saturate(mbps),
        None => {
            warn!("Invalid bandwidth value: {:?}", text);
            0
        }
    }
}

/// Split off a known suffix, parse the numeric prefix and apply the multiplier.
/// The input must be strictly longer than the suffix.
fn scale(value: &str, table: &[(&str, u64)]) -> Option<u64> {
    table.iter().find_map(|&(suffix, multiplier)| {
        let number = value.strip_suffix(suffix)?.trim();
        if number.is_empty() {
            return None;
        }
        let size: f64 = number.parse().ok()?;
        let scaled = (multiplier as f64 * size).floor();
        (scaled.is_finite() && scaled >= 0.0).then_some(scaled as u64)
    })
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
