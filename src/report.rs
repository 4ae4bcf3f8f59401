use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::parser::{table, NodeRecord};

/// Read API response: active count, raw rows and grouped counts.
#[derive(Debug, Serialize)]
pub struct Report {
    pub count: usize,
    pub nodes: Vec<NodeHtml>,
    #[serde(flatten)]
    pub summary: SummaryCounts,
}

#[derive(Debug, Serialize)]
pub struct NodeHtml {
    pub id: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryCounts {
    pub isps: Vec<GroupCount>,
    pub regions: Vec<GroupCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

pub fn build_report(fetcher: &dyn Fetcher, url: &str) -> Result<Report> {
    let doc = fetcher.fetch(url)?;
    Ok(summarize(&table::scan(&doc)))
}

/// Count active nodes and group every node (active or not) by ISP and country.
pub fn summarize(records: &[NodeRecord]) -> Report {
    let mut isps: HashMap<&str, usize> = HashMap::new();
    let mut regions: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *isps.entry(r.isp.as_str()).or_default() += 1;
        *regions.entry(r.country.as_str()).or_default() += 1;
    }

    Report {
        count: records.iter().filter(|r| r.active).count(),
        nodes: records
            .iter()
            .map(|r| NodeHtml {
                id: r.id.clone(),
                html: r.raw_markup.clone(),
            })
            .collect(),
        summary: SummaryCounts {
            isps: by_count_desc(isps),
            regions: by_count_desc(regions),
        },
    }
}

// Ties come out in hash order.
fn by_count_desc(counts: HashMap<&str, usize>) -> Vec<GroupCount> {
    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(name, count)| GroupCount {
            name: name.to_string(),
            count,
        })
        .collect();
    groups.sort_unstable_by(|a, b| b.count.cmp(&a.count));
    groups
}
