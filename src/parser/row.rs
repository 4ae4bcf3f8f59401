use scraper::{ElementRef, Node};
use tracing::{debug, warn};

use super::units::{bandwidth_to_mbps, capacity_to_gib};
use super::NodeRecord;
use crate::error::RowError;

// Column layout of the stats table.
const COL_ID: usize = 0;
const COL_ISP: usize = 2;
const COL_LOCATION: usize = 3;
const COL_DISK: usize = 4;
const COL_TTFB: usize = 7;
const COL_UPLOAD: usize = 10;

const DOWN_CLASS: &str = "down";
const TTFB_WINDOW_MARKER: &str = "24h";

/// Extract a record from one `<tr>`.
///
/// Individual fields (the id included) degrade to zero/empty values when their
/// cell is missing or malformed. Only a row without any cells is rejected.
pub fn extract(tr: ElementRef<'_>) -> Result<NodeRecord, RowError> {
    let row = RowCells::new(tr)?;
    let (city, country) = row.location();
    let (traffic_gib, bandwidth_mbps) = row.upload();

    Ok(NodeRecord {
        id: row.id.clone(),
        active: !row.is_down(),
        isp: row.isp(),
        city,
        country,
        disk_gib: row.disk(),
        ttfb_ms: row.ttfb(),
        traffic_gib,
        bandwidth_mbps,
        weight: row.weight(),
        raw_markup: format!("<tr>{}</tr>", tr.inner_html()),
    })
}

/// The cells of one row, with named accessors for each column.
pub struct RowCells<'a> {
    id: String,
    cells: Vec<ElementRef<'a>>,
}

impl<'a> RowCells<'a> {
    pub fn new(tr: ElementRef<'a>) -> Result<Self, RowError> {
        let cells: Vec<ElementRef<'a>> = child_elements(tr)
            .filter(|el| matches!(el.value().name(), "td" | "th"))
            .collect();
        let first = *cells.first().ok_or(RowError::NoCells)?;

        // The id lives in the first element of the first cell.
        let id = child_elements(first).next().map(text_of).unwrap_or_default();
        if id.is_empty() {
            warn!("row has no node id: {:?}", text_of(first));
        }
        Ok(RowCells { id, cells })
    }

    /// The third element of the id cell carries the `down` class for
    /// nodes the page reports as offline.
    pub fn is_down(&self) -> bool {
        self.cell(COL_ID, "status")
            .and_then(|cell| child_elements(cell).nth(2))
            .is_some_and(|el| el.value().classes().any(|c| c == DOWN_CLASS))
    }

    pub fn isp(&self) -> String {
        let Some(cell) = self.cell(COL_ISP, "isp") else {
            return String::new();
        };
        match segments(cell).into_iter().nth(1) {
            Some(isp) => isp,
            None => {
                warn!(node = %self.id, "isp cell has no line break: {:?}", text_of(cell));
                String::new()
            }
        }
    }

    /// (city, country)
    pub fn location(&self) -> (String, String) {
        let Some(cell) = self.cell(COL_LOCATION, "location") else {
            return (String::new(), String::new());
        };
        let mut parts = segments(cell).into_iter();
        let city = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_else(|| {
            warn!(node = %self.id, "location cell has no country: {:?}", city);
            String::new()
        });
        (city, country)
    }

    /// Disk capacity in GiB. The cell reads like "5.2 TiB (37%)<br>…".
    pub fn disk(&self) -> u32 {
        let Some(cell) = self.cell(COL_DISK, "disk") else {
            return 0;
        };
        let first = segments(cell).into_iter().next().unwrap_or_default();
        capacity_to_gib(before(&first, '(').trim())
    }

    /// Time to first byte in ms. The cell reads like "1h: 210 ms 24h: 190 ms";
    /// the value ahead of the 24h marker is taken.
    pub fn ttfb(&self) -> u32 {
        let Some(cell) = self.cell(COL_TTFB, "ttfb") else {
            return 0;
        };
        let text: String = cell.text().collect();
        let head = text.split(TTFB_WINDOW_MARKER).next().unwrap_or_default();
        let value = head.split(':').nth(1).unwrap_or_default().trim();
        value.parse().unwrap_or_else(|_| {
            warn!(node = %self.id, "invalid ttfb value: {:?}", text.trim());
            0
        })
    }

    /// (traffic GiB, bandwidth Mbps) from a cell like "3 TiB @ 120 Mbps (avg)".
    pub fn upload(&self) -> (u32, u32) {
        let Some(cell) = self.cell(COL_UPLOAD, "upload") else {
            return (0, 0);
        };
        let text: String = cell.text().collect();
        let mut parts = text.split('@');
        let traffic = capacity_to_gib(parts.next().unwrap_or_default().trim());
        let bandwidth = match parts.next() {
            Some(rest) => bandwidth_to_mbps(before(rest.trim(), '(').trim()),
            None => {
                warn!(node = %self.id, "upload cell has no bandwidth: {:?}", text.trim());
                0
            }
        };
        (traffic, bandwidth)
    }

    /// Scheduling weight from the last cell, or -1 if it is not an integer.
    pub fn weight(&self) -> i64 {
        let text = self.cells.last().map(|c| text_of(*c)).unwrap_or_default();
        text.parse().unwrap_or_else(|_| {
            debug!(node = %self.id, "weight is not an integer: {:?}", text);
            -1
        })
    }

    fn cell(&self, idx: usize, field: &str) -> Option<ElementRef<'a>> {
        let cell = self.cells.get(idx).copied();
        if cell.is_none() {
            warn!(
                node = %self.id,
                "missing {} cell (index {}, row has {})",
                field,
                idx,
                self.cells.len()
            );
        }
        cell
    }
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn before(s: &str, delim: char) -> &str {
    s.split(delim).next().unwrap_or_default()
}

/// Split a cell's content at every `<br>`, however deeply nested. Each
/// segment is the whitespace-collapsed text between breaks.
pub fn segments(cell: ElementRef<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Element(el) if el.name() == "br" => {
                out.push(collapse_ws(&current));
                current.clear();
            }
            Node::Text(text) => current.push_str(text),
            _ => {}
        }
    }
    out.push(collapse_ws(&current));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn with_row<T>(cells: &str, f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let html = format!("<table><tbody><tr>{}</tr></tbody></table>", cells);
        let doc = Html::parse_document(&html);
        let sel = Selector::parse("tbody > tr").unwrap();
        let tr = doc.select(&sel).next().unwrap();
        f(tr)
    }

    fn full_row(id_cell: &str, isp: &str, weight: &str) -> String {
        format!(
            "<td>{id_cell}</td><td>v1</td><td>{isp}</td><td>Berlin<br>DE</td>\
             <td>5GiB (50%)<br>free</td><td>-</td><td>-</td><td>1h: 40<br>24h: 42</td>\
             <td>-</td><td>-</td><td>3GiB @ 100Mbps (avg)</td><td>{weight}</td>"
        )
    }

    #[test]
    fn extracts_all_fields() {
        let cells = full_row(
            r#"<a>n1</a><span>ok</span><span class="dot"></span>"#,
            "X<br>Acme",
            "7",
        );
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.id, "n1");
        assert!(rec.active);
        assert_eq!(rec.isp, "Acme");
        assert_eq!(rec.city, "Berlin");
        assert_eq!(rec.country, "DE");
        assert_eq!(rec.disk_gib, 5);
        assert_eq!(rec.ttfb_ms, 40);
        assert_eq!(rec.traffic_gib, 3);
        assert_eq!(rec.bandwidth_mbps, 100);
        assert_eq!(rec.weight, 7);
        assert!(rec.raw_markup.starts_with("<tr><td>"));
        assert!(rec.raw_markup.ends_with("</td></tr>"));
    }

    #[test]
    fn down_class_marks_inactive() {
        let cells = full_row(
            r#"<a>n2</a><span>ok</span><span class="dot down"></span>"#,
            "X<br>Acme",
            "bad",
        );
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert!(!rec.active);
        assert_eq!(rec.weight, -1);
    }

    #[test]
    fn down_class_only_counts_on_third_element() {
        let cells = full_row(r#"<a class="down">n3</a><span></span>"#, "X<br>Acme", "1");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert!(rec.active);
    }

    #[test]
    fn isp_without_line_break_is_empty() {
        let cells = full_row("<a>n4</a>", "Acme", "3");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.isp, "");
        assert_eq!(rec.country, "DE");
        assert_eq!(rec.disk_gib, 5);
        assert_eq!(rec.bandwidth_mbps, 100);
        assert_eq!(rec.weight, 3);
    }

    #[test]
    fn isp_segment_text_is_cleaned() {
        let cells = full_row("<a>n5</a>", "AS3320<br/>\n  <span>Deutsche  Telekom</span> ", "3");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.isp, "Deutsche Telekom");
    }

    #[test]
    fn short_row_degrades_fields() {
        let rec = with_row("<td><a>n6</a></td><td>v1</td><td>X<br>Acme</td>", |tr| {
            extract(tr).unwrap()
        });
        assert_eq!(rec.isp, "Acme");
        assert_eq!(rec.city, "");
        assert_eq!(rec.country, "");
        assert_eq!(rec.disk_gib, 0);
        assert_eq!(rec.ttfb_ms, 0);
        assert_eq!((rec.traffic_gib, rec.bandwidth_mbps), (0, 0));
        // last cell is the ISP cell here
        assert_eq!(rec.weight, -1);
    }

    #[test]
    fn malformed_metrics_degrade_to_zero() {
        let cells = "<td><a>n7</a></td><td></td><td>X<br>Acme</td><td>Paris</td>\
                     <td>lots</td><td></td><td></td><td>n/a</td><td></td><td></td>\
                     <td>12 GiB</td><td>0</td>";
        let rec = with_row(cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.city, "Paris");
        assert_eq!(rec.country, "");
        assert_eq!(rec.disk_gib, 0);
        assert_eq!(rec.ttfb_ms, 0);
        assert_eq!(rec.traffic_gib, 12);
        assert_eq!(rec.bandwidth_mbps, 0);
        assert_eq!(rec.weight, 0);
    }

    #[test]
    fn ttfb_takes_value_before_24h_window() {
        let cells = full_row("<a>n8</a>", "X<br>Acme", "1")
            .replace("1h: 40<br>24h: 42", "1h:  215 <br>24h: 230");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.ttfb_ms, 215);
    }

    #[test]
    fn rejects_rows_without_cells() {
        let doc = Html::parse_document("<table><tbody><tr></tr></tbody></table>");
        let sel = Selector::parse("tr").unwrap();
        let tr = doc.select(&sel).next().unwrap();
        assert_eq!(extract(tr).unwrap_err(), RowError::NoCells);
    }

    #[test]
    fn empty_id_keeps_the_row() {
        let cells = full_row("<a></a><span></span><span></span>", "X<br>Acme", "7");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.id, "");
        assert_eq!(rec.isp, "Acme");
        assert_eq!(rec.weight, 7);

        // bare text in the id cell is not an id
        let rec = with_row("<td>n9</td><td>x</td>", |tr| extract(tr).unwrap());
        assert_eq!(rec.id, "");
    }

    #[test]
    fn breaks_inside_wrappers_split_segments() {
        let cells = full_row("<a>n10</a>", "<span>AS1<br>Acme</span>", "1")
            .replace("<td>Berlin<br>DE</td>", "<td><div>Berlin<br><b>DE</b></div></td>");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.isp, "Acme");
        assert_eq!(rec.city, "Berlin");
        assert_eq!(rec.country, "DE");
    }

    #[test]
    fn ttfb_with_nothing_before_24h_is_zero() {
        let cells = full_row("<a>n11</a>", "X<br>Acme", "1")
            .replace("1h: 40<br>24h: 42", "24h: 42 ms");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.ttfb_ms, 0);
        assert_eq!(rec.disk_gib, 5);
    }

    #[test]
    fn weight_beyond_32_bits() {
        let cells = full_row("<a>n12</a>", "X<br>Acme", " 3000000000 ");
        let rec = with_row(&cells, |tr| extract(tr).unwrap());
        assert_eq!(rec.weight, 3_000_000_000);
    }

    #[test]
    fn segments_split_on_breaks() {
        let segs = with_row("<td> a <b>b</b><br>c<br/>  </td>", |tr| {
            segments(child_elements(tr).next().unwrap())
        });
        assert_eq!(segs, vec!["a b", "c", ""]);

        let segs = with_row("<td><p>a<i>b<br>c</i></p><br>d</td>", |tr| {
            segments(child_elements(tr).next().unwrap())
        });
        assert_eq!(segs, vec!["ab", "c", "d"]);
    }
}
