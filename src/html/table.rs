//! Table-to-record extraction
//!
//! All extractors are total: a missing table or a table without rows gives
//! an empty result instead of an error.

use super::text::clean_text;
use super::Node;
use std::collections::BTreeMap;

/// One record: header label to cell text
pub type Row = BTreeMap<String, String>;

/// Label used for the first column of a transposed table when its corner
/// cell is blank
pub const REPORT_PERIOD_LABEL: &str = "报告期";

/// Extract the first table matching `selector` as one record per data row.
///
/// Headers come from `thead th` when present (data rows are then
/// `tbody tr`); otherwise the first row supplies them. Cells pair with
/// headers by position; a row without any non-empty value is dropped.
pub fn extract_table<N: Node>(root: N, selector: &str) -> Vec<Row> {
    let Some(table) = root.first(selector) else {
        return Vec::new();
    };

    let explicit: Vec<String> = table
        .query("thead th")
        .iter()
        .map(|th| clean_text(&th.inner_text()))
        .collect();

    let (headers, rows) = if explicit.is_empty() {
        let mut rows = table.query("tr");
        if rows.is_empty() {
            return Vec::new();
        }
        let header_row = rows.remove(0);
        let headers = header_row
            .query("th, td")
            .iter()
            .map(|cell| clean_text(&cell.inner_text()))
            .collect();
        (headers, rows)
    } else {
        (explicit, table.query("tbody tr"))
    };

    rows.into_iter()
        .filter_map(|row| pair_cells(&headers, row))
        .collect()
}

fn pair_cells<N: Node>(headers: &[String], row: N) -> Option<Row> {
    let mut record = Row::new();
    for (header, cell) in headers.iter().zip(row.query("td")) {
        if header.is_empty() {
            continue;
        }
        record.insert(header.clone(), clean_text(&cell.inner_text()));
    }

    if record.values().all(|v| v.is_empty()) {
        None
    } else {
        Some(record)
    }
}

/// Extract a table whose columns are records and whose rows are fields.
///
/// The first row holds the corner label and one column heading (usually a
/// report date) per record; every later row is `label, value, value, ...`.
pub fn extract_transposed_table<N: Node>(root: N, selector: &str) -> Vec<Row> {
    let Some(table) = root.first(selector) else {
        return Vec::new();
    };

    let rows = table.query("tr");
    let Some((header_row, field_rows)) = rows.split_first() else {
        return Vec::new();
    };

    let headers: Vec<String> = header_row
        .query("th, td")
        .iter()
        .map(|cell| clean_text(&cell.inner_text()))
        .collect();
    if headers.len() < 2 {
        return Vec::new();
    }

    let corner = if headers[0].is_empty() {
        REPORT_PERIOD_LABEL.to_string()
    } else {
        headers[0].clone()
    };

    let mut records: Vec<Row> = headers[1..]
        .iter()
        .map(|column| Row::from([(corner.clone(), column.clone())]))
        .collect();

    for row in field_rows {
        let cells = row.query("th, td");
        let Some((label_cell, values)) = cells.split_first() else {
            continue;
        };
        let label = clean_text(&label_cell.inner_text());
        if label.is_empty() {
            continue;
        }
        for (record, cell) in records.iter_mut().zip(values) {
            record.insert(label.clone(), clean_text(&cell.inner_text()));
        }
    }

    records
}

/// Read two-column rows (`key`, `value`) of every match of `selector` into
/// one mapping. Rows with fewer than two cells or a blank key are skipped.
pub fn extract_key_values<N: Node>(root: N, selector: &str) -> Row {
    let mut result = Row::new();
    for table in root.query(selector) {
        for row in table.query("tr") {
            let cells = row.query("th, td");
            if cells.len() < 2 {
                continue;
            }
            let key = clean_text(&cells[0].inner_text());
            if key.is_empty() {
                continue;
            }
            result.insert(key, clean_text(&cells[1].inner_text()));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Document;

    #[test]
    fn test_first_row_headers() {
        let doc = Document::parse(
            r#"<div id="m"><table>
                <tr><td>总股本</td><td>流通股本</td><td>统计日期</td></tr>
                <tr><td> 1000万 </td><td>500万</td><td>2024-03</td></tr>
                <tr><td>2000万</td><td>800万</td><td>2023-12-31</td></tr>
            </table></div>"#,
        );
        let rows = extract_table(doc.root(), "#m table");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["总股本"], "1000万");
        assert_eq!(rows[0]["统计日期"], "2024-03");
        assert_eq!(rows[1]["流通股本"], "800万");
    }

    #[test]
    fn test_thead_headers() {
        let doc = Document::parse(
            r#"<table class="t">
                <thead><tr><th>股东名称</th><th>持股数</th></tr></thead>
                <tbody>
                  <tr><td>张三</td><td>1,000</td></tr>
                  <tr><td></td><td></td></tr>
                </tbody>
            </table>"#,
        );
        let rows = extract_table(doc.root(), "table.t");
        assert_eq!(rows.len(), 1, "blank row must be dropped");
        assert_eq!(rows[0]["股东名称"], "张三");
        assert_eq!(rows[0]["持股数"], "1,000");
    }

    #[test]
    fn test_missing_table_is_empty() {
        let doc = Document::parse("<p>nothing here</p>");
        assert!(extract_table(doc.root(), "table").is_empty());
        assert!(extract_transposed_table(doc.root(), ".finance-tab").is_empty());
        assert!(extract_key_values(doc.root(), "table").is_empty());
    }

    #[test]
    fn test_short_row_omits_fields() {
        let doc = Document::parse(
            "<table><tr><td>a</td><td>b</td><td>c</td></tr><tr><td>1</td></tr></table>",
        );
        let rows = extract_table(doc.root(), "table");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["a"], "1");
        assert!(!rows[0].contains_key("b"));
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let doc = Document::parse(
            "<table><tr><td>x</td><td>x</td></tr><tr><td>first</td><td>second</td></tr></table>",
        );
        let rows = extract_table(doc.root(), "table");
        assert_eq!(rows[0]["x"], "second");
    }

    #[test]
    fn test_rejoin_reproduces_cleaned_cells() {
        let cells = ["  中科\n软件 ", "12.50", "2024-01-02"];
        let html = format!(
            "<table><tr><td>名称</td><td>价格</td><td>日期</td></tr><tr><td>{}</td><td>{}</td><td>{}</td></tr></table>",
            cells[0], cells[1], cells[2]
        );
        let doc = Document::parse(&html);
        let rows = extract_table(doc.root(), "table");
        let rejoined: Vec<&str> = ["名称", "价格", "日期"]
            .iter()
            .map(|h| rows[0][*h].as_str())
            .collect();
        let expected: Vec<String> = cells.iter().map(|c| clean_text(c)).collect();
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn test_transposed_table() {
        let doc = Document::parse(
            r#"<table class="finance-tab">
                <tr><th>报告期</th><th>2023-12-31</th><th>2022-12-31</th></tr>
                <tr><th>营业收入</th><td>1,200</td><td>900</td></tr>
                <tr><th>净利润</th><td>-</td><td>80</td></tr>
                <tr><th></th><td>ignored</td><td>ignored</td></tr>
            </table>"#,
        );
        let records = extract_transposed_table(doc.root(), ".finance-tab");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["报告期"], "2023-12-31");
        assert_eq!(records[0]["营业收入"], "1,200");
        assert_eq!(records[0]["净利润"], "-");
        assert_eq!(records[1]["报告期"], "2022-12-31");
        assert_eq!(records[1]["净利润"], "80");
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn test_transposed_blank_corner() {
        let doc = Document::parse(
            "<table><tr><td></td><td>2024-06-30</td></tr><tr><td>总资产</td><td>10</td></tr></table>",
        );
        let records = extract_transposed_table(doc.root(), "table");
        assert_eq!(records[0][REPORT_PERIOD_LABEL], "2024-06-30");
        assert_eq!(records[0]["总资产"], "10");
    }

    #[test]
    fn test_key_values() {
        let doc = Document::parse(
            r#"<table id="kv">
                <tr><td>总股本</td><td>1000万</td></tr>
                <tr><td>流通股本</td><td>500万</td></tr>
                <tr><td>孤立单元格</td></tr>
                <tr><td> </td><td>no key</td></tr>
            </table>"#,
        );
        let kv = extract_key_values(doc.root(), "#kv");
        let expected = Row::from([
            ("总股本".to_string(), "1000万".to_string()),
            ("流通股本".to_string(), "500万".to_string()),
        ]);
        assert_eq!(kv, expected);
    }

    #[test]
    fn test_key_values_with_th_labels() {
        let doc = Document::parse(
            "<table><tr><th>成交价格（元）</th><td>3.20</td></tr></table>",
        );
        let kv = extract_key_values(doc.root(), "table");
        assert_eq!(kv["成交价格（元）"], "3.20");
    }
}
