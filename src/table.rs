// dsctl - CLI for the Synology DiskStation Web API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Tables built from arbitrary JSON objects.
//!
//! Rows rarely share one key set (a task only reports `additional` fields the
//! server knows about), so building a table takes two passes: the sorted union
//! of all keys becomes the column set, then every row is filled out to it.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = Notice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Notice::InvalidSortOrder(other.to_string())),
        }
    }
}

/// A display instruction that could not be honoured. The table is still
/// usable; the filter or sort was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UnknownColumn(String),
    InvalidSortOrder(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UnknownColumn(column) => write!(f, "[{column}] isn't a column"),
            Notice::InvalidSortOrder(order) => write!(
                f,
                "[{order}] isn't a valid sort option. Specify [desc] or [asc]"
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
    notices: Vec<Notice>,
}

impl Table {
    /// Tabulate a JSON payload: an object becomes a single row, an array of
    /// objects one row per object. Array items that are not objects are
    /// skipped; any other value becomes a one-cell table.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_objects(std::slice::from_ref(map)),
            Value::Array(items) => {
                let objects: Vec<Map<String, Value>> = items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect();
                Self::from_objects(&objects)
            }
            other => {
                let mut single = Map::new();
                single.insert("value".to_string(), other.clone());
                Self::from_objects(&[single])
            }
        }
    }

    pub fn from_objects(objects: &[Map<String, Value>]) -> Self {
        let columns = collect_columns(objects);
        let rows = fill_rows(objects, &columns);
        let headers = columns.iter().map(|c| display_name(c)).collect();
        Self {
            columns,
            headers,
            rows,
            notices: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep rows whose `field` cell contains `needle`. `field` may be given
    /// as a raw key or a display name in any case.
    pub fn filter(&mut self, field: &str, needle: &str) {
        let wanted = normalize_key(field);
        let Some(idx) = self.columns.iter().position(|c| normalize_key(c) == wanted) else {
            self.notices.push(Notice::UnknownColumn(display_name(field)));
            return;
        };
        self.rows.retain(|row| cell_text(&row[idx]).contains(needle));
    }

    /// Order rows by the column whose display name matches `field`. `order`
    /// must be exactly `asc` or `desc`; otherwise, or when the column does not
    /// exist, the rows keep their order.
    pub fn sort(&mut self, field: &str, order: &str) {
        let order = match order.parse::<SortOrder>() {
            Ok(order) => order,
            Err(notice) => {
                self.notices.push(notice);
                return;
            }
        };
        let header = display_name(field);
        let Some(idx) = self.headers.iter().position(|h| *h == header) else {
            self.notices.push(Notice::UnknownColumn(header));
            return;
        };

        self.rows.sort_by(|a, b| {
            let ord = compare_cells(&a[idx], &b[idx]);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }

        write_line(f, self.headers.iter().map(String::as_str), &widths)?;
        let separators: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, separators.iter().map(String::as_str), &widths)?;
        for row in &cells {
            write_line(f, row.iter().map(String::as_str), &widths)?;
        }
        Ok(())
    }
}

fn write_line<'a>(
    f: &mut fmt::Formatter<'_>,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(f, "{}", line.trim_end())
}

/// First pass: the sorted union of keys across all objects.
pub fn collect_columns(objects: &[Map<String, Value>]) -> Vec<String> {
    objects
        .iter()
        .flat_map(|obj| obj.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Second pass: one cell per column for every object, `null` where the
/// object lacks the key.
pub fn fill_rows(objects: &[Map<String, Value>], columns: &[String]) -> Vec<Vec<Value>> {
    objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect()
}

/// `size_downloaded` -> `Size Downloaded`.
///
/// A letter is upper-cased when it follows a non-letter and lower-cased
/// otherwise, so digits start a new word too (`emule2x` -> `Emule2X`).
pub fn display_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_letter = false;
    for ch in key.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

fn normalize_key(key: &str) -> String {
    key.replace(' ', "_").to_lowercase()
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Blank cells first, then numbers by value, then everything else by its
/// rendered text. Ranking by kind keeps mixed columns totally ordered.
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    sort_rank(a).cmp(&sort_rank(b)).then_with(|| match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => cell_text(a).cmp(&cell_text(b)),
    })
}

fn sort_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(table: &Table, header: &str) -> Vec<String> {
        let idx = table.headers().iter().position(|h| h == header).unwrap();
        table.rows().iter().map(|r| cell_text(&r[idx])).collect()
    }

    fn sizes() -> Table {
        Table::from_value(&json!([
            {"id": "a", "size": "100"},
            {"id": "b", "size": "205"},
            {"id": "c", "size": "3"}
        ]))
    }

    #[test]
    fn display_names_title_case_words() {
        assert_eq!(display_name("size_downloaded"), "Size Downloaded");
        assert_eq!(display_name("id"), "Id");
        assert_eq!(display_name("seedelapsed"), "Seedelapsed");
        assert_eq!(display_name("MAX_tasks"), "Max Tasks");
        assert_eq!(display_name("emule2x_enabled"), "Emule2X Enabled");
    }

    #[test]
    fn column_union_is_sorted_by_raw_key_and_rectangular() {
        let table = Table::from_value(&json!([{"b": 2, "a": 1}, {"c": 4, "b": 3}]));
        assert_eq!(table.headers(), ["A", "B", "C"]);
        assert_eq!(table.rows()[0], vec![json!(1), json!(2), Value::Null]);
        assert_eq!(table.rows()[1], vec![Value::Null, json!(3), json!(4)]);
    }

    #[test]
    fn columns_sort_by_raw_key_not_display_name() {
        let objects = vec![
            json!({"alpha": 1}).as_object().unwrap().clone(),
            json!({"Zeta": 2}).as_object().unwrap().clone(),
        ];
        assert_eq!(collect_columns(&objects), vec!["Zeta", "alpha"]);
        assert_eq!(Table::from_objects(&objects).headers(), ["Zeta", "Alpha"]);
    }

    #[test]
    fn single_object_is_a_property_sheet() {
        let table = Table::from_value(&json!({"version_string": "3.x", "is_manager": true}));
        assert_eq!(table.headers(), ["Is Manager", "Version String"]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0], vec![json!(true), json!("3.x")]);
    }

    #[test]
    fn filter_keeps_substring_matches() {
        let mut table = sizes();
        table.filter("size", "10");
        assert_eq!(column(&table, "Id"), ["a"]);
        assert!(table.notices().is_empty());
    }

    #[test]
    fn filter_resolves_display_names_case_insensitively() {
        let mut table = Table::from_value(&json!([
            {"size_downloaded": 10},
            {"size_downloaded": 20}
        ]));
        table.filter("Size Downloaded", "2");
        assert_eq!(table.rows().len(), 1);

        let mut table = sizes();
        table.filter("SIZE", "3");
        assert_eq!(column(&table, "Id"), ["c"]);
    }

    #[test]
    fn filter_on_unknown_column_is_skipped_with_notice() {
        let mut table = sizes();
        table.filter("speed", "1");
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.notices(), [Notice::UnknownColumn("Speed".into())]);
    }

    #[test]
    fn filter_matches_blank_cells_as_empty_text() {
        let mut table = Table::from_value(&json!([{"a": "x"}, {"b": "y"}]));
        table.filter("a", "x");
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn sort_unknown_column_keeps_order_with_one_notice() {
        let mut table = sizes();
        table.sort("nope", "asc");
        assert_eq!(column(&table, "Id"), ["a", "b", "c"]);
        assert_eq!(table.notices().len(), 1);
        assert_eq!(table.notices()[0].to_string(), "[Nope] isn't a column");
    }

    #[test]
    fn sort_rejects_unknown_direction() {
        let mut table = sizes();
        table.sort("id", "up");
        assert_eq!(column(&table, "Id"), ["a", "b", "c"]);
        assert_eq!(
            table.notices()[0].to_string(),
            "[up] isn't a valid sort option. Specify [desc] or [asc]"
        );
    }

    #[test]
    fn sort_desc_reverses_asc() {
        let mut table = Table::from_value(&json!([
            {"id": "b", "size": 20},
            {"id": "c", "size": 3},
            {"id": "a", "size": 100}
        ]));
        table.sort("size", "asc");
        assert_eq!(column(&table, "Id"), ["c", "b", "a"]);
        table.sort("Size", "desc");
        assert_eq!(column(&table, "Id"), ["a", "b", "c"]);
        assert!(table.notices().is_empty());
    }

    #[test]
    fn sort_strings_lexically() {
        let mut table = sizes();
        table.sort("size", "asc");
        assert_eq!(column(&table, "Size"), ["100", "205", "3"]);
    }

    #[test]
    fn sort_mixed_numbers_and_text_groups_by_kind() {
        let rows: Vec<Value> = (0..150)
            .map(|n| {
                let size = match n % 3 {
                    0 => json!(n),
                    1 => json!(format!("{n}x")),
                    _ => Value::Null,
                };
                json!({"id": n, "size": size})
            })
            .collect();
        let mut table = Table::from_value(&Value::Array(rows));
        let idx = table.headers().iter().position(|h| h == "Size").unwrap();

        table.sort("size", "asc");
        let kinds: Vec<u8> = table.rows().iter().map(|r| sort_rank(&r[idx])).collect();
        assert!(kinds.windows(2).all(|w| w[0] <= w[1]));
        let numbers: Vec<f64> = table.rows().iter().filter_map(|r| r[idx].as_f64()).collect();
        assert_eq!(numbers.len(), 50);
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(cell_text(&table.rows()[50][idx]), "0");
        assert_eq!(cell_text(&table.rows()[149][idx]), "97x");

        table.sort("size", "desc");
        let kinds: Vec<u8> = table.rows().iter().map(|r| sort_rank(&r[idx])).collect();
        assert!(kinds.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(cell_text(&table.rows()[0][idx]), "97x");
        assert_eq!(cell_text(&table.rows()[149][idx]), "");
        assert!(table.notices().is_empty());
    }

    #[test]
    fn renders_aligned_columns() {
        let table = Table::from_value(&json!([
            {"id": "dbid_1", "status": "downloading"},
            {"id": "dbid_22", "status": "finished"}
        ]));
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Id       Status");
        assert_eq!(lines[1], "-------  -----------");
        assert_eq!(lines[2], "dbid_1   downloading");
        assert_eq!(lines[3], "dbid_22  finished");
    }

    #[test]
    fn nested_values_render_as_json() {
        let table = Table::from_value(&json!({"additional": {"detail": {}}}));
        assert_eq!(cell_text(&table.rows()[0][0]), r#"{"detail":{}}"#);
    }
}
