//! Table service (§4.14): convert flat OID/value lists into structured rows.
//!
//! Pure: no I/O, no async. Row index is the OID suffix after `T ++ [entry,
//! column]`; column is the sub-id immediately following `T ++ [entry]`.

use std::collections::BTreeMap;

use crate::oid::Oid;
use crate::value::Value;

/// A composite row index — the OID suffix after the entry/column prefix, may
/// be multi-component (e.g. an IP address in `ipNetToMediaTable`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowIndex(pub Vec<u32>);

impl std::fmt::Display for RowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// `row-index → (column → value)`.
pub type Table = BTreeMap<RowIndex, BTreeMap<u32, Value>>;

/// Build a [`Table`] from a flat list of `(oid, value)` pairs under table
/// base-OID `base`. Pairs whose OID doesn't have `base` as a prefix, or whose
/// suffix is shorter than `[entry, column]`, are skipped.
pub fn build_table(pairs: &[(Oid, Value)], base: &Oid) -> Table {
    let mut table: Table = BTreeMap::new();
    for (oid, value) in pairs {
        let Some(suffix) = oid.strip_prefix(base) else {
            continue;
        };
        // suffix = [entry, column, ...row_index]
        if suffix.len() < 2 {
            continue;
        }
        let column = suffix[1];
        let row = RowIndex(suffix[2..].to_vec());
        table.entry(row).or_default().insert(column, value.clone());
    }
    table
}

/// A materialized record: the row index plus named columns, per `names`
/// (column sub-id → field name).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub index: RowIndex,
    pub fields: BTreeMap<String, Value>,
}

pub fn to_records(table: &Table, names: &BTreeMap<u32, String>) -> Vec<Record> {
    table
        .iter()
        .map(|(row, columns)| {
            let fields = columns
                .iter()
                .filter_map(|(col, value)| names.get(col).map(|name| (name.clone(), value.clone())))
                .collect();
            Record {
                index: row.clone(),
                fields,
            }
        })
        .collect()
}

/// All values for one column across every row, in row order.
pub fn select_column(table: &Table, column: u32) -> Vec<(RowIndex, Value)> {
    table
        .iter()
        .filter_map(|(row, cols)| cols.get(&column).map(|v| (row.clone(), v.clone())))
        .collect()
}

/// Rows whose `column` value satisfies `predicate`.
pub fn filter_rows<P>(table: &Table, column: u32, predicate: P) -> Table
where
    P: Fn(&Value) -> bool,
{
    table
        .iter()
        .filter(|(_, cols)| cols.get(&column).map(predicate).unwrap_or(false))
        .map(|(row, cols)| (row.clone(), cols.clone()))
        .collect()
}

/// Join strategy for [`join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Outer,
}

/// Join two tables on row-index, offsetting `right`'s column numbers by
/// `right_column_offset` to avoid collisions with `left`'s columns.
pub fn join(left: &Table, right: &Table, kind: JoinKind, right_column_offset: u32) -> Table {
    let mut out: Table = BTreeMap::new();
    let row_keys: Vec<&RowIndex> = match kind {
        JoinKind::Inner => left.keys().filter(|k| right.contains_key(*k)).collect(),
        JoinKind::Outer => {
            let mut keys: Vec<&RowIndex> = left.keys().chain(right.keys()).collect();
            keys.sort();
            keys.dedup();
            keys
        }
    };
    for row in row_keys {
        let mut merged = BTreeMap::new();
        if let Some(cols) = left.get(row) {
            merged.extend(cols.iter().map(|(c, v)| (*c, v.clone())));
        }
        if let Some(cols) = right.get(row) {
            merged.extend(cols.iter().map(|(c, v)| (c + right_column_offset, v.clone())));
        }
        out.insert(row.clone(), merged);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    CountEqual,
}

/// Aggregate a numeric column; `CountEqual` counts rows whose value equals
/// `compare` (interpreted as an integer).
pub fn aggregate_column(table: &Table, column: u32, op: Aggregate, compare: Option<i64>) -> Option<f64> {
    let values: Vec<f64> = select_column(table, column)
        .into_iter()
        .filter_map(|(_, v)| numeric_value(&v))
        .collect();
    if values.is_empty() && op != Aggregate::CountEqual {
        return None;
    }
    Some(match op {
        Aggregate::Sum => values.iter().sum(),
        Aggregate::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Aggregate::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        Aggregate::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::CountEqual => {
            let target = compare? as f64;
            values.iter().filter(|v| **v == target).count() as f64
        }
    })
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Counter32(v) | Value::Gauge32(v) | Value::Unsigned32(v) | Value::TimeTicks(v) => Some(*v as f64),
        Value::Counter64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Sort rows by one or more columns, each ascending unless listed in
/// `descending`.
pub fn sort_rows(table: &Table, columns: &[u32], descending: &[u32]) -> Vec<(RowIndex, BTreeMap<u32, Value>)> {
    let mut rows: Vec<(RowIndex, BTreeMap<u32, Value>)> =
        table.iter().map(|(r, c)| (r.clone(), c.clone())).collect();
    rows.sort_by(|(a_row, a), (b_row, b)| {
        for &col in columns {
            let av = a.get(&col).and_then(numeric_value);
            let bv = b.get(&col).and_then(numeric_value);
            let ordering = av.partial_cmp(&bv).unwrap_or(std::cmp::Ordering::Equal);
            let ordering = if descending.contains(&col) { ordering.reverse() } else { ordering };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        a_row.cmp(b_row)
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> Oid {
        Oid::parse(s).unwrap()
    }

    fn sample_if_table() -> (Table, Oid) {
        let base = oid("1.3.6.1.2.1.2.2");
        let pairs = vec![
            (oid("1.3.6.1.2.1.2.2.1.2.1"), Value::OctetString(b"eth0".to_vec())),
            (oid("1.3.6.1.2.1.2.2.1.2.2"), Value::OctetString(b"eth1".to_vec())),
            (oid("1.3.6.1.2.1.2.2.1.3.1"), Value::Integer(6)),
            (oid("1.3.6.1.2.1.2.2.1.3.2"), Value::Integer(6)),
        ];
        (build_table(&pairs, &base), base)
    }

    #[test]
    fn build_table_groups_by_row_and_column() {
        let (table, _) = sample_if_table();
        assert_eq!(table.len(), 2);
        let row1 = &table[&RowIndex(vec![1])];
        assert_eq!(row1.get(&2), Some(&Value::OctetString(b"eth0".to_vec())));
        assert_eq!(row1.get(&3), Some(&Value::Integer(6)));
    }

    #[test]
    fn to_records_includes_named_columns() {
        let (table, _) = sample_if_table();
        let mut names = BTreeMap::new();
        names.insert(2u32, "descr".to_string());
        names.insert(3u32, "type".to_string());
        let records = to_records(&table, &names);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].fields.get("descr"),
            Some(&Value::OctetString(b"eth0".to_vec()))
        );
    }

    #[test]
    fn select_column_returns_all_rows() {
        let (table, _) = sample_if_table();
        let col = select_column(&table, 2);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn filter_rows_by_predicate() {
        let (table, _) = sample_if_table();
        let filtered = filter_rows(&table, 2, |v| v == &Value::OctetString(b"eth1".to_vec()));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn join_inner_keeps_only_common_rows() {
        let (left, _) = sample_if_table();
        let mut right: Table = BTreeMap::new();
        let mut cols = BTreeMap::new();
        cols.insert(1u32, Value::Integer(1000));
        right.insert(RowIndex(vec![1]), cols);
        let joined = join(&left, &right, JoinKind::Inner, 100);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[&RowIndex(vec![1])].get(&101), Some(&Value::Integer(1000)));
    }

    #[test]
    fn aggregate_sum_and_avg() {
        let (table, _) = sample_if_table();
        assert_eq!(aggregate_column(&table, 3, Aggregate::Sum, None), Some(12.0));
        assert_eq!(aggregate_column(&table, 3, Aggregate::Avg, None), Some(6.0));
    }

    #[test]
    fn aggregate_count_equal() {
        let (table, _) = sample_if_table();
        assert_eq!(aggregate_column(&table, 3, Aggregate::CountEqual, Some(6)), Some(2.0));
    }

    #[test]
    fn sort_rows_descending_by_column() {
        let (table, _) = sample_if_table();
        let sorted = sort_rows(&table, &[2], &[2]);
        assert_eq!(sorted[0].0, RowIndex(vec![2]));
    }

    #[test]
    fn row_index_matches_s5_scenario() {
        let base = oid("1.3.6.1.2.1.2.2");
        let pairs = vec![
            (oid("1.3.6.1.2.1.2.2.1.2.1"), Value::OctetString(b"eth0".to_vec())),
            (oid("1.3.6.1.2.1.2.2.1.2.2"), Value::OctetString(b"eth1".to_vec())),
            (oid("1.3.6.1.2.1.2.2.1.3.1"), Value::Integer(6)),
            (oid("1.3.6.1.2.1.2.2.1.3.2"), Value::Integer(6)),
        ];
        let table = build_table(&pairs, &base);
        assert_eq!(
            table[&RowIndex(vec![1])].get(&2),
            Some(&Value::OctetString(b"eth0".to_vec()))
        );
        assert_eq!(table[&RowIndex(vec![1])].get(&3), Some(&Value::Integer(6)));
        assert_eq!(
            table[&RowIndex(vec![2])].get(&2),
            Some(&Value::OctetString(b"eth1".to_vec()))
        );
        assert_eq!(table[&RowIndex(vec![2])].get(&3), Some(&Value::Integer(6)));
    }
}
