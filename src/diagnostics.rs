use std::collections::BTreeMap;

use log::info;

use crate::data::rows::Table;

/// Tallies collected while a run shapes elements. Owned by whoever drives the
/// pipeline; nothing in the transform reads these back.
#[derive(Debug, Default, Clone)]
pub struct AuditCounters {
    pub tag_keys: BTreeMap<String, u64>,
    pub street_issues: BTreeMap<String, u64>,
    pub dropped_keys: u64,
    pub rows_written: BTreeMap<Table, u64>,
}

impl AuditCounters {
    pub fn new() -> AuditCounters {
        AuditCounters::default()
    }

    pub fn record_tag_key(&mut self, key: &str) {
        *self.tag_keys.entry(key.to_string()).or_default() += 1;
    }

    pub fn record_dropped_key(&mut self) {
        self.dropped_keys += 1;
    }

    pub fn record_street_issue(&mut self, suffix: &str) {
        *self.street_issues.entry(suffix.to_string()).or_default() += 1;
    }

    pub fn record_row(&mut self, table: Table) {
        *self.rows_written.entry(table).or_default() += 1;
    }

    /// Most frequent tag keys, highest count first, ties in key order.
    pub fn top_tag_keys(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut keys: Vec<(&str, u64)> = self.tag_keys
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        keys.truncate(limit);
        keys
    }

    pub fn log_report(&self, etl_name: &str, top_keys: usize) {
        for table in Table::ALL {
            let rows = self.rows_written.get(&table).copied().unwrap_or_default();
            info!(etl_name = etl_name, table = table.name(), rows = rows; "Rows written");
        }
        info!(etl_name = etl_name, dropped_keys = self.dropped_keys; "Tags dropped for problem characters");
        for (key, count) in self.top_tag_keys(top_keys) {
            info!(etl_name = etl_name, key = key, count = count; "Tag key frequency");
        }
        for (suffix, count) in &self.street_issues {
            info!(etl_name = etl_name, suffix = suffix.as_str(), count = *count; "Unrecognized street type");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_keys_sorted_by_count_then_key() {
        let mut counters = AuditCounters::new();
        for key in ["name", "highway", "name", "addr:street", "highway", "name"] {
            counters.record_tag_key(key);
        }
        assert_eq!(
            counters.top_tag_keys(2),
            vec![("name", 3), ("highway", 2)]
        );
        assert_eq!(counters.top_tag_keys(10).len(), 3);
    }

    #[test]
    fn street_issues_accumulate() {
        let mut counters = AuditCounters::new();
        counters.record_street_issue("Highway");
        counters.record_street_issue("Highway");
        counters.record_street_issue("Ext");
        assert_eq!(counters.street_issues.get("Highway"), Some(&2));
        assert_eq!(counters.street_issues.get("Ext"), Some(&1));
    }
}
