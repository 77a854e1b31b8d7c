//! Deduplication of release records by info_hash.

use std::collections::HashMap;

use super::ReleaseRecord;

/// Deduplicate records by info_hash.
///
/// Hashes are compared lower-cased. The first occurrence wins and keeps its
/// position; a missing size is filled from a later duplicate.
pub fn deduplicate_records(records: Vec<ReleaseRecord>) -> Vec<ReleaseRecord> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut results: Vec<ReleaseRecord> = Vec::with_capacity(records.len());

    for mut record in records {
        record.info_hash = record.info_hash.to_lowercase();
        match position.get(&record.info_hash) {
            Some(&idx) => {
                let existing = &mut results[idx];
                if existing.size_bytes.is_none() {
                    existing.size_bytes = record.size_bytes;
                }
            }
            None => {
                position.insert(record.info_hash.clone(), results.len());
                results.push(record);
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(title: &str, info_hash: &str, size: Option<u64>) -> ReleaseRecord {
        ReleaseRecord {
            info_hash: info_hash.to_string(),
            title: title.to_string(),
            size_bytes: size,
        }
    }

    #[test]
    fn test_dedup_single_record() {
        let results = deduplicate_records(vec![make_record("Test", "abc123", Some(10))]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Test");
        assert_eq!(results[0].info_hash, "abc123");
    }

    #[test]
    fn test_dedup_merges_same_hash_case_insensitive() {
        let results = deduplicate_records(vec![
            make_record("Test A", "ABC123", Some(10)),
            make_record("Test B", "abc123", Some(20)),
            make_record("Test C", "ABC123", None),
        ]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Test A");
        assert_eq!(results[0].info_hash, "abc123");
        assert_eq!(results[0].size_bytes, Some(10));
    }

    #[test]
    fn test_dedup_fills_missing_size() {
        let results = deduplicate_records(vec![
            make_record("Test A", "abc", None),
            make_record("Test B", "abc", Some(42)),
        ]);

        assert_eq!(results[0].title, "Test A");
        assert_eq!(results[0].size_bytes, Some(42));
    }

    #[test]
    fn test_dedup_preserves_order() {
        let results = deduplicate_records(vec![
            make_record("One", "111", None),
            make_record("Two", "222", None),
            make_record("One again", "111", None),
            make_record("Three", "333", None),
        ]);

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_dedup_empty() {
        assert!(deduplicate_records(Vec::new()).is_empty());
    }
}
