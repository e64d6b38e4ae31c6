//! Group vectors by identical cross-implementation behavior.
//!
//! A comparison report over hundreds of vectors is dominated by rows that look alike. Grouping vectors whose
//! verdicts agree for every implementation lets the report show one representative per observed behavior
//! pattern.
//!
//! ## Notes
//! - Everything here is recomputed from a log snapshot; nothing is maintained incrementally.
//! - Output order is fully determined by the inputs: implementations are sorted before keys are built, members
//!   are sorted, and classes are sorted by their serialized key. Two calls over the same records produce
//!   identical output.
//! - An implementation without a record for a vector is left out of that vector's key. It does not split the
//!   class on its own.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::record::ExecutionRecord;
use crate::verdict::Verdict;

/// Separator between `VERDICT_implementation` entries of a serialized key.
pub const KEY_SEPARATOR: &str = " || ";

/// Vector → implementation → verdict, built from a log snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerdictMatrix {
    rows: BTreeMap<String, BTreeMap<String, Verdict>>,
}

impl VerdictMatrix {
    /// Build the matrix. When the same (implementation, vector) pair occurs more than once (overlapping merged
    /// segments), the later record wins.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExecutionRecord>) -> Self {
        let mut rows: BTreeMap<String, BTreeMap<String, Verdict>> = BTreeMap::new();
        for record in records {
            rows.entry(record.vector.clone())
                .or_default()
                .insert(record.implementation.clone(), record.verdict);
        }
        Self { rows }
    }

    /// Every implementation with at least one record, sorted.
    pub fn implementations(&self) -> Vec<&str> {
        let ids: BTreeSet<&str> = self.rows.values().flat_map(|row| row.keys().map(String::as_str)).collect();
        ids.into_iter().collect()
    }

    /// Every vector with at least one record, sorted.
    pub fn vectors(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn verdict(&self, vector: &str, implementation: &str) -> Option<Verdict> {
        self.rows.get(vector)?.get(implementation).copied()
    }

    pub fn row(&self, vector: &str) -> Option<&BTreeMap<String, Verdict>> {
        self.rows.get(vector)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Partition the vectors by their verdict sequence over `implementations`.
    pub fn group<S: AsRef<str>>(&self, implementations: &[S]) -> Vec<EquivalenceClass> {
        let ordered: BTreeSet<&str> = implementations.iter().map(|s| s.as_ref()).collect();

        let mut buckets: BTreeMap<Vec<(String, Verdict)>, BTreeSet<String>> = BTreeMap::new();
        for (vector, row) in &self.rows {
            let key: Vec<(String, Verdict)> = ordered
                .iter()
                .filter_map(|id| row.get(*id).map(|v| (id.to_string(), *v)))
                .collect();
            buckets.entry(key).or_default().insert(vector.clone());
        }

        let mut classes: Vec<EquivalenceClass> = buckets
            .into_iter()
            .map(|(key, members)| EquivalenceClass { key, members })
            .collect();
        // Stable sort: equal serializations keep the structural key order from the BTreeMap.
        classes.sort_by_cached_key(EquivalenceClass::serialized_key);
        classes
    }
}

/// Vectors sharing one verdict sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceClass {
    /// `(implementation, verdict)` in implementation order.
    pub key: Vec<(String, Verdict)>,
    pub members: BTreeSet<String>,
}

impl EquivalenceClass {
    /// `VERDICT_implementation` entries joined by [`KEY_SEPARATOR`].
    pub fn serialized_key(&self) -> String {
        self.key
            .iter()
            .map(|(id, verdict)| format!("{}_{}", verdict, id))
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    /// The lexicographically first member.
    pub fn representative(&self) -> Option<&str> {
        self.members.first().map(String::as_str)
    }
}

impl fmt::Display for EquivalenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            writeln!(f, "(no verdicts)")?;
        } else {
            writeln!(f, "{}", self.serialized_key())?;
        }
        for member in &self.members {
            writeln!(f, "    {}", member)?;
        }
        Ok(())
    }
}

/// Group a log snapshot. See [`VerdictMatrix::group`].
pub fn group_by_behavior<S: AsRef<str>>(records: &[ExecutionRecord], implementations: &[S]) -> Vec<EquivalenceClass> {
    VerdictMatrix::from_records(records).group(implementations)
}

/// One representative vector per class, in class order.
pub fn prune(classes: &[EquivalenceClass]) -> Vec<&str> {
    classes.iter().filter_map(EquivalenceClass::representative).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(implementation: &str, verdict: Verdict, vector: &str) -> ExecutionRecord {
        ExecutionRecord::new(implementation, verdict, vector)
    }

    fn sample() -> Vec<ExecutionRecord> {
        vec![
            rec("rapidjson", Verdict::ExpectedResult, "y_a.json"),
            rec("ujson", Verdict::ExpectedResult, "y_a.json"),
            rec("ujson", Verdict::ShouldHaveFailed, "n_b.json"),
            rec("rapidjson", Verdict::ExpectedResult, "n_b.json"),
            rec("rapidjson", Verdict::ExpectedResult, "y_c.json"),
            rec("ujson", Verdict::ExpectedResult, "y_c.json"),
            rec("ujson", Verdict::Crash, "i_d.json"),
        ]
    }

    #[test]
    fn test_identical_rows_share_a_class() {
        let classes = group_by_behavior(&sample(), &["ujson", "rapidjson"]);
        let same = classes
            .iter()
            .find(|c| c.members.contains("y_a.json"))
            .unwrap();
        assert!(same.members.contains("y_c.json"));
        assert_eq!(same.members.len(), 2);
    }

    #[test]
    fn test_implementation_order_is_normalized() {
        let a = group_by_behavior(&sample(), &["ujson", "rapidjson"]);
        let b = group_by_behavior(&sample(), &["rapidjson", "ujson", "rapidjson"]);
        assert_eq!(a, b);
        assert_eq!(a[1].key[0].0, "rapidjson");
        assert_eq!(a[1].key[1].0, "ujson");
    }

    #[test]
    fn test_missing_record_is_omitted_from_key() {
        let classes = group_by_behavior(&sample(), &["rapidjson", "ujson"]);
        let crash = classes.iter().find(|c| c.members.contains("i_d.json")).unwrap();
        assert_eq!(crash.key, vec![("ujson".to_string(), Verdict::Crash)]);
        assert_eq!(crash.serialized_key(), "CRASH_ujson");
    }

    #[test]
    fn test_classes_sorted_by_serialized_key() {
        let classes = group_by_behavior(&sample(), &["rapidjson", "ujson"]);
        let keys: Vec<String> = classes.iter().map(EquivalenceClass::serialized_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(
            keys,
            vec![
                "CRASH_ujson",
                "EXPECTED_RESULT_rapidjson || EXPECTED_RESULT_ujson",
                "EXPECTED_RESULT_rapidjson || SHOULD_HAVE_FAILED_ujson",
            ]
        );
    }

    #[test]
    fn test_later_record_wins() {
        let records = vec![
            rec("ujson", Verdict::Timeout, "y_a.json"),
            rec("ujson", Verdict::ExpectedResult, "y_a.json"),
        ];
        let matrix = VerdictMatrix::from_records(&records);
        assert_eq!(matrix.verdict("y_a.json", "ujson"), Some(Verdict::ExpectedResult));
        assert_eq!(matrix.verdict("y_a.json", "rapidjson"), None);
    }

    #[test]
    fn test_restricting_implementations_can_merge_classes() {
        let classes = group_by_behavior(&sample(), &["rapidjson"]);
        let keys: Vec<String> = classes.iter().map(EquivalenceClass::serialized_key).collect();
        assert_eq!(keys, vec!["", "EXPECTED_RESULT_rapidjson"]);
        assert_eq!(classes[1].members.len(), 3);
        assert_eq!(classes[0].representative(), Some("i_d.json"));
    }

    #[test]
    fn test_prune_keeps_first_member_per_class() {
        let classes = group_by_behavior(&sample(), &["rapidjson", "ujson"]);
        assert_eq!(prune(&classes), vec!["i_d.json", "y_a.json", "n_b.json"]);
    }

    #[test]
    fn test_matrix_listings() {
        let matrix = VerdictMatrix::from_records(&sample());
        assert_eq!(matrix.implementations(), vec!["rapidjson", "ujson"]);
        assert_eq!(
            matrix.vectors().collect::<Vec<_>>(),
            vec!["i_d.json", "n_b.json", "y_a.json", "y_c.json"]
        );
        assert_eq!(matrix.len(), 4);
        assert!(VerdictMatrix::default().is_empty());
    }

    #[test]
    fn test_display_listing() {
        let classes = group_by_behavior(&sample(), &["rapidjson", "ujson"]);
        let listing: String = classes.iter().map(ToString::to_string).collect();
        insta::assert_snapshot!(listing.trim_end(), @r"
        CRASH_ujson
            i_d.json
        EXPECTED_RESULT_rapidjson || EXPECTED_RESULT_ujson
            y_a.json
            y_c.json
        EXPECTED_RESULT_rapidjson || SHOULD_HAVE_FAILED_ujson
            n_b.json
        ");
    }
}
