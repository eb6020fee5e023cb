//! Key namespace construction for the emulated record tables.
//!
//! Every record kind lives under its own string prefix `"<env>_<kind>:"`, so
//! a single sorted keyspace emulates six tables. The layout below is the
//! persisted schema contract: any implementation sharing a store with this
//! one must compose byte-identical keys.
//!
//! ```text
//! points:        <env>_data:<mkey>||<ts>
//! registrations: <env>_keys:<mkey>
//! tags:          <env>_tags:<id>            id = "<ts>_<3 digits>"
//! rules:         <env>_rules:<mkey>
//! dashboards:    <env>_dashboards:<id>
//! tag types:     <env>_tagtypes:<id>        id = "<epoch-ms>_<3 digits>"
//! ```

use std::ops::Bound::Included;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::BytesRange;

/// Upper-bound sentinel for whole-table and tag-range scans. `~` (0x7E)
/// sorts after every digit, so `[prefix, prefix + "~"]` covers all ids that
/// start with a numeric component.
const TABLE_END: &str = "~";

/// Derives the per-record-kind key prefixes for one environment and
/// composes full storage keys from them.
///
/// Distinct fixed kind tokens guarantee that no two kinds produce
/// overlapping prefixes.
#[derive(Clone, Debug)]
pub(crate) struct KeySpace {
    data: String,
    keys: String,
    tags: String,
    rules: String,
    dashboards: String,
    tagtypes: String,
}

impl KeySpace {
    pub(crate) fn new(env: &str) -> Self {
        Self {
            data: format!("{env}_data:"),
            keys: format!("{env}_keys:"),
            tags: format!("{env}_tags:"),
            rules: format!("{env}_rules:"),
            dashboards: format!("{env}_dashboards:"),
            tagtypes: format!("{env}_tagtypes:"),
        }
    }

    /// Key for one metric point. The `||` separator keeps keys for a fixed
    /// metric key sorted by timestamp.
    pub(crate) fn point_key(&self, mkey: &str, ts: i64) -> Bytes {
        Bytes::from(format!("{}{}||{}", self.data, mkey, ts))
    }

    /// Range covering all points for `mkey` with timestamp in `[start, end]`.
    pub(crate) fn point_range(&self, mkey: &str, start: i64, end: i64) -> BytesRange {
        BytesRange::new(
            Included(self.point_key(mkey, start)),
            Included(self.point_key(mkey, end)),
        )
    }

    pub(crate) fn registration_key(&self, mkey: &str) -> Bytes {
        Bytes::from(format!("{}{}", self.keys, mkey))
    }

    pub(crate) fn registrations_range(&self) -> BytesRange {
        table_range(&self.keys)
    }

    pub(crate) fn tag_key(&self, id: &str) -> Bytes {
        Bytes::from(format!("{}{}", self.tags, id))
    }

    /// Range covering all tags with timestamp in `[begin, end]`. The sentinel
    /// after `end` keeps ids sharing the `end` timestamp prefix inside the
    /// range.
    pub(crate) fn tag_range(&self, begin: i64, end: i64) -> BytesRange {
        BytesRange::new(
            Included(Bytes::from(format!("{}{}", self.tags, begin))),
            Included(Bytes::from(format!("{}{}{}", self.tags, end, TABLE_END))),
        )
    }

    pub(crate) fn tag_type_key(&self, id: &str) -> Bytes {
        Bytes::from(format!("{}{}", self.tagtypes, id))
    }

    pub(crate) fn tag_types_range(&self) -> BytesRange {
        table_range(&self.tagtypes)
    }

    pub(crate) fn rule_key(&self, mkey: &str) -> Bytes {
        Bytes::from(format!("{}{}", self.rules, mkey))
    }

    pub(crate) fn dashboard_key(&self, id: &str) -> Bytes {
        Bytes::from(format!("{}{}", self.dashboards, id))
    }

    pub(crate) fn dashboards_range(&self) -> BytesRange {
        table_range(&self.dashboards)
    }
}

/// Range covering every key of one table prefix.
fn table_range(prefix: &str) -> BytesRange {
    BytesRange::new(
        Included(Bytes::from(prefix.to_string())),
        Included(Bytes::from(format!("{prefix}{TABLE_END}"))),
    )
}

/// Strips the `"<env>_<kind>:"` table prefix from a storage key, returning
/// the record identifier after the first `:`.
pub(crate) fn strip_table(key: &[u8]) -> Result<String> {
    let pos = key
        .iter()
        .position(|&b| b == b':')
        .ok_or_else(|| Error::Encoding(format!("key has no table prefix: {:?}", key)))?;
    String::from_utf8(key[pos + 1..].to_vec())
        .map_err(|e| Error::Encoding(format!("key is not valid utf-8: {}", e)))
}

/// Returns the table portion of a key (everything before the `:`), used as
/// the entity-kind dimension in operation metrics.
pub(crate) fn bucket_of(key: &[u8]) -> String {
    let end = key
        .iter()
        .position(|&b| b == b':')
        .unwrap_or(key.len());
    String::from_utf8_lossy(&key[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_derive_one_prefix_per_record_kind() {
        // given
        let keys = KeySpace::new("prod");

        // then
        assert_eq!(keys.data, "prod_data:");
        assert_eq!(keys.keys, "prod_keys:");
        assert_eq!(keys.tags, "prod_tags:");
        assert_eq!(keys.rules, "prod_rules:");
        assert_eq!(keys.dashboards, "prod_dashboards:");
        assert_eq!(keys.tagtypes, "prod_tagtypes:");
    }

    #[test]
    fn should_keep_prefixes_disjoint() {
        // given
        let keys = KeySpace::new("prod");
        let prefixes = [
            &keys.data,
            &keys.keys,
            &keys.tags,
            &keys.rules,
            &keys.dashboards,
            &keys.tagtypes,
        ];

        // then - no prefix is a prefix of another
        for a in &prefixes {
            for b in &prefixes {
                if a != b {
                    assert!(!a.starts_with(b.as_str()), "{} overlaps {}", a, b);
                }
            }
        }
    }

    #[test]
    fn should_compose_point_key_with_timestamp_separator() {
        // given
        let keys = KeySpace::new("prod");

        // when
        let key = keys.point_key("cpu.load", 1234);

        // then
        assert_eq!(key, Bytes::from("prod_data:cpu.load||1234"));
    }

    #[test]
    fn should_sort_point_keys_by_timestamp_for_fixed_metric() {
        // given
        let keys = KeySpace::new("prod");

        // when
        let earlier = keys.point_key("cpu.load", 10);
        let later = keys.point_key("cpu.load", 20);

        // then
        assert!(earlier < later);
    }

    #[test]
    fn should_bound_point_range_inclusively() {
        // given
        let keys = KeySpace::new("prod");

        // when
        let range = keys.point_range("foo", 0, 99);

        // then
        assert!(range.contains(b"prod_data:foo||0"));
        assert!(range.contains(b"prod_data:foo||10"));
        assert!(range.contains(b"prod_data:foo||99"));
        assert!(!range.contains(b"prod_data:bar||10"));
    }

    #[test]
    fn should_cover_ids_sharing_end_timestamp_in_tag_range() {
        // given
        let keys = KeySpace::new("prod");

        // when
        let range = keys.tag_range(100, 200);

        // then
        assert!(range.contains(b"prod_tags:100_007"));
        assert!(range.contains(b"prod_tags:150_123"));
        assert!(range.contains(b"prod_tags:200_999"));
        assert!(!range.contains(b"prod_tags:099_000"));
        assert!(!range.contains(b"prod_tags:201_000"));
    }

    #[test]
    fn should_cover_whole_table_with_sentinel_range() {
        // given
        let keys = KeySpace::new("prod");

        // when
        let range = keys.dashboards_range();

        // then
        assert!(range.contains(b"prod_dashboards:main"));
        assert!(range.contains(b"prod_dashboards:zz"));
        assert!(!range.contains(b"prod_data:foo||1"));
        assert!(!range.contains(b"prod_rules:foo"));
    }

    #[test]
    fn should_strip_table_prefix() {
        assert_eq!(strip_table(b"prod_keys:cpu.load").unwrap(), "cpu.load");
        assert_eq!(strip_table(b"prod_dashboards:main").unwrap(), "main");
        assert!(strip_table(b"no-prefix-here").is_err());
    }

    #[test]
    fn should_extract_metric_bucket_from_key() {
        assert_eq!(bucket_of(b"prod_data:cpu.load||1"), "prod_data");
        assert_eq!(bucket_of(b"prod_rules:foo"), "prod_rules");
    }
}
