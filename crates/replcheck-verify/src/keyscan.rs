//! Key-presence scan: which source keys never reached the target.

use crate::error::VerifyError;
use replcheck_core::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Result of comparing the key sets of two stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyScanReport {
    pub source_keys: u64,
    pub target_keys: u64,
    /// Source keys absent on the target, sorted.
    pub missing: Vec<String>,
    /// Missing key count per source type label.
    pub missing_by_type: BTreeMap<String, u64>,
}

impl KeyScanReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Enumerate `prefix` on both stores and report source keys the target lacks.
pub async fn scan_missing_keys(
    source: &dyn KvStore,
    target: &dyn KvStore,
    prefix: &str,
) -> Result<KeyScanReport, VerifyError> {
    info!("Scanning {} keys under '{}'", target.label(), prefix);
    let target_keys: BTreeSet<String> = target.keys_with_prefix(prefix).await?.into_iter().collect();

    info!("Scanning {} keys and comparing", source.label());
    let source_keys = source.keys_with_prefix(prefix).await?;

    let mut report = KeyScanReport {
        source_keys: source_keys.len() as u64,
        target_keys: target_keys.len() as u64,
        ..Default::default()
    };
    for key in source_keys {
        if target_keys.contains(&key) {
            continue;
        }
        let key_type = source.key_type(&key).await?;
        *report.missing_by_type.entry(key_type).or_insert(0) += 1;
        report.missing.push(key);
    }

    if report.is_consistent() {
        info!(
            "No missing keys: source={}, target={}",
            report.source_keys, report.target_keys
        );
    } else {
        warn!(
            "Found {} missing keys, by type: {:?}",
            report.missing.len(),
            report.missing_by_type
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use replcheck_core::MemoryStore;

    #[tokio::test]
    async fn test_reports_missing_keys_by_type() {
        let source = MemoryStore::new("source");
        let target = MemoryStore::new("target");
        source.set("p:a", b"1", None).await.unwrap();
        source.set("p:b", b"2", None).await.unwrap();
        source.set_add("p:c", &[b"m".to_vec()]).await.unwrap();
        source.set("other:z", b"3", None).await.unwrap();
        target.set("p:a", b"1", None).await.unwrap();
        target.set("p:extra", b"x", None).await.unwrap();

        let report = scan_missing_keys(&source, &target, "p:").await.unwrap();
        assert_eq!(report.source_keys, 3);
        assert_eq!(report.target_keys, 2);
        assert_eq!(report.missing, vec!["p:b".to_string(), "p:c".to_string()]);
        assert_eq!(report.missing_by_type.get("string"), Some(&1));
        assert_eq!(report.missing_by_type.get("set"), Some(&1));
        assert!(!report.is_consistent());
    }

    #[tokio::test]
    async fn test_consistent_when_target_has_everything() {
        let source = MemoryStore::new("source");
        let target = MemoryStore::new("target");
        source.set("p:a", b"1", None).await.unwrap();
        source.replicate_to(&target, "p:");
        let report = scan_missing_keys(&source, &target, "p:").await.unwrap();
        assert!(report.is_consistent());
    }
}
