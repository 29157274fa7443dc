use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::{ScanError, ScanResult};
use crate::models::Dependency;
use crate::version::DottedVersion;

/// Highest version seen per package name across a whole run.
///
/// Names compare case-insensitively; the spelling of the first occurrence is
/// the one kept. Iteration is in case-insensitive name order.
#[derive(Debug, Default)]
pub struct DependencyAggregate {
    entries: BTreeMap<String, Dependency>,
}

impl DependencyAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `dep` in, keeping the greater of the stored and incoming versions.
    pub fn merge(&mut self, dep: &Dependency) -> ScanResult<()> {
        let current = match self.entries.entry(dep.name.to_lowercase()) {
            Entry::Vacant(slot) => {
                slot.insert(dep.clone());
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if parse_version(current)? < parse_version(dep)? {
            tracing::debug!(
                package = %current.name,
                from = %current.version,
                to = %dep.version,
                "raising aggregated version"
            );
            current.version = dep.version.clone();
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.values()
    }
}

fn parse_version(dep: &Dependency) -> ScanResult<DottedVersion> {
    dep.version
        .parse()
        .map_err(|_| ScanError::InvalidVersion {
            package: dep.name.clone(),
            version: dep.version.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions_of(agg: &DependencyAggregate) -> Vec<(String, String)> {
        agg.iter()
            .map(|d| (d.name.clone(), d.version.clone()))
            .collect()
    }

    #[test]
    fn test_highest_version_regardless_of_order() {
        let orders = [
            ["1.2.0", "1.10.0", "1.3.0"],
            ["1.10.0", "1.3.0", "1.2.0"],
            ["1.3.0", "1.2.0", "1.10.0"],
        ];
        for order in orders {
            let mut agg = DependencyAggregate::new();
            for version in order {
                agg.merge(&Dependency::new("X", version)).unwrap();
            }
            assert_eq!(versions_of(&agg), vec![("X".into(), "1.10.0".into())]);
        }
    }

    #[test]
    fn test_names_case_insensitive() {
        let mut agg = DependencyAggregate::new();
        agg.merge(&Dependency::new("Newtonsoft.Json", "12.0.1")).unwrap();
        agg.merge(&Dependency::new("newtonsoft.json", "13.0.1")).unwrap();
        agg.merge(&Dependency::new("Serilog", "2.12.0")).unwrap();

        assert_eq!(agg.len(), 2);
        assert_eq!(
            versions_of(&agg),
            vec![
                ("Newtonsoft.Json".into(), "13.0.1".into()),
                ("Serilog".into(), "2.12.0".into()),
            ]
        );
    }

    #[test]
    fn test_iteration_is_name_ordered() {
        let mut agg = DependencyAggregate::new();
        for name in ["zlib", "Alpha", "beta"] {
            agg.merge(&Dependency::new(name, "1.0.0")).unwrap();
        }
        let names: Vec<_> = agg.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "beta", "zlib"]);
    }

    #[test]
    fn test_malformed_version_is_fatal_on_compare() {
        let mut agg = DependencyAggregate::new();
        agg.merge(&Dependency::new("Foo", "1.0.0")).unwrap();
        let err = agg.merge(&Dependency::new("Foo", "^2.0")).unwrap_err();
        assert!(matches!(err, ScanError::InvalidVersion { version, .. } if version == "^2.0"));
        assert_eq!(versions_of(&agg), vec![("Foo".into(), "1.0.0".into())]);
    }
}
