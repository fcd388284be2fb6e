// Package records and per-cycle snapshots.
//
// Purpose
// - PackageRecord: one package as listed by a repository database.
// - PackageSnapshot: the package set of one or more sources at one instant.
//
// Responsibilities
// - Strip version clauses from provided names (`libfoo.so=1-64` -> `libfoo.so`).
// - Merge several sources into one snapshot, later sources winning on name clashes.
// - Expose the build-date lookup the failure tracker needs.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub pkgbase: String,
    /// Provided names in listing order, possibly carrying a version clause.
    pub provides: Vec<String>,
    pub build_date: Option<DateTime<Utc>>,
    pub repository: String,
}

impl PackageRecord {
    /// Provided names with their version clause removed, duplicates dropped.
    pub fn provided_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.provides.len());
        for entry in &self.provides {
            let bare = bare_provided_name(entry);
            if !bare.is_empty() && !names.contains(&bare) {
                names.push(bare);
            }
        }
        names
    }
}

/// Leading run of `[a-z0-9@._+-]` characters; anything after it is a version clause.
pub fn bare_provided_name(entry: &str) -> &str {
    let end = entry
        .find(|c: char| !is_name_char(c))
        .unwrap_or(entry.len());
    &entry[..end]
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '@' | '.' | '_' | '+' | '-')
}

/// Immutable name -> record view. Iteration is ordered by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSnapshot {
    packages: BTreeMap<String, PackageRecord>,
}

impl PackageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge per-source package lists in configuration order.
    pub fn merged<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Vec<PackageRecord>>,
    {
        let mut packages = BTreeMap::new();
        for records in sources {
            for record in records {
                packages.insert(record.name.clone(), record);
            }
        }
        Self { packages }
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageRecord)> {
        self.packages.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Newest build date among the packages built from `pkgbase`. A package
    /// whose name equals `pkgbase` counts even if its own pkgbase differs.
    pub fn pkgbase_build_date(&self, pkgbase: &str) -> Option<DateTime<Utc>> {
        self.packages
            .values()
            .filter(|record| record.pkgbase == pkgbase || record.name == pkgbase)
            .filter_map(|record| record.build_date)
            .max()
    }
}

impl FromIterator<PackageRecord> for PackageSnapshot {
    fn from_iter<T: IntoIterator<Item = PackageRecord>>(iter: T) -> Self {
        Self::merged([iter.into_iter().collect::<Vec<_>>()])
    }
}

#[cfg(test)]
mod package_snapshot_tests {
    use super::*;
    use crate::tests::fixtures::packages::PackageRecordBuilder;
    use rstest::rstest;

    #[rstest]
    #[case("libc.so=6-64", "libc.so")]
    #[case("sh", "sh")]
    #[case("python-foo>=1.2", "python-foo")]
    #[case("java-runtime=17", "java-runtime")]
    #[case("qt6-base@abi", "qt6-base@abi")]
    #[case("Uppercase", "")]
    fn it_should_strip_the_version_clause(#[case] entry: &str, #[case] expected: &str) {
        assert_eq!(bare_provided_name(entry), expected);
    }

    #[rstest]
    fn it_should_list_provided_names_once_in_listing_order() {
        let record = PackageRecordBuilder::new("glibc")
            .provides(["libc.so=6-64", "libm.so=6-64", "libc.so=6-32"])
            .build();
        assert_eq!(record.provided_names(), vec!["libc.so", "libm.so"]);
    }

    #[rstest]
    fn it_should_let_later_sources_win_on_name_clashes() {
        let core = vec![
            PackageRecordBuilder::new("bash").version("5.1-1").repository("core").build(),
        ];
        let extra = vec![
            PackageRecordBuilder::new("bash").version("5.2-1").repository("extra").build(),
        ];
        let snapshot = PackageSnapshot::merged([core, extra]);
        assert_eq!(snapshot.len(), 1);
        let bash = snapshot.get("bash").expect("bash present");
        assert_eq!(bash.version, "5.2-1");
        assert_eq!(bash.repository, "extra");
    }

    #[rstest]
    fn it_should_expose_build_dates() {
        let built = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let snapshot: PackageSnapshot = [PackageRecordBuilder::new("foo").build_date(built).build()]
            .into_iter()
            .collect();
        assert_eq!(snapshot.pkgbase_build_date("foo"), Some(built));
        assert_eq!(snapshot.pkgbase_build_date("bar"), None);
    }

    #[rstest]
    fn it_should_find_the_newest_build_of_a_split_pkgbase() {
        let older = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let newer = DateTime::from_timestamp(1_700_000_600, 0).unwrap();
        let snapshot: PackageSnapshot = [
            PackageRecordBuilder::new("jdk17-openjdk")
                .pkgbase("java17-openjdk")
                .build_date(older)
                .build(),
            PackageRecordBuilder::new("jre17-openjdk")
                .pkgbase("java17-openjdk")
                .build_date(newer)
                .build(),
            PackageRecordBuilder::new("bash").build_date(newer).build(),
        ]
        .into_iter()
        .collect();
        assert_eq!(snapshot.pkgbase_build_date("java17-openjdk"), Some(newer));
        assert_eq!(snapshot.pkgbase_build_date("jdk17-openjdk"), Some(older));
    }
}
