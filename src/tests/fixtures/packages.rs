// Shared test fixture for package records.

use crate::modules::package_updates::core::package::PackageRecord;
use chrono::{DateTime, Utc};

pub struct PackageRecordBuilder {
    inner: PackageRecord,
}

impl PackageRecordBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            inner: PackageRecord {
                pkgbase: name.clone(),
                name,
                version: "1.0-1".to_string(),
                architecture: "riscv64".to_string(),
                provides: Vec::new(),
                build_date: None,
                repository: "core".to_string(),
            },
        }
    }

    pub fn version(mut self, v: impl Into<String>) -> Self {
        self.inner.version = v.into();
        self
    }

    pub fn pkgbase(mut self, v: impl Into<String>) -> Self {
        self.inner.pkgbase = v.into();
        self
    }

    pub fn provides<'a>(mut self, v: impl IntoIterator<Item = &'a str>) -> Self {
        self.inner.provides = v.into_iter().map(str::to_string).collect();
        self
    }

    pub fn build_date(mut self, v: DateTime<Utc>) -> Self {
        self.inner.build_date = Some(v);
        self
    }

    pub fn repository(mut self, v: impl Into<String>) -> Self {
        self.inner.repository = v.into();
        self
    }

    pub fn build(self) -> PackageRecord {
        self.inner
    }
}
