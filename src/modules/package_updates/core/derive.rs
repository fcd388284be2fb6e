// Pure derivation of update events from two package snapshots.
//
// Purpose
// - Turn "what the repositories looked like" and "what they look like now" into
//   the New/Updated events handlers are interested in.
//
// Responsibilities
// - Compare versions with pacman ordering; equal or older versions emit nothing.
// - Address each change to the package, its pkgbase and its provided aliases,
//   at most once per (identity, kind) within one derivation.
// - Never perform input or output beyond logging.

use crate::modules::package_updates::core::events::{DedupSet, UpdateEvent, UpdateKind};
use crate::modules::package_updates::core::package::{PackageRecord, PackageSnapshot};
use crate::modules::package_updates::core::version::is_newer;

pub fn derive_updates(before: &PackageSnapshot, after: &PackageSnapshot) -> Vec<UpdateEvent> {
    let mut seen = DedupSet::new();
    let mut result = Vec::new();

    for (name, record) in after.iter() {
        let alias_names: Vec<String> = record
            .provided_names()
            .into_iter()
            .filter(|alias| !after.contains(alias))
            .map(str::to_string)
            .collect();

        let Some(event) = primary_event(before.get(name), record, alias_names) else {
            continue;
        };
        tracing::info!("{}", event.human_message);

        let implied: Vec<String> = std::iter::once(&record.pkgbase)
            .filter(|pkgbase| pkgbase.as_str() != name)
            .chain(event.alias_names.iter())
            .cloned()
            .collect();

        if seen.first_sighting(name, event.kind) {
            result.push(event.clone());
        }
        for identity in implied {
            if seen.first_sighting(&identity, event.kind) {
                tracing::debug!(%identity, via = name, kind = %event.kind, "implied recipient");
                result.push(event.readdressed(&identity));
            }
        }
    }
    result
}

fn primary_event(
    previous: Option<&PackageRecord>,
    current: &PackageRecord,
    alias_names: Vec<String>,
) -> Option<UpdateEvent> {
    let (kind, old_version, human_message) = match previous {
        Some(previous) if is_newer(&current.version, &previous.version) => (
            UpdateKind::Updated,
            Some(previous.version.clone()),
            format!(
                "Update: {} {} {} -> {} {}",
                current.repository,
                current.name,
                previous.version,
                current.version,
                current.architecture
            ),
        ),
        Some(_) => return None,
        None => (
            UpdateKind::New,
            None,
            format!(
                "New: {} {} {} {}",
                current.repository, current.name, current.version, current.architecture
            ),
        ),
    };

    Some(UpdateEvent {
        subject_name: current.name.clone(),
        pkgbase: current.pkgbase.clone(),
        alias_names,
        kind,
        old_version,
        new_version: Some(current.version.clone()),
        architecture: Some(current.architecture.clone()),
        repository: Some(current.repository.clone()),
        log_file: None,
        human_message,
    })
}
