// Shared test fixture for pacman sync databases.

use crate::modules::package_updates::core::package::PackageRecord;
use flate2::Compression;
use flate2::write::GzEncoder;

pub fn desc_for(record: &PackageRecord) -> String {
    let mut desc = format!(
        "%FILENAME%\n{name}-{version}-{arch}.pkg.tar.zst\n\n%NAME%\n{name}\n\n%BASE%\n{base}\n\n%VERSION%\n{version}\n\n%ARCH%\n{arch}\n\n",
        name = record.name,
        base = record.pkgbase,
        version = record.version,
        arch = record.architecture,
    );
    if let Some(built) = record.build_date {
        desc.push_str(&format!("%BUILDDATE%\n{}\n\n", built.timestamp()));
    }
    if !record.provides.is_empty() {
        desc.push_str("%PROVIDES%\n");
        for provided in &record.provides {
            desc.push_str(provided);
            desc.push('\n');
        }
        desc.push('\n');
    }
    desc
}

/// A gzip-compressed sync database holding one `desc` entry per record.
pub fn sync_db(records: &[PackageRecord]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for record in records {
        let desc = desc_for(record);
        let mut header = tar::Header::new_gnu();
        header.set_size(desc.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(
                &mut header,
                format!("{}-{}/desc", record.name, record.version),
                desc.as_bytes(),
            )
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
