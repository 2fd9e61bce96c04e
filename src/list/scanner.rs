//! Directory scanning for CIDR list files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ipnet::IpNet;
use log::{debug, warn};

use super::loader::load_list;
use super::ListFile;
use crate::Result;

/// CIDR lists keyed by identifier.
pub type RangeGroups = BTreeMap<String, Vec<IpNet>>;

/// Derive the identifier of a list file: its stem, upper-cased.
pub fn identifier_for(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase())
        .filter(|id| !id.is_empty())
}

/// Load every list file under `root`.
///
/// Subdirectories are walked recursively, entries in file name order. Only
/// regular files (or symlinks to them) are loaded; symlinked directories,
/// sockets and FIFOs are skipped. When two files map to the same identifier,
/// the one visited last replaces the earlier list.
pub fn scan_dir(root: impl AsRef<Path>) -> Result<RangeGroups> {
    let mut groups = RangeGroups::new();
    walk(root.as_ref(), &mut groups)?;
    Ok(groups)
}

fn walk(dir: &Path, groups: &mut RangeGroups) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;

        if entry.file_name().to_string_lossy().starts_with('.') {
            debug!("skipping hidden entry {}", path.display());
            continue;
        }

        if file_type.is_dir() {
            walk(&path, groups)?;
            continue;
        }

        // Symlinks count only when they resolve to a regular file
        let is_file = if file_type.is_symlink() {
            fs::metadata(&path).map(|meta| meta.is_file()).unwrap_or(false)
        } else {
            file_type.is_file()
        };
        if !is_file {
            warn!("skipping {}: not a regular file", path.display());
            continue;
        }

        let Some(identifier) = identifier_for(&path) else {
            continue;
        };

        let list = load_list(&path)?;
        insert_group(groups, identifier, list, &path);
    }

    Ok(())
}

/// Load an explicit set of list files.
pub fn scan_files(files: &[ListFile]) -> Result<RangeGroups> {
    let mut groups = RangeGroups::new();
    for file in files {
        let list = load_list(&file.path)?;
        insert_group(&mut groups, file.identifier.to_uppercase(), list, &file.path);
    }
    Ok(groups)
}

fn insert_group(groups: &mut RangeGroups, identifier: String, list: Vec<IpNet>, path: &Path) {
    debug!("{} -> {} ({} CIDRs)", path.display(), identifier, list.len());
    if groups.insert(identifier.clone(), list).is_some() {
        warn!(
            "{} overwrites an earlier list for identifier {}",
            path.display(),
            identifier
        );
    }
}
