//! Plaintext list export and checksum files.

use std::fs;
use std::path::{Path, PathBuf};

use ipnet::IpNet;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Whether `identifier` can be used as a file name inside the output
/// directory: non-empty, no path separators, not `.` or `..`.
pub fn is_safe_identifier(identifier: &str) -> bool {
    let id = identifier.trim();
    !id.is_empty() && id != "." && id != ".." && !id.contains(&['/', '\\', '\0'][..])
}

/// Write `<dir>/<identifier lower-cased>.txt`, one CIDR per line, sorted.
pub fn export_plaintext(dir: &Path, identifier: &str, networks: &[IpNet]) -> Result<PathBuf> {
    if !is_safe_identifier(identifier) {
        return Err(Error::Config(format!(
            "identifier {:?} cannot be used as a file name",
            identifier
        )));
    }

    let mut sorted = networks.to_vec();
    sorted.sort();

    let mut data = String::with_capacity(sorted.len() * 20);
    for net in &sorted {
        data.push_str(&net.to_string());
        data.push('\n');
    }

    let path = dir.join(format!("{}.txt", identifier.to_lowercase()));
    fs::write(&path, data)?;
    Ok(path)
}

/// Hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Write `<path>.sha256sum` in `sha256sum` format for an artifact whose
/// contents are `data`.
pub fn write_checksum(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sum_path = PathBuf::from(format!("{}.sha256sum", path.display()));
    fs::write(&sum_path, format!("{}  {}\n", sha256_hex(data), file_name))?;
    Ok(sum_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("CN"));
        assert!(is_safe_identifier("geo-ip_v2"));
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier(".."));
        assert!(!is_safe_identifier("../x"));
        assert!(!is_safe_identifier("a/b"));
        assert!(!is_safe_identifier("a\\b"));
    }

    #[test]
    fn test_export_rejects_path_identifier() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        fs::create_dir(&out).unwrap();
        let nets: Vec<IpNet> = vec!["1.1.1.0/24".parse().unwrap()];

        let err = export_plaintext(&out, "../x", &nets).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!root.path().join("x.txt").exists());
    }

    #[test]
    fn test_export_sorted_lowercase_name() {
        let dir = tempfile::tempdir().unwrap();
        let nets: Vec<IpNet> = ["1.1.2.0/24", "1.1.1.0/24"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();

        let path = export_plaintext(dir.path(), "US", &nets).unwrap();

        assert_eq!(path, dir.path().join("us.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "1.1.1.0/24\n1.1.2.0/24\n");
    }

    #[test]
    fn test_export_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_plaintext(dir.path(), "XX", &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_write_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("Country.mmdb");
        fs::write(&artifact, b"abc").unwrap();

        let sum_path = write_checksum(&artifact, b"abc").unwrap();

        assert_eq!(sum_path, dir.path().join("Country.mmdb.sha256sum"));
        assert_eq!(
            fs::read_to_string(sum_path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  Country.mmdb\n"
        );
    }
}
