//! Plaintext CIDR list parser.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ipnet::IpNet;
use log::warn;

use crate::{Error, Result};

/// Load a CIDR list file.
///
/// Fails only when the file cannot be opened or read. Lines that do not
/// parse as a CIDR are logged and skipped.
pub fn load_list(path: impl AsRef<Path>) -> Result<Vec<IpNet>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let list = parse_labeled(file, &path.display().to_string())?;
    log::debug!("loaded {} CIDRs from {}", list.len(), path.display());
    Ok(list)
}

/// Parse CIDRs from a reader, one per line.
///
/// Blank lines and `#` comments are ignored silently.
pub fn parse_list<R: Read>(reader: R) -> Result<Vec<IpNet>> {
    parse_labeled(reader, "<input>")
}

/// `label` names the source in skip warnings.
fn parse_labeled<R: Read>(reader: R, label: &str) -> Result<Vec<IpNet>> {
    let mut list = Vec::new();
    let buf_reader = BufReader::new(reader);

    for (idx, line) in buf_reader.split(b'\n').enumerate() {
        let line = line?;
        let line = String::from_utf8_lossy(&line);

        // Remove comments
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => &line[..],
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        match parse_cidr(line) {
            Ok(network) => list.push(network),
            Err(e) => warn!("{}:{}: {}, skipped", label, idx + 1, e),
        }
    }

    Ok(list)
}

/// Parse a single CIDR, clearing any host bits.
pub fn parse_cidr(cidr: &str) -> Result<IpNet> {
    cidr.trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|_| Error::InvalidCidr(cidr.to_string()))
}
