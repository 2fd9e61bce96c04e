//! MaxMind DB writer.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use ahash::AHashMap;
use ipnet::IpNet;
use log::debug;

use super::tree::{write_nodes, Record, SearchTree};
use super::value::{DataSection, Value};
use crate::{Error, Result};

/// Marker that precedes the metadata map.
pub const METADATA_START_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

/// Zero bytes between the search tree and the data section.
const DATA_SECTION_SEPARATOR: [u8; 16] = [0; 16];

/// IPv6 ranges that alias the IPv4 subtree at `::/96`.
const IPV4_ALIASES: [(Ipv6Addr, u8); 2] = [
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0, 0), 96),
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16),
];

/// Something that maps networks to records and serializes the result.
pub trait DatabaseWriter {
    /// Associate `record` with every address in `network`.
    fn insert(&mut self, network: IpNet, record: &Value) -> Result<()>;

    /// Produce the complete database file.
    fn serialize(&self) -> Result<Vec<u8>>;
}

/// Options for [`MmdbWriter`].
#[derive(Debug, Clone)]
pub struct MmdbOptions {
    pub database_type: String,
    pub description: BTreeMap<String, String>,
    pub languages: Vec<String>,
    /// 4 or 6
    pub ip_version: u16,
    /// 24, 28 or 32
    pub record_size: u16,
    /// Alias `::ffff:0:0/96` and `2002::/16` to the IPv4 subtree
    pub ipv4_aliases: bool,
    /// Seconds since the epoch; current time when `None`
    pub build_epoch: Option<u64>,
}

impl Default for MmdbOptions {
    fn default() -> Self {
        Self {
            database_type: "GeoIP2-Country".to_string(),
            description: BTreeMap::new(),
            languages: vec!["en".to_string()],
            ip_version: 6,
            record_size: 24,
            ipv4_aliases: true,
            build_epoch: None,
        }
    }
}

/// Writer producing MaxMind DB (format 2.0) files.
///
/// Later inserts win: a network replaces whatever was stored for the
/// addresses it covers.
pub struct MmdbWriter {
    options: MmdbOptions,
    tree: SearchTree,
    values: Vec<Value>,
    value_index: AHashMap<Vec<u8>, usize>,
}

impl MmdbWriter {
    pub fn new(options: MmdbOptions) -> Result<Self> {
        let bit_count = match options.ip_version {
            4 => 32,
            6 => 128,
            other => {
                return Err(Error::Config(format!("unsupported ip_version {}", other)));
            }
        };
        if !matches!(options.record_size, 24 | 28 | 32) {
            return Err(Error::Config(format!(
                "unsupported record_size {}",
                options.record_size
            )));
        }

        Ok(Self {
            options,
            tree: SearchTree::new(bit_count),
            values: Vec::new(),
            value_index: AHashMap::new(),
        })
    }

    pub fn options(&self) -> &MmdbOptions {
        &self.options
    }

    /// Number of distinct records inserted so far.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Tree key and prefix length for a network.
    fn key_for(&self, network: &IpNet) -> Result<(u128, u8)> {
        match (network, self.tree.bit_count()) {
            (IpNet::V4(net), 32) => Ok(((u32::from(net.network()) as u128) << 96, net.prefix_len())),
            (IpNet::V4(net), _) => Ok((u32::from(net.network()) as u128, 96 + net.prefix_len())),
            (IpNet::V6(net), 128) => Ok((u128::from(net.network()), net.prefix_len())),
            (IpNet::V6(net), _) => Err(Error::InvalidNetwork(format!(
                "{} cannot be stored in an IPv4 database",
                net
            ))),
        }
    }

    fn intern(&mut self, record: &Value) -> Result<usize> {
        let key = record.to_bytes()?;
        if let Some(idx) = self.value_index.get(&key) {
            return Ok(*idx);
        }
        let idx = self.values.len();
        self.values.push(record.clone());
        self.value_index.insert(key, idx);
        Ok(idx)
    }

    /// Tree with the IPv4 alias ranges pointing at the `::/96` subtree.
    fn aliased_tree(&self) -> SearchTree {
        let mut tree = self.tree.clone();
        if tree.bit_count() != 128 || !self.options.ipv4_aliases {
            return tree;
        }

        let ipv4_root = match tree.get(0, 96) {
            Record::Empty => return tree,
            record => record,
        };
        for (addr, prefix_len) in IPV4_ALIASES {
            tree.insert(u128::from(addr), prefix_len, ipv4_root);
        }
        tree
    }

    fn metadata(&self, node_count: usize) -> Value {
        let build_epoch = self.options.build_epoch.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });

        Value::map([
            ("binary_format_major_version", Value::Uint16(2)),
            ("binary_format_minor_version", Value::Uint16(0)),
            ("build_epoch", Value::Uint64(build_epoch)),
            ("database_type", Value::from(self.options.database_type.as_str())),
            (
                "description",
                Value::map(
                    self.options
                        .description
                        .iter()
                        .map(|(lang, text)| (lang.clone(), Value::from(text.as_str()))),
                ),
            ),
            ("ip_version", Value::Uint16(self.options.ip_version)),
            (
                "languages",
                Value::Array(
                    self.options
                        .languages
                        .iter()
                        .map(|lang| Value::from(lang.as_str()))
                        .collect(),
                ),
            ),
            ("node_count", Value::Uint32(node_count as u32)),
            ("record_size", Value::Uint16(self.options.record_size)),
        ])
    }
}

impl DatabaseWriter for MmdbWriter {
    fn insert(&mut self, network: IpNet, record: &Value) -> Result<()> {
        let (key, prefix_len) = self.key_for(&network.trunc())?;
        let idx = self.intern(record)?;
        self.tree.insert(key, prefix_len, Record::Data(idx));
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let nodes = self.aliased_tree().compact();
        let node_count = nodes.len();

        let mut data = DataSection::new();
        let mut offsets = vec![None; self.values.len()];
        for children in &nodes {
            for child in children {
                if let Record::Data(idx) = child {
                    if offsets[*idx].is_none() {
                        offsets[*idx] = Some(data.store(&self.values[*idx])?);
                    }
                }
            }
        }

        let base = node_count as u32 + DATA_SECTION_SEPARATOR.len() as u32;
        let tree_bytes = write_nodes(&nodes, self.options.record_size, |idx| {
            base + offsets[idx].unwrap_or_default()
        })?;

        debug!(
            "serializing {} nodes, {} records, {} bytes of data",
            node_count,
            self.values.len(),
            data.len()
        );

        let mut out = tree_bytes;
        out.extend_from_slice(&DATA_SECTION_SEPARATOR);
        out.extend_from_slice(&data.into_bytes());
        out.extend_from_slice(METADATA_START_MARKER);
        out.extend_from_slice(&self.metadata(node_count).to_bytes()?);
        Ok(out)
    }
}
