//! K2GeoIP - Build GeoIP databases from plaintext CIDR lists.
//!
//! This crate turns a directory of CIDR list files (one file per country,
//! one CIDR per line) into:
//!
//! - a MaxMind DB country database (`Country.mmdb`) readable by any MMDB
//!   reader, with records shaped like GeoIP2-Country
//! - a V2Ray `geoip.dat` rule list
//! - optional plaintext dumps of the merged lists
//!
//! # Quick Start
//!
//! ```ignore
//! use k2geoip::{BuildConfig, GeoIpBuilder, InputSource};
//!
//! let config = BuildConfig {
//!     input: InputSource::Directory("./data".into()),
//!     output_dir: "./output".into(),
//!     export_lists: vec!["cn".to_string()],
//!     ..BuildConfig::default()
//! };
//!
//! let report = GeoIpBuilder::new(config)?.build()?;
//! println!("{} identifiers written", report.identifiers.len());
//! ```
//!
//! # Pipeline
//!
//! 1. Scan: every list file is parsed; its identifier is the upper-cased
//!    file stem (`cn.txt` → `CN`)
//! 2. Merge: each list is reduced to its minimal covering CIDR set
//! 3. Insert: every merged CIDR is inserted with the identifier's record
//! 4. Reserved ranges, if any, are inserted last under `RESERVED`
//! 5. The database and `geoip.dat` are written to the output directory
//!
//! Overlapping ranges from different lists are resolved by insertion order:
//! the network inserted last wins.

mod error;

pub mod aggregate;
pub mod builder;
pub mod config;
pub mod export;
pub mod geodat;
pub mod inspect;
pub mod list;
pub mod mmdb;
pub mod record;

// Re-export core types
pub use error::{Error, Result};

pub use aggregate::{Aggregator, CidrMerger};
pub use builder::{BuildReport, GeoIpBuilder};
pub use config::{BuildConfig, BuildOverrides, InputSource};
pub use geodat::{GeoIp, GeoIpList};
pub use inspect::DatabaseInspector;
pub use list::{load_list, scan_dir, ListFile, RangeGroups};
pub use mmdb::{DatabaseWriter, MmdbOptions, MmdbWriter, Value};
pub use record::{CountryRecord, RecordTemplates, RESERVED_IDENTIFIER};
