//! Build configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::export::is_safe_identifier;
use crate::list::{identifier_for, ListFile};
use crate::mmdb::MmdbOptions;
use crate::record::{CountryRecord, RecordTemplates};
use crate::{Error, Result};

/// Where the CIDR lists come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Every file under a directory, identifier taken from the file name
    Directory(PathBuf),
    /// Explicit files with fixed identifiers
    Files(Vec<ListFile>),
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::Directory(PathBuf::from("./data"))
    }
}

/// Settings for one build run.
///
/// Loaded from YAML; every field is optional:
/// ```yaml
/// input:
///   files:
///     - identifier: CN
///       path: ipip_cn.txt
/// reserved: reserved.txt
/// export_lists: [cn]
/// output_dir: ./output
/// database_type: GeoIP2-CN
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub input: InputSource,
    /// Reserved ranges, tagged with the `RESERVED` record
    pub reserved: Option<PathBuf>,
    /// Identifiers to also write as `<id>.txt` (case-insensitive)
    pub export_lists: Vec<String>,
    pub output_dir: PathBuf,
    /// MMDB file name
    pub output_name: String,
    /// MMDB `database_type`
    pub database_type: String,
    /// `geoip.dat` file name; `None` skips the file
    pub geodat_name: Option<String>,
    pub record_size: u16,
    pub ip_version: u16,
    pub languages: Vec<String>,
    pub description: BTreeMap<String, String>,
    /// Write `.sha256sum` files next to each artifact
    pub checksums: bool,
    /// Record overrides keyed by identifier
    pub records: BTreeMap<String, CountryRecord>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input: InputSource::default(),
            reserved: None,
            export_lists: Vec::new(),
            output_dir: PathBuf::from("./"),
            output_name: "Country.mmdb".to_string(),
            database_type: "GeoIP2-Country".to_string(),
            geodat_name: Some("geoip.dat".to_string()),
            record_size: 24,
            ip_version: 6,
            languages: vec!["en".to_string()],
            description: BTreeMap::new(),
            checksums: false,
            records: BTreeMap::new(),
        }
    }
}

impl BuildConfig {
    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: BuildConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.record_size, 24 | 28 | 32) {
            return Err(Error::Config(format!(
                "record_size must be 24, 28 or 32, got {}",
                self.record_size
            )));
        }
        if !matches!(self.ip_version, 4 | 6) {
            return Err(Error::Config(format!(
                "ip_version must be 4 or 6, got {}",
                self.ip_version
            )));
        }
        if self.output_name.trim().is_empty() {
            return Err(Error::Config("output_name is empty".to_string()));
        }
        if let Some(name) = &self.geodat_name {
            if name.trim().is_empty() || *name == self.output_name {
                return Err(Error::Config(format!("invalid geodat_name {:?}", name)));
            }
        }
        if let InputSource::Files(files) = &self.input {
            if let Some(file) = files.iter().find(|f| !is_safe_identifier(&f.identifier)) {
                return Err(Error::Config(format!(
                    "invalid identifier {:?} for {}",
                    file.identifier,
                    file.path.display()
                )));
            }
        }
        Ok(())
    }

    /// Apply command line overrides on top of this config, then validate.
    ///
    /// A `data_path` naming a regular file becomes a single-file input under
    /// `identifier`, or the file's upper-cased stem. `no_geodat` wins over
    /// `geodat_name`; blank entries in `export_lists` are dropped.
    pub fn apply(&mut self, overrides: BuildOverrides) -> Result<()> {
        if let Some(path) = overrides.data_path {
            self.input = if path.is_file() {
                let identifier = match overrides.identifier {
                    Some(id) => id,
                    None => identifier_for(&path).ok_or_else(|| {
                        Error::Config(format!("cannot derive identifier from {}", path.display()))
                    })?,
                };
                InputSource::Files(vec![ListFile::new(identifier, path)])
            } else {
                InputSource::Directory(path)
            };
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(name) = overrides.output_name {
            self.output_name = name;
        }
        if let Some(database_type) = overrides.database_type {
            self.database_type = database_type;
        }
        if let Some(lists) = overrides.export_lists {
            self.export_lists = lists.into_iter().filter(|s| !s.trim().is_empty()).collect();
        }
        if let Some(reserved) = overrides.reserved {
            self.reserved = Some(reserved);
        }
        if let Some(name) = overrides.geodat_name {
            self.geodat_name = Some(name);
        }
        if overrides.no_geodat {
            self.geodat_name = None;
        }
        if let Some(record_size) = overrides.record_size {
            self.record_size = record_size;
        }
        if overrides.checksums {
            self.checksums = true;
        }

        self.validate()
    }

    pub fn mmdb_options(&self) -> MmdbOptions {
        MmdbOptions {
            database_type: self.database_type.clone(),
            description: self.description.clone(),
            languages: self.languages.clone(),
            ip_version: self.ip_version,
            record_size: self.record_size,
            ..MmdbOptions::default()
        }
    }

    /// Built-in templates with the configured overrides applied.
    pub fn record_templates(&self) -> RecordTemplates {
        let mut templates = RecordTemplates::builtin();
        for (identifier, record) in &self.records {
            templates.insert(identifier, record.clone());
        }
        templates
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    pub fn geodat_path(&self) -> Option<PathBuf> {
        self.geodat_name.as_ref().map(|name| self.output_dir.join(name))
    }

    /// Whether `identifier` should be exported as plaintext.
    pub fn exports(&self, identifier: &str) -> bool {
        self.export_lists
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(identifier))
    }
}

/// Command line values layered over a [`BuildConfig`]; `None` and `false`
/// leave the config untouched.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    /// Directory of lists, or a single list file
    pub data_path: Option<PathBuf>,
    /// Identifier for a single-file `data_path`
    pub identifier: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub database_type: Option<String>,
    pub export_lists: Option<Vec<String>>,
    pub reserved: Option<PathBuf>,
    pub geodat_name: Option<String>,
    pub no_geodat: bool,
    pub record_size: Option<u16>,
    pub checksums: bool,
}
