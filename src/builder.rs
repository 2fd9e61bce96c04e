//! Build pipeline: scan → merge → insert → export → write.

use std::fs;
use std::path::{Path, PathBuf};

use ipnet::IpNet;
use log::{debug, info, warn};
use prost::Message;

use crate::aggregate::{Aggregator, CidrMerger};
use crate::config::{BuildConfig, InputSource};
use crate::export::{export_plaintext, write_checksum};
use crate::geodat::{GeoIp, GeoIpList};
use crate::list::{load_list, scan_dir, scan_files, RangeGroups};
use crate::mmdb::{DatabaseWriter, MmdbWriter};
use crate::record::{RecordTemplates, RESERVED_IDENTIFIER};
use crate::Result;

/// Outcome of a successful build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Identifiers written to the database, in insertion order
    pub identifiers: Vec<String>,
    /// Identifiers dropped because their list could not be merged
    pub skipped: Vec<String>,
    /// Number of networks inserted
    pub networks: usize,
    /// Every file written
    pub outputs: Vec<PathBuf>,
}

/// Runs a build with pluggable aggregation and database writing.
pub struct GeoIpBuilder<A = CidrMerger, W = MmdbWriter> {
    config: BuildConfig,
    aggregator: A,
    writer: W,
    templates: RecordTemplates,
    geodat: GeoIpList,
    report: BuildReport,
}

impl GeoIpBuilder {
    /// Builder with the default merger and an MMDB writer set up from the
    /// config.
    pub fn new(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        let writer = MmdbWriter::new(config.mmdb_options())?;
        Ok(Self::with_parts(config, CidrMerger, writer))
    }
}

impl<A: Aggregator, W: DatabaseWriter> GeoIpBuilder<A, W> {
    pub fn with_parts(config: BuildConfig, aggregator: A, writer: W) -> Self {
        let templates = config.record_templates();
        Self {
            config,
            aggregator,
            writer,
            templates,
            geodat: GeoIpList::new(),
            report: BuildReport::default(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn geodat(&self) -> &GeoIpList {
        &self.geodat
    }

    /// Load the configured input lists.
    pub fn collect(&self) -> Result<RangeGroups> {
        match &self.config.input {
            InputSource::Directory(dir) => {
                info!("scanning {}", dir.display());
                scan_dir(dir)
            }
            InputSource::Files(files) => scan_files(files),
        }
    }

    /// Merge one group and insert it.
    ///
    /// A merge failure is logged and the group skipped; insertion and export
    /// failures are returned.
    pub fn add_group(&mut self, identifier: &str, ranges: &[IpNet]) -> Result<()> {
        let merged = match self.aggregator.aggregate(ranges) {
            Ok(merged) => merged,
            Err(e) => {
                warn!("{}: {}, skipped", identifier, e);
                self.report.skipped.push(identifier.to_string());
                return Ok(());
            }
        };

        debug!(
            "{}: {} CIDRs merged into {}",
            identifier,
            ranges.len(),
            merged.len()
        );

        let record = self.templates.record_for(identifier);
        for net in &merged {
            self.writer.insert(*net, &record)?;
        }

        self.geodat.push(GeoIp::new(identifier, &merged));

        if self.config.exports(identifier) {
            let path = export_plaintext(&self.config.output_dir, identifier, &merged)?;
            info!("exported {} to {}", identifier, path.display());
            self.report.outputs.push(path);
        }

        self.report.identifiers.push(identifier.to_string());
        self.report.networks += merged.len();
        Ok(())
    }

    /// Insert every group, in identifier order.
    pub fn add_groups(&mut self, groups: &RangeGroups) -> Result<()> {
        for (identifier, ranges) in groups {
            self.add_group(identifier, ranges)?;
        }
        Ok(())
    }

    /// Load the reserved list, if configured, and insert it last so it takes
    /// precedence over overlapping country ranges.
    pub fn add_reserved(&mut self) -> Result<()> {
        let Some(path) = self.config.reserved.clone() else {
            return Ok(());
        };
        info!("loading reserved ranges from {}", path.display());
        let ranges = load_list(&path)?;
        self.add_group(RESERVED_IDENTIFIER, &ranges)
    }

    /// Serialize the database and write every artifact.
    pub fn finish(mut self) -> Result<BuildReport> {
        let output_path = self.config.output_path();
        let data = self.writer.serialize()?;
        self.write_artifact(&output_path, &data)?;

        if let Some(path) = self.config.geodat_path() {
            let data = self.geodat.encode_to_vec();
            self.write_artifact(&path, &data)?;
        }

        info!(
            "wrote {} identifiers, {} networks",
            self.report.identifiers.len(),
            self.report.networks
        );
        Ok(self.report)
    }

    fn write_artifact(&mut self, path: &Path, data: &[u8]) -> Result<()> {
        fs::write(path, data)?;
        info!("wrote {} ({} bytes)", path.display(), data.len());
        self.report.outputs.push(path.to_path_buf());

        if self.config.checksums {
            let sum_path = write_checksum(path, data)?;
            self.report.outputs.push(sum_path);
        }
        Ok(())
    }

    /// Full run.
    pub fn build(mut self) -> Result<BuildReport> {
        fs::create_dir_all(&self.config.output_dir)?;

        let groups = self.collect()?;
        info!("loaded {} lists", groups.len());

        self.add_groups(&groups)?;
        self.add_reserved()?;
        self.finish()
    }
}
