//! k2geoip-gen: CLI tool for building MMDB and geoip.dat files from CIDR lists.

use clap::{Args, Parser, Subcommand};
use k2geoip::{BuildConfig, BuildOverrides, DatabaseInspector, GeoIpBuilder};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "k2geoip-gen")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Build GeoIP databases from plaintext CIDR lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build Country.mmdb and geoip.dat from CIDR list files
    Build(BuildArgs),

    /// Look up addresses in a generated database
    Lookup {
        /// MMDB file to query
        #[arg(short, long, default_value = "Country.mmdb")]
        database: PathBuf,

        /// Addresses to look up
        #[arg(required = true)]
        ips: Vec<IpAddr>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// YAML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of CIDR list files, or a single list file
    #[arg(short = 's', long = "datapath")]
    data_path: Option<PathBuf>,

    /// Identifier for a single-file datapath (defaults to the file name)
    #[arg(long)]
    identifier: Option<String>,

    /// Directory to place all generated files
    #[arg(short = 'd', long = "outputdir")]
    output_dir: Option<PathBuf>,

    /// MMDB file name
    #[arg(short = 'o', long = "outputname")]
    output_name: Option<String>,

    /// MMDB database type label
    #[arg(short = 't', long)]
    database_type: Option<String>,

    /// Lists to be exported in plaintext format, separated by ','
    #[arg(long = "exportlists", value_delimiter = ',')]
    export_lists: Option<Vec<String>>,

    /// Reserved ranges file, tagged with the RESERVED record
    #[arg(short = 'r', long)]
    reserved: Option<PathBuf>,

    /// geoip.dat file name
    #[arg(long)]
    geodat_name: Option<String>,

    /// Do not write geoip.dat
    #[arg(long)]
    no_geodat: bool,

    /// MMDB record size (24, 28 or 32)
    #[arg(long)]
    record_size: Option<u16>,

    /// Write .sha256sum files next to each artifact
    #[arg(long)]
    checksums: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Build(args) => args.verbose,
        Commands::Lookup { verbose, .. } => *verbose,
    };
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Build(args) => build(args),
        Commands::Lookup { database, ips, .. } => lookup(&database, &ips),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn build(args: BuildArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply_args(args)?;
    let report = GeoIpBuilder::new(config)?.build()?;

    if !report.skipped.is_empty() {
        log::warn!("skipped lists: {}", report.skipped.join(", "));
    }
    for path in &report.outputs {
        println!("Generated {:?}", path);
    }
    Ok(())
}

/// Start from the config file (or defaults) and apply command line flags.
fn apply_args(args: BuildArgs) -> Result<BuildConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };

    config.apply(BuildOverrides {
        data_path: args.data_path,
        identifier: args.identifier,
        output_dir: args.output_dir,
        output_name: args.output_name,
        database_type: args.database_type,
        export_lists: args.export_lists,
        reserved: args.reserved,
        geodat_name: args.geodat_name,
        no_geodat: args.no_geodat,
        record_size: args.record_size,
        checksums: args.checksums,
    })?;
    Ok(config)
}

fn lookup(database: &Path, ips: &[IpAddr]) -> Result<(), Box<dyn std::error::Error>> {
    let inspector = DatabaseInspector::open(database)?;
    let meta = inspector.metadata();
    log::debug!(
        "{}: type {}, {} nodes, record size {}",
        database.display(),
        meta.database_type,
        meta.node_count,
        meta.record_size
    );

    for ip in ips {
        match inspector.record(*ip)? {
            Some(record) => println!("{}\t{}", ip, serde_json::to_string(&record)?),
            None => println!("{}\tnot found", ip),
        }
    }
    Ok(())
}
