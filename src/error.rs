//! Error types for k2geoip.

use thiserror::Error;

/// Error type for k2geoip operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid CIDR notation
    #[error("invalid CIDR pattern: {0}")]
    InvalidCidr(String),

    /// CIDR aggregation failed for a list
    #[error("fail to merge CIDRs: {0}")]
    Aggregate(String),

    /// Network cannot be stored in the database
    #[error("invalid network for this database: {0}")]
    InvalidNetwork(String),

    /// A data section value exceeds the encodable size
    #[error("value too large to encode: {0} bytes")]
    DataTooLarge(usize),

    /// Search tree grew beyond what the record size can address
    #[error("search tree has {nodes} nodes, record size {record_size} cannot address it")]
    TooManyNodes { nodes: usize, record_size: u16 },

    /// GeoIP database error
    #[error("GeoIP error: {0}")]
    GeoIp(String),

    /// Malformed geoip.dat payload
    #[error("protobuf decoding error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for k2geoip operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<maxminddb::MaxMindDBError> for Error {
    fn from(e: maxminddb::MaxMindDBError) -> Self {
        Error::GeoIp(e.to_string())
    }
}
