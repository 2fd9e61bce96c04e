//! V2Ray `geoip.dat` messages.
//!
//! The file is a protobuf `GeoIPList` message:
//! ```text
//! message CIDR      { bytes ip = 1; uint32 prefix = 2; }
//! message GeoIP     { string country_code = 1; repeated CIDR cidr = 2; bool reverse_match = 3; }
//! message GeoIPList { repeated GeoIP entry = 1; }
//! ```
//!
//! Encode with [`prost::Message::encode_to_vec`], decode with
//! [`prost::Message::decode`].

use std::net::IpAddr;

use ipnet::IpNet;

use crate::{Error, Result};

/// A single network of a [`GeoIp`] entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cidr {
    /// 4 bytes for IPv4, 16 for IPv6
    #[prost(bytes = "vec", tag = "1")]
    pub ip: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub prefix: u32,
}

impl From<&IpNet> for Cidr {
    fn from(net: &IpNet) -> Self {
        let ip = match net.network() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Self {
            ip,
            prefix: net.prefix_len() as u32,
        }
    }
}

impl Cidr {
    pub fn to_ipnet(&self) -> Result<IpNet> {
        let addr = match self.ip.len() {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&self.ip);
                IpAddr::from(octets)
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&self.ip);
                IpAddr::from(octets)
            }
            n => return Err(Error::InvalidNetwork(format!("invalid IP length {}", n))),
        };
        let prefix = u8::try_from(self.prefix)
            .map_err(|_| Error::InvalidNetwork(format!("invalid prefix {}", self.prefix)))?;
        IpNet::new(addr, prefix).map_err(|e| Error::InvalidNetwork(e.to_string()))
    }
}

/// Country entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeoIp {
    #[prost(string, tag = "1")]
    pub country_code: String,
    #[prost(message, repeated, tag = "2")]
    pub cidr: Vec<Cidr>,
    #[prost(bool, tag = "3")]
    pub reverse_match: bool,
}

impl GeoIp {
    pub fn new(country_code: &str, networks: &[IpNet]) -> Self {
        Self {
            country_code: country_code.to_string(),
            cidr: networks.iter().map(Cidr::from).collect(),
            reverse_match: false,
        }
    }
}

/// Complete `geoip.dat` contents.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GeoIpList {
    #[prost(message, repeated, tag = "1")]
    pub entry: Vec<GeoIp>,
}

impl GeoIpList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: GeoIp) {
        self.entry.push(entry);
    }

    pub fn get(&self, country_code: &str) -> Option<&GeoIp> {
        self.entry
            .iter()
            .find(|e| e.country_code.eq_ignore_ascii_case(country_code))
    }
}
