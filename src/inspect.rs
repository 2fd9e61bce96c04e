//! Reading generated databases back.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{MaxMindDBError, Metadata, Reader};

use crate::{Error, Result};

/// Read-only view of an MMDB file.
pub struct DatabaseInspector {
    reader: Reader<Vec<u8>>,
}

impl DatabaseInspector {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = Reader::open_readfile(path.as_ref())?;
        Ok(Self { reader })
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let reader = Reader::from_source(data)?;
        Ok(Self { reader })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.reader.metadata
    }

    /// Full record for an address, `None` when the address has no data.
    pub fn record(&self, ip: IpAddr) -> Result<Option<serde_json::Value>> {
        match self.reader.lookup::<serde_json::Value>(ip) {
            Ok(value) => Ok(Some(value)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Country ISO code for an address.
    pub fn country_code(&self, ip: IpAddr) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct Country {
            iso_code: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct GeoIpResponse {
            country: Option<Country>,
        }

        let result: GeoIpResponse = self.reader.lookup(ip).ok()?;
        result.country?.iso_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmdb::{DatabaseWriter, MmdbOptions, MmdbWriter};
    use crate::record::RecordTemplates;

    fn database() -> Vec<u8> {
        let templates = RecordTemplates::builtin();
        let mut writer = MmdbWriter::new(MmdbOptions::default()).unwrap();
        writer
            .insert("2.2.2.0/24".parse().unwrap(), &templates.record_for("CN"))
            .unwrap();
        writer.serialize().unwrap()
    }

    #[test]
    fn test_country_code() {
        let inspector = DatabaseInspector::from_bytes(database()).unwrap();
        assert_eq!(
            inspector.country_code("2.2.2.2".parse().unwrap()).as_deref(),
            Some("CN")
        );
        assert_eq!(inspector.country_code("8.8.8.8".parse().unwrap()), None);
    }

    #[test]
    fn test_record_as_json() {
        let inspector = DatabaseInspector::from_bytes(database()).unwrap();

        let record = inspector.record("2.2.2.2".parse().unwrap()).unwrap().unwrap();
        assert_eq!(record["country"]["geoname_id"], 1_814_991);
        assert_eq!(record["country"]["names"]["zh-CN"], "中国");
        assert_eq!(record["country"]["is_in_european_union"], false);

        assert!(inspector.record("9.9.9.9".parse().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        assert!(DatabaseInspector::open("/nonexistent/Country.mmdb").is_err());
    }
}
