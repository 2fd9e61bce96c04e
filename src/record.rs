//! Country records attached to every inserted network.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::mmdb::Value;

/// Identifier used for the reserved-ranges list.
pub const RESERVED_IDENTIFIER: &str = "RESERVED";

/// GeoNames id of China.
const CN_GEONAME_ID: u32 = 1_814_991;

/// Fields of the `country` map in a GeoIP2-Country record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountryRecord {
    pub iso_code: String,
    #[serde(default)]
    pub geoname_id: Option<u32>,
    #[serde(default)]
    pub is_in_european_union: bool,
    /// Localized names; `en` defaults to the ISO code
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl CountryRecord {
    /// Plain record: `iso_code` and `names.en` both set to the identifier.
    pub fn new(identifier: &str) -> Self {
        Self {
            iso_code: identifier.to_string(),
            geoname_id: None,
            is_in_european_union: false,
            names: BTreeMap::from([("en".to_string(), identifier.to_string())]),
        }
    }

    /// Build the nested `{country: {...}}` value.
    pub fn to_value(&self) -> Value {
        let mut names: BTreeMap<String, Value> = self
            .names
            .iter()
            .map(|(lang, name)| (lang.clone(), Value::from(name.as_str())))
            .collect();
        names
            .entry("en".to_string())
            .or_insert_with(|| Value::from(self.iso_code.as_str()));

        let mut country = BTreeMap::new();
        if let Some(id) = self.geoname_id {
            country.insert("geoname_id".to_string(), Value::Uint32(id));
        }
        country.insert(
            "is_in_european_union".to_string(),
            Value::Bool(self.is_in_european_union),
        );
        country.insert("iso_code".to_string(), Value::from(self.iso_code.as_str()));
        country.insert("names".to_string(), Value::Map(names));

        Value::map([("country", Value::Map(country))])
    }
}

/// Identifier → record template registry.
///
/// Identifiers without a template get [`CountryRecord::new`].
#[derive(Debug, Clone)]
pub struct RecordTemplates {
    templates: BTreeMap<String, CountryRecord>,
}

impl Default for RecordTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RecordTemplates {
    /// No templates at all.
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Templates for `CN` and `RESERVED`.
    pub fn builtin() -> Self {
        let cn_names = [
            ("de", "China"),
            ("en", "China"),
            ("es", "China"),
            ("fr", "Chine"),
            ("ja", "中国"),
            ("pt-BR", "China"),
            ("ru", "Китай"),
            ("zh-CN", "中国"),
        ];
        let cn = CountryRecord {
            iso_code: "CN".to_string(),
            geoname_id: Some(CN_GEONAME_ID),
            is_in_european_union: false,
            names: cn_names
                .iter()
                .map(|(lang, name)| (lang.to_string(), name.to_string()))
                .collect(),
        };

        let reserved = CountryRecord {
            iso_code: RESERVED_IDENTIFIER.to_string(),
            geoname_id: None,
            is_in_european_union: false,
            names: BTreeMap::from([("en".to_string(), "Reserved".to_string())]),
        };

        let mut templates = Self::empty();
        templates.insert("CN", cn);
        templates.insert(RESERVED_IDENTIFIER, reserved);
        templates
    }

    /// Add or replace the template for an identifier.
    pub fn insert(&mut self, identifier: &str, record: CountryRecord) {
        self.templates.insert(identifier.to_uppercase(), record);
    }

    pub fn get(&self, identifier: &str) -> Option<&CountryRecord> {
        self.templates.get(&identifier.to_uppercase())
    }

    /// Build the record value for an identifier.
    pub fn record_for(&self, identifier: &str) -> Value {
        match self.get(identifier) {
            Some(template) => template.to_value(),
            None => CountryRecord::new(identifier).to_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_shape() {
        let value = RecordTemplates::builtin().record_for("US");
        let country = value.get("country").unwrap();

        assert_eq!(country.get("iso_code").and_then(Value::as_str), Some("US"));
        assert_eq!(country.get("is_in_european_union"), Some(&Value::Bool(false)));
        assert_eq!(
            country.get("names").and_then(|n| n.get("en")).and_then(Value::as_str),
            Some("US")
        );
        assert!(country.get("geoname_id").is_none());
    }

    #[test]
    fn test_cn_template() {
        let value = RecordTemplates::builtin().record_for("cn");
        let country = value.get("country").unwrap();

        assert_eq!(country.get("geoname_id"), Some(&Value::Uint32(1_814_991)));
        assert_eq!(
            country.get("names").and_then(|n| n.get("zh-CN")).and_then(Value::as_str),
            Some("中国")
        );
    }

    #[test]
    fn test_reserved_template() {
        let value = RecordTemplates::builtin().record_for(RESERVED_IDENTIFIER);
        let country = value.get("country").unwrap();

        assert_eq!(country.get("iso_code").and_then(Value::as_str), Some("RESERVED"));
        assert_eq!(
            country.get("names").and_then(|n| n.get("en")).and_then(Value::as_str),
            Some("Reserved")
        );
    }

    #[test]
    fn test_override_without_english_name() {
        let mut templates = RecordTemplates::empty();
        templates.insert(
            "de",
            CountryRecord {
                iso_code: "DE".to_string(),
                geoname_id: Some(2_921_044),
                is_in_european_union: true,
                names: BTreeMap::from([("de".to_string(), "Deutschland".to_string())]),
            },
        );

        let value = templates.record_for("DE");
        let country = value.get("country").unwrap();
        assert_eq!(country.get("is_in_european_union"), Some(&Value::Bool(true)));
        assert_eq!(
            country.get("names").and_then(|n| n.get("en")).and_then(Value::as_str),
            Some("DE")
        );
    }
}
