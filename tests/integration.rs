//! End-to-end tests: list directory in, MMDB and geoip.dat out.

use k2geoip::{
    BuildConfig, DatabaseInspector, GeoIpBuilder, GeoIpList, InputSource, ListFile,
};
use prost::Message;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn write_list(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

fn config(root: &Path) -> BuildConfig {
    BuildConfig {
        input: InputSource::Directory(root.join("data")),
        output_dir: root.join("out"),
        ..BuildConfig::default()
    }
}

#[test]
fn test_directory_build_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_list(&data, "us.txt", "1.1.1.0/24\n1.1.2.0/24\n");
    write_list(&data, "cn.txt", "2.2.2.0/24\n");

    let mut cfg = config(root.path());
    cfg.export_lists = vec!["us".to_string()];
    let report = GeoIpBuilder::new(cfg).unwrap().build().unwrap();

    assert_eq!(report.identifiers, vec!["CN".to_string(), "US".to_string()]);
    assert_eq!(report.networks, 3);
    assert!(report.skipped.is_empty());

    let out = root.path().join("out");
    let db = DatabaseInspector::open(out.join("Country.mmdb")).unwrap();
    assert_eq!(db.metadata().database_type, "GeoIP2-Country");
    assert_eq!(db.country_code(ip("1.1.1.1")).as_deref(), Some("US"));
    assert_eq!(db.country_code(ip("1.1.2.254")).as_deref(), Some("US"));
    assert_eq!(db.country_code(ip("2.2.2.2")).as_deref(), Some("CN"));
    assert_eq!(db.country_code(ip("1.1.3.1")), None);
    assert_eq!(db.country_code(ip("1.1.0.255")), None);

    // CN uses the built-in template
    let cn = db.record(ip("2.2.2.2")).unwrap().unwrap();
    assert_eq!(cn["country"]["geoname_id"], 1_814_991);
    let us = db.record(ip("1.1.1.1")).unwrap().unwrap();
    assert_eq!(us["country"]["names"]["en"], "US");
    assert!(us["country"].get("geoname_id").is_none());

    // Only requested lists are exported
    assert_eq!(
        fs::read_to_string(out.join("us.txt")).unwrap(),
        "1.1.1.0/24\n1.1.2.0/24\n"
    );
    assert!(!out.join("cn.txt").exists());

    let geodat = GeoIpList::decode(fs::read(out.join("geoip.dat")).unwrap().as_slice()).unwrap();
    assert_eq!(geodat.entry.len(), 2);
    let us_entry = geodat.get("US").unwrap();
    assert_eq!(us_entry.cidr.len(), 2);
    assert_eq!(us_entry.cidr[0].ip, vec![1, 1, 1, 0]);
    assert_eq!(us_entry.cidr[0].prefix, 24);
}

#[test]
fn test_lists_are_merged() {
    let root = tempfile::tempdir().unwrap();
    write_list(
        &root.path().join("data"),
        "jp",
        "# comment\n10.0.0.0/25\n10.0.0.128/25\nbogus line\n10.0.0.7/32\n",
    );

    let mut cfg = config(root.path());
    cfg.export_lists = vec!["JP".to_string()];
    GeoIpBuilder::new(cfg).unwrap().build().unwrap();

    let out = root.path().join("out");
    assert_eq!(fs::read_to_string(out.join("jp.txt")).unwrap(), "10.0.0.0/24\n");

    let db = DatabaseInspector::open(out.join("Country.mmdb")).unwrap();
    assert_eq!(db.country_code(ip("10.0.0.200")).as_deref(), Some("JP"));
}

#[test]
fn test_reserved_overrides_country_ranges() {
    let root = tempfile::tempdir().unwrap();
    write_list(&root.path().join("data"), "us.txt", "10.0.0.0/8\n8.8.8.0/24\n");
    let reserved = root.path().join("reserved.txt");
    fs::write(&reserved, "10.0.0.0/8\n192.168.0.0/16\n").unwrap();

    let mut cfg = config(root.path());
    cfg.reserved = Some(reserved);
    let report = GeoIpBuilder::new(cfg).unwrap().build().unwrap();
    assert_eq!(report.identifiers, vec!["US".to_string(), "RESERVED".to_string()]);

    let db = DatabaseInspector::open(root.path().join("out").join("Country.mmdb")).unwrap();
    assert_eq!(db.country_code(ip("10.1.1.1")).as_deref(), Some("RESERVED"));
    assert_eq!(db.country_code(ip("192.168.1.1")).as_deref(), Some("RESERVED"));
    assert_eq!(db.country_code(ip("8.8.8.8")).as_deref(), Some("US"));

    let record = db.record(ip("192.168.1.1")).unwrap().unwrap();
    assert_eq!(record["country"]["names"]["en"], "Reserved");
}

#[test]
fn test_overlapping_lists_last_identifier_wins() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    // groups are inserted in identifier order: AA, then BB
    write_list(&data, "aa.txt", "172.16.0.0/12\n");
    write_list(&data, "bb.txt", "172.20.0.0/16\n");

    GeoIpBuilder::new(config(root.path())).unwrap().build().unwrap();

    let db = DatabaseInspector::open(root.path().join("out").join("Country.mmdb")).unwrap();
    assert_eq!(db.country_code(ip("172.20.1.1")).as_deref(), Some("BB"));
    assert_eq!(db.country_code(ip("172.16.1.1")).as_deref(), Some("AA"));
    assert_eq!(db.country_code(ip("172.31.1.1")).as_deref(), Some("AA"));
}

#[test]
fn test_case_collision_keeps_last_file() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    write_list(&data, "A", "10.0.0.0/24\n");
    write_list(&data, "a", "10.0.1.0/24\n");

    let report = GeoIpBuilder::new(config(root.path())).unwrap().build().unwrap();
    assert_eq!(report.identifiers, vec!["A".to_string()]);

    let db = DatabaseInspector::open(root.path().join("out").join("Country.mmdb")).unwrap();
    assert_eq!(db.country_code(ip("10.0.1.1")).as_deref(), Some("A"));
    assert_eq!(db.country_code(ip("10.0.0.1")), None);
}

#[test]
fn test_single_file_variant() {
    let root = tempfile::tempdir().unwrap();
    let list = root.path().join("ipip_cn.txt");
    fs::write(&list, "1.0.1.0/24\n1.0.2.0/23\n240e::/20\n").unwrap();

    let cfg = BuildConfig {
        input: InputSource::Files(vec![ListFile::new("CN", &list)]),
        output_dir: root.path().join("out"),
        output_name: "Country-cn.mmdb".to_string(),
        database_type: "GeoIP2-CN".to_string(),
        geodat_name: None,
        checksums: true,
        ..BuildConfig::default()
    };
    let report = GeoIpBuilder::new(cfg).unwrap().build().unwrap();

    let out = root.path().join("out");
    assert!(!out.join("geoip.dat").exists());
    assert_eq!(report.outputs.len(), 2);

    let db = DatabaseInspector::open(out.join("Country-cn.mmdb")).unwrap();
    assert_eq!(db.metadata().database_type, "GeoIP2-CN");
    assert_eq!(db.country_code(ip("1.0.3.1")).as_deref(), Some("CN"));
    assert_eq!(db.country_code(ip("240e::1")).as_deref(), Some("CN"));
    assert_eq!(db.country_code(ip("::ffff:1.0.1.1")).as_deref(), Some("CN"));

    let sum = fs::read_to_string(out.join("Country-cn.mmdb.sha256sum")).unwrap();
    assert!(sum.ends_with("  Country-cn.mmdb\n"));
    assert_eq!(sum.len(), 64 + 2 + "Country-cn.mmdb".len() + 1);
}

#[test]
fn test_config_file_with_record_override() {
    let root = tempfile::tempdir().unwrap();
    write_list(&root.path().join("data"), "de.txt", "5.1.0.0/16\n");

    let yaml = format!(
        r#"
input:
  directory: {data}
output_dir: {out}
geodat_name: null
records:
  DE:
    iso_code: DE
    geoname_id: 2921044
    is_in_european_union: true
    names:
      en: Germany
      de: Deutschland
"#,
        data = root.path().join("data").display(),
        out = root.path().join("out").display(),
    );
    let config_path = root.path().join("k2geoip.yaml");
    fs::write(&config_path, yaml).unwrap();

    let cfg = BuildConfig::load(&config_path).unwrap();
    GeoIpBuilder::new(cfg).unwrap().build().unwrap();

    let db = DatabaseInspector::open(root.path().join("out").join("Country.mmdb")).unwrap();
    let record = db.record(ip("5.1.2.3")).unwrap().unwrap();
    assert_eq!(record["country"]["iso_code"], "DE");
    assert_eq!(record["country"]["geoname_id"], 2_921_044);
    assert_eq!(record["country"]["is_in_european_union"], true);
    assert_eq!(record["country"]["names"]["de"], "Deutschland");
}

#[test]
fn test_unwritable_output_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    write_list(&root.path().join("data"), "us.txt", "1.1.1.0/24\n");
    // output_dir is an existing regular file
    let blocker = root.path().join("out");
    fs::write(&blocker, "").unwrap();

    assert!(GeoIpBuilder::new(config(root.path())).unwrap().build().is_err());
}
