use server::cmts_config::{CmtsFile, GateDirection};
use std::net::IpAddr;

const GATE_TABLES: &str = "
port: 7777
numberOfSupportedClassifiers: 4
serviceClassNames:
  - direction: UPSTREAM
    names: [extrm_up, bronze_up]
  - direction: DOWNSTREAM
    names: [extrm_dn]
  - direction: UPSTREAM
    names: [gold_up]
cmStatuses:
  - host: 10.32.110.2
    status: true
  - host: 10.32.110.3
    status: false
";

#[test]
fn test_parse_gate_tables() {
    let file = CmtsFile::from_yaml(GATE_TABLES).unwrap();

    assert_eq!(file.port, 7777);
    assert_eq!(file.number_of_supported_classifiers, 4);
    assert_eq!(file.service_class_names.len(), 3);
    assert_eq!(file.service_class_names[1].direction, GateDirection::Downstream);
    assert_eq!(file.cm_statuses.len(), 2);
}

#[test]
fn test_to_config() {
    let config = CmtsFile::from_yaml(GATE_TABLES).unwrap().to_config();

    assert_eq!(config.max_classifiers, 4);
    assert_eq!(config.upstream_service_classes.len(), 3);
    assert!(config.upstream_service_classes.contains("gold_up"));
    assert!(config.downstream_service_classes.contains("extrm_dn"));
    assert!(!config.downstream_service_classes.contains("extrm_up"));

    let online: IpAddr = "10.32.110.2".parse().unwrap();
    let offline: IpAddr = "10.32.110.3".parse().unwrap();
    let unknown: IpAddr = "10.32.110.4".parse().unwrap();
    assert!(config.is_modem_online(&online));
    assert!(!config.is_modem_online(&offline));
    assert!(!config.is_modem_online(&unknown));
}

#[test]
fn test_optional_sections() {
    let file = CmtsFile::from_yaml("numberOfSupportedClassifiers: 1\n").unwrap();

    assert_eq!(file.port, 0);
    assert!(file.service_class_names.is_empty());
    assert!(file.to_config().cm_status.is_empty());
}

#[test]
fn test_invalid_tables() {
    let bad_direction = "
numberOfSupportedClassifiers: 1
serviceClassNames:
  - direction: SIDEWAYS
    names: [extrm_up]
";
    assert!(CmtsFile::from_yaml(bad_direction).is_err());

    let bad_host = "
numberOfSupportedClassifiers: 1
cmStatuses:
  - host: not-an-address
    status: true
";
    assert!(CmtsFile::from_yaml(bad_host).is_err());
}
