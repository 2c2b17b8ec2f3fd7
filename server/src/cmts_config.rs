//! The CMTS emulator's gate tables, read from YAML.

use anyhow::Context;
use peer::cmts::CmtsConfig;
use serde::Deserialize;
use std::{fs, net::IpAddr, path::Path};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmtsFile {
    /// Overrides the configured COPS port when non-zero.
    #[serde(default)]
    pub port: u16,
    pub number_of_supported_classifiers: usize,
    #[serde(default)]
    pub service_class_names: Vec<ServiceClassNames>,
    #[serde(default)]
    pub cm_statuses: Vec<CmStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateDirection {
    Upstream,
    Downstream,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceClassNames {
    pub direction: GateDirection,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmStatus {
    pub host: IpAddr,
    pub status: bool,
}

impl CmtsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn to_config(&self) -> CmtsConfig {
        let mut config = CmtsConfig {
            max_classifiers: self.number_of_supported_classifiers,
            ..CmtsConfig::default()
        };

        for entry in &self.service_class_names {
            let names = match entry.direction {
                GateDirection::Upstream => &mut config.upstream_service_classes,
                GateDirection::Downstream => &mut config.downstream_service_classes,
            };
            names.extend(entry.names.iter().cloned());
        }
        // A later entry for the same modem wins
        config
            .cm_status
            .extend(self.cm_statuses.iter().map(|cm| (cm.host, cm.status)));

        config
    }
}
