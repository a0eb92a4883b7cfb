use serde::Serialize;
use std::path::PathBuf;

use crate::host_config::HostConfig;

/// Browser native messaging host manifest. Chromium reads
/// `allowed_origins`, Firefox reads `allowed_extensions`; empty lists are
/// left out.
#[derive(Serialize, Debug)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_extensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    pub fn new(config: &HostConfig, binary_path: PathBuf) -> Self {
        HostManifest {
            name: config.host_name.clone(),
            description: config.description.clone(),
            path: binary_path,
            kind: "stdio",
            allowed_extensions: config.allowed_extensions.clone(),
            allowed_origins: config.allowed_origins.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_manifest_for_firefox() {
        let config = HostConfig {
            allowed_extensions: vec!["bookmarks@example.com".into()],
            ..Default::default()
        };
        let manifest = HostManifest::new(&config, PathBuf::from("/usr/bin/store-host"));
        let value: Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "com.bookmark.store",
                "description": config.description,
                "path": "/usr/bin/store-host",
                "type": "stdio",
                "allowed_extensions": ["bookmarks@example.com"]
            })
        );
    }

    #[test]
    fn test_manifest_for_chromium_omits_extensions() {
        let config = HostConfig {
            allowed_origins: vec!["chrome-extension://abcdefghijklmnop/".into()],
            ..Default::default()
        };
        let manifest = HostManifest::new(&config, PathBuf::from("/opt/store-host"));
        let value: Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert!(value.get("allowed_extensions").is_none());
        assert_eq!(value["allowed_origins"][0], "chrome-extension://abcdefghijklmnop/");
    }
}
