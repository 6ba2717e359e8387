//! Immutable server configuration, assembled once at startup via a builder.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("vg_name must be set")]
    MissingVgName,
    #[error("pv_names must be non-empty")]
    MissingPvNames,
    #[error("invalid tag: {0}")]
    InvalidTag(String),
}

/// The plugin's operating parameters, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub vg_name: String,
    pub pv_names: Vec<String>,
    pub default_volume_size_bytes: u64,
    pub supported_filesystems: HashMap<String, String>,
    pub removing_volume_group: bool,
    pub tags: Vec<String>,
}

impl ServerConfig {
    /// The filesystem substituted for a request that specifies no `fs_type`.
    pub fn default_filesystem(&self) -> &str {
        self.supported_filesystems
            .get("")
            .expect("builder enforces the empty-string key")
    }

    pub fn is_supported_filesystem(&self, fs_type: &str) -> bool {
        self.supported_filesystems.contains_key(fs_type)
    }
}

#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    vg_name: Option<String>,
    pv_names: Vec<String>,
    default_volume_size_bytes: u64,
    supported_filesystems: HashMap<String, String>,
    removing_volume_group: bool,
    tags: Vec<String>,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            default_volume_size_bytes: u64::MAX,
            ..Default::default()
        }
    }

    pub fn vg_name(mut self, vg_name: impl Into<String>) -> Self {
        self.vg_name = Some(vg_name.into());
        self
    }

    pub fn pv_names(mut self, pv_names: Vec<String>) -> Self {
        self.pv_names = pv_names;
        self
    }

    pub fn default_volume_size(mut self, bytes: u64) -> Self {
        self.default_volume_size_bytes = bytes;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn removing_volume_group(mut self, removing: bool) -> Self {
        self.removing_volume_group = removing;
        self
    }

    pub fn supported_filesystem(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.supported_filesystems.insert(name.into(), default.into());
        self
    }

    /// Enforces I1: the empty-string key is always present, and its value is
    /// itself present as a key (so the default filesystem is always "supported").
    pub fn build(mut self) -> Result<ServerConfig, ConfigError> {
        let vg_name = self.vg_name.ok_or(ConfigError::MissingVgName)?;
        if self.pv_names.is_empty() {
            return Err(ConfigError::MissingPvNames);
        }
        for tag in &self.tags {
            crate::lvm::validate_tag(tag).map_err(|e| ConfigError::InvalidTag(e.to_string()))?;
        }

        if !self.supported_filesystems.contains_key("") {
            self.supported_filesystems
                .insert(String::new(), "ext4".to_string());
        }
        let default_fs = self.supported_filesystems[""].clone();
        self.supported_filesystems
            .entry(default_fs.clone())
            .or_insert(default_fs);

        Ok(ServerConfig {
            vg_name,
            pv_names: self.pv_names,
            default_volume_size_bytes: self.default_volume_size_bytes,
            supported_filesystems: self.supported_filesystems,
            removing_volume_group: self.removing_volume_group,
            tags: self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
            .vg_name("data")
            .pv_names(vec!["/dev/sdb".to_string()])
    }

    #[test]
    fn build_inserts_default_filesystem_key() {
        let config = base_builder().build().unwrap();
        assert!(config.supported_filesystems.contains_key(""));
        let default_fs = config.default_filesystem().to_string();
        assert!(config.supported_filesystems.contains_key(&default_fs));
    }

    #[test]
    fn build_preserves_explicit_default() {
        let config = base_builder()
            .supported_filesystem("", "xfs")
            .supported_filesystem("xfs", "xfs")
            .build()
            .unwrap();
        assert_eq!(config.default_filesystem(), "xfs");
    }

    #[test]
    fn build_requires_vg_name() {
        assert!(ServerConfigBuilder::new()
            .pv_names(vec!["/dev/sdb".to_string()])
            .build()
            .is_err());
    }

    #[test]
    fn build_rejects_invalid_tag() {
        assert!(base_builder().tag("has space").build().is_err());
    }
}
