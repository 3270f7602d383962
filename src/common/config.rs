use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    /// Size share given to newly created containers.
    #[serde(default = "default_size_percentage")]
    pub default_size_percentage: f64,
    /// Whether [`ContainerTree::validate`](crate::model::ContainerTree::validate)
    /// checks that the size shares of each container's children add up to 1.
    #[serde(default = "no")]
    pub check_size_shares: bool,
    #[serde(default = "default_size_share_tolerance")]
    pub size_share_tolerance: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_size_percentage: default_size_percentage(),
            check_size_shares: no(),
            size_share_tolerance: default_size_share_tolerance(),
        }
    }
}

impl TreeConfig {
    pub fn read(path: &Path) -> anyhow::Result<TreeConfig> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<TreeConfig> {
        let config: TreeConfig = toml::from_str(buf)?;
        Ok(config)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.default_size_percentage.is_finite() || self.default_size_percentage < 0.0 {
            issues.push(format!(
                "default_size_percentage must be a non-negative number, got {}",
                self.default_size_percentage
            ));
        }

        if !self.size_share_tolerance.is_finite() || self.size_share_tolerance < 0.0 {
            issues.push(format!(
                "size_share_tolerance must be a non-negative number, got {}",
                self.size_share_tolerance
            ));
        }

        issues
    }
}

fn no() -> bool { false }
fn default_size_percentage() -> f64 { 1.0 }
fn default_size_share_tolerance() -> f64 { 1e-6 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = TreeConfig::parse("").unwrap();
        assert_eq!(config, TreeConfig::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn parses_all_fields() {
        let config = TreeConfig::parse(
            r#"
            default_size_percentage = 0.5
            check_size_shares = true
            size_share_tolerance = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(config.default_size_percentage, 0.5);
        assert!(config.check_size_shares);
        assert_eq!(config.size_share_tolerance, 0.01);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(TreeConfig::parse("gaps = 3").is_err());
    }

    #[test]
    fn validate_reports_negative_values() {
        let config = TreeConfig {
            default_size_percentage: -1.0,
            size_share_tolerance: f64::NAN,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("default_size_percentage"));
        assert!(issues[1].contains("size_share_tolerance"));
    }

    #[test]
    fn read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.toml");
        std::fs::write(&path, "check_size_shares = true\n").unwrap();
        let config = TreeConfig::read(&path).unwrap();
        assert!(config.check_size_shares);
        assert!(TreeConfig::read(&dir.path().join("missing.toml")).is_err());
    }
}
