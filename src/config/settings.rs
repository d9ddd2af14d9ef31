use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};
use crate::vault::{PersistenceClass, TargetResolver, DEFAULT_NAMESPACE};

/// Settings loaded from `.credvault.toml`.
///
/// Every field has a default so CredVault works without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Prefix applied to unqualified target names.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Persistence class for new credentials when none is given.
    #[serde(default)]
    pub default_persistence: PersistenceClass,

    /// Directory (relative to the working directory) for local state such
    /// as the audit database.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_state_dir() -> String {
    ".credvault".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            default_persistence: PersistenceClass::default(),
            state_dir: default_state_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".credvault.toml";

    /// Load settings from `<dir>/.credvault.toml`.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.namespace.is_empty() || settings.namespace.contains(':') {
            return Err(CredVaultError::ConfigError(format!(
                "namespace '{}' must be non-empty and must not contain ':'",
                settings.namespace
            )));
        }

        Ok(settings)
    }

    /// Target resolver for the configured namespace.
    pub fn resolver(&self) -> TargetResolver {
        TargetResolver::new(self.namespace.clone())
    }

    /// Directory holding local state, e.g. `dir/.credvault`.
    pub fn state_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.state_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.namespace, "MicrosoftPowerShell");
        assert_eq!(s.default_persistence, PersistenceClass::Enterprise);
        assert_eq!(s.state_dir, ".credvault");
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.namespace, "MicrosoftPowerShell");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
namespace = "DeployTools"
default_persistence = "localMachine"
state_dir = "state"
"#;
        fs::write(tmp.path().join(".credvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.namespace, "DeployTools");
        assert_eq!(settings.default_persistence, PersistenceClass::LocalMachine);
        assert_eq!(settings.state_dir, "state");
        assert_eq!(
            settings.resolver().normalize("alice"),
            "DeployTools:user=alice"
        );
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "namespace = \"ops\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.namespace, "ops");
        assert_eq!(settings.state_dir, ".credvault");
        assert_eq!(settings.default_persistence, PersistenceClass::Enterprise);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_qualified_namespace() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "namespace = \"a:b\"\n").unwrap();
        assert!(matches!(
            Settings::load(tmp.path()),
            Err(CredVaultError::ConfigError(_))
        ));
    }

    #[test]
    fn state_path_respects_custom_dir() {
        let s = Settings {
            state_dir: "state".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            s.state_path(Path::new("/home/user/project")),
            PathBuf::from("/home/user/project/state")
        );
    }
}
