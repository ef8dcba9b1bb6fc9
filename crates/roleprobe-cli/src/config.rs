//! Configuration for the roleprobe CLI.
//!
//! Provides the [`RoleProbeConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `ROLEPROBE_CONFIG` environment variable
//! 3. XDG default: `~/.config/roleprobe/config.toml`
//! 4. Built-in defaults
//!
//! `ROLEPROBE_<SECTION>_<KEY>` variables overlay the `emulator`, `probe`
//! and `report` sections. The standard `FIREBASE_AUTH_EMULATOR_HOST` and
//! `FIRESTORE_EMULATOR_HOST` variables override the emulator endpoints last.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use confyg::{Confygery, env};
use roleprobe_core::settings::{
    DEFAULT_API_KEY, DEFAULT_AUTH_HOST, DEFAULT_COLLECTION, DEFAULT_FIRESTORE_HOST,
    DEFAULT_FIRESTORE_PORT, DEFAULT_PROJECT_ID,
};
use roleprobe_core::{Error, FixtureUser, ProbeMode, ProbeSettings, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Auth emulator endpoint variable understood by the Firebase tooling.
pub const AUTH_EMULATOR_HOST_VAR: &str = "FIREBASE_AUTH_EMULATOR_HOST";
/// Firestore emulator endpoint variable understood by the Firebase tooling.
pub const FIRESTORE_EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the roleprobe CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleProbeConfig {
    /// Project id shared by both emulators.
    pub project_id: String,

    /// API key sent with sign-in requests.
    pub api_key: String,

    /// Emulator endpoints.
    pub emulator: EmulatorConfig,

    /// Probe behaviour.
    pub probe: ProbeConfig,

    /// Report output.
    pub report: ReportConfig,

    /// Fixture users, probed in order.
    pub users: Vec<FixtureUser>,
}

/// Emulator endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Auth emulator `host:port`.
    pub auth_host: String,

    /// Firestore emulator host.
    pub firestore_host: String,

    /// Firestore emulator port.
    #[serde(deserialize_with = "from_str_or_value")]
    pub firestore_port: u16,
}

/// Probe behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Collection probe documents are written to.
    pub collection: String,

    /// Probe mode.
    pub mode: ProbeMode,
}

/// Report output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format.
    pub format: ReportFormat,

    /// Print FAILED outcomes as DENIED.
    #[serde(deserialize_with = "from_str_or_value")]
    pub conflate_failures: bool,
}

/// How a run reports its results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Line transcript only.
    #[default]
    Text,
    /// Line transcript followed by a JSON report.
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => f.write_str("text"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for RoleProbeConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            emulator: EmulatorConfig::default(),
            probe: ProbeConfig::default(),
            report: ReportConfig::default(),
            users: FixtureUser::defaults(),
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            firestore_host: DEFAULT_FIRESTORE_HOST.to_string(),
            firestore_port: DEFAULT_FIRESTORE_PORT,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            mode: ProbeMode::default(),
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl RoleProbeConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// Loading priority:
    /// 1. Explicit `config_path` (from `--config` flag)
    /// 2. `ROLEPROBE_CONFIG` env var
    /// 3. XDG default: `~/.config/roleprobe/config.toml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("ROLEPROBE");
        env_opts.add_section("emulator");
        env_opts.add_section("probe");
        env_opts.add_section("report");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let mut config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.apply_emulator_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("ROLEPROBE_CONFIG") {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("roleprobe").join("config.toml"))
    }

    /// Apply the Firebase emulator host variables.
    ///
    /// `lookup` resolves a variable name to its value; [`load`](Self::load)
    /// passes the process environment.
    pub fn apply_emulator_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(AUTH_EMULATOR_HOST_VAR).filter(|h| !h.trim().is_empty()) {
            self.emulator.auth_host = bare_endpoint(AUTH_EMULATOR_HOST_VAR, &value)?.to_string();
        }

        if let Some(value) = lookup(FIRESTORE_EMULATOR_HOST_VAR).filter(|h| !h.trim().is_empty()) {
            let endpoint = bare_endpoint(FIRESTORE_EMULATOR_HOST_VAR, &value)?;
            match endpoint.rsplit_once(':') {
                Some((host, port)) => {
                    self.emulator.firestore_host = host.to_string();
                    self.emulator.firestore_port = port.parse().map_err(|_| {
                        Error::config(format!(
                            "{FIRESTORE_EMULATOR_HOST_VAR}: invalid port in '{endpoint}'"
                        ))
                    })?;
                }
                None => self.emulator.firestore_host = endpoint.to_string(),
            }
        }
        Ok(())
    }

    /// The settings a run uses.
    pub fn to_settings(&self) -> ProbeSettings {
        ProbeSettings {
            auth_host: self.emulator.auth_host.clone(),
            firestore_host: self.emulator.firestore_host.clone(),
            firestore_port: self.emulator.firestore_port,
            project_id: self.project_id.clone(),
            api_key: self.api_key.clone(),
            collection: self.probe.collection.clone(),
            mode: self.probe.mode,
            users: self.users.clone(),
        }
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

// ============================================================================
// Helper: emulator endpoints
// ============================================================================

/// Reduces an emulator endpoint variable to `host[:port]`.
///
/// A leading `http://` and trailing slashes are dropped. Any other scheme or
/// a path is rejected since the emulators are addressed by host and port.
fn bare_endpoint<'a>(var: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    let endpoint = value
        .strip_prefix("http://")
        .unwrap_or(value)
        .trim_end_matches('/');
    if endpoint.is_empty() || endpoint.contains("://") || endpoint.contains('/') {
        return Err(Error::config(format!(
            "{var}: expected host:port, got '{value}'"
        )));
    }
    Ok(endpoint)
}

// ============================================================================
// Helper: accept strings for typed fields
// ============================================================================

/// Deserializes either a native value or its string form.
///
/// Environment overlays arrive as strings, so `ROLEPROBE_EMULATOR_FIRESTORE_PORT=9000`
/// must still produce a `u16`.
fn from_str_or_value<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Value(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Value(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roleprobe_core::Role;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    // ------------------------------------------------------------------------
    // Default tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_default() {
        let config = RoleProbeConfig::default();
        assert_eq!(config.project_id, "firestorerules-70291");
        assert_eq!(config.api_key, "fake-api-key");
        assert_eq!(config.emulator.auth_host, "127.0.0.1:9099");
        assert_eq!(config.emulator.firestore_host, "127.0.0.1");
        assert_eq!(config.emulator.firestore_port, 8080);
        assert_eq!(config.probe.collection, "testCollection");
        assert_eq!(config.probe.mode, ProbeMode::Escalate);
        assert_eq!(config.report.format, ReportFormat::Text);
        assert!(!config.report.conflate_failures);
        assert_eq!(config.users, FixtureUser::defaults());
    }

    #[test]
    fn test_default_settings_match_core_defaults() {
        assert_eq!(
            RoleProbeConfig::default().to_settings(),
            ProbeSettings::default()
        );
    }

    // ------------------------------------------------------------------------
    // Serialization tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            project_id = "demo-rules"

            [emulator]
            auth_host = "localhost:9199"
            firestore_port = 8181

            [probe]
            mode = "seeded"

            [report]
            format = "json"
            conflate_failures = true

            [[users]]
            email = "root@example.com"
            password = "rootpass"
            role = "admin"

            [[users]]
            email = "guest@example.com"
            password = "guestpass"
            role = "viewer"
        "#;

        let config: RoleProbeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project_id, "demo-rules");
        assert_eq!(config.api_key, "fake-api-key");
        assert_eq!(config.emulator.auth_host, "localhost:9199");
        assert_eq!(config.emulator.firestore_host, "127.0.0.1");
        assert_eq!(config.emulator.firestore_port, 8181);
        assert_eq!(config.probe.mode, ProbeMode::Seeded);
        assert_eq!(config.probe.collection, "testCollection");
        assert_eq!(config.report.format, ReportFormat::Json);
        assert!(config.report.conflate_failures);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[1].role, Role::Viewer);
    }

    #[test]
    fn test_string_values_for_typed_fields() {
        let toml_str = r#"
            [emulator]
            firestore_port = "9000"

            [report]
            conflate_failures = "true"
        "#;
        let config: RoleProbeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.emulator.firestore_port, 9000);
        assert!(config.report.conflate_failures);

        let bad = "[emulator]\nfirestore_port = \"eighty\"\n";
        assert!(toml::from_str::<RoleProbeConfig>(bad).is_err());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let toml_str = r#"
            [[users]]
            email = "x@example.com"
            password = "pw"
            role = "owner"
        "#;
        assert!(toml::from_str::<RoleProbeConfig>(toml_str).is_err());
    }

    #[test]
    fn test_config_to_toml() {
        let config = RoleProbeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("project_id = \"firestorerules-70291\""));
        assert!(toml_str.contains("[emulator]"));
        assert!(toml_str.contains("firestore_port = 8080"));
        assert!(toml_str.contains("[[users]]"));

        let parsed: RoleProbeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    // ------------------------------------------------------------------------
    // Loading tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                project_id = "loaded-project"
                [probe]
                collection = "rulesProbe"
            "#,
        )
        .unwrap();

        let config = RoleProbeConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.project_id, "loaded-project");
        assert_eq!(config.probe.collection, "rulesProbe");
    }

    #[test]
    fn test_config_load_missing_file_uses_defaults() {
        let config = RoleProbeConfig::load(Some("/nonexistent/roleprobe.toml")).unwrap();
        assert_eq!(config.probe.collection, "testCollection");
        assert_eq!(config.users.len(), 3);
    }

    #[test]
    fn test_resolve_config_path_explicit() {
        let path = RoleProbeConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = RoleProbeConfig::default_config_path() {
            let s = path.to_string_lossy();
            assert!(s.contains("roleprobe"));
            assert!(s.ends_with("config.toml"));
        }
    }

    // ------------------------------------------------------------------------
    // Emulator host variables
    // ------------------------------------------------------------------------

    #[test]
    fn test_emulator_env_overrides_hosts() {
        let mut config = RoleProbeConfig::default();
        config
            .apply_emulator_env(lookup(&[
                (AUTH_EMULATOR_HOST_VAR, "localhost:9199"),
                (FIRESTORE_EMULATOR_HOST_VAR, "localhost:8181"),
            ]))
            .unwrap();

        let settings = config.to_settings();
        assert_eq!(settings.auth_base_url(), "http://localhost:9199");
        assert_eq!(settings.firestore_base_url(), "http://localhost:8181");
    }

    #[test]
    fn test_emulator_env_host_without_port() {
        let mut config = RoleProbeConfig::default();
        config
            .apply_emulator_env(lookup(&[(FIRESTORE_EMULATOR_HOST_VAR, "firestore")]))
            .unwrap();
        assert_eq!(config.emulator.firestore_host, "firestore");
        assert_eq!(config.emulator.firestore_port, 8080);
    }

    #[test]
    fn test_emulator_env_absent_or_blank() {
        let mut config = RoleProbeConfig::default();
        config
            .apply_emulator_env(lookup(&[(AUTH_EMULATOR_HOST_VAR, "  ")]))
            .unwrap();
        assert_eq!(config, RoleProbeConfig::default());
    }

    #[test]
    fn test_emulator_env_strips_http_scheme() {
        let mut config = RoleProbeConfig::default();
        config
            .apply_emulator_env(lookup(&[
                (AUTH_EMULATOR_HOST_VAR, "http://localhost:9199/"),
                (FIRESTORE_EMULATOR_HOST_VAR, "http://localhost:8080"),
            ]))
            .unwrap();

        let settings = config.to_settings();
        assert_eq!(settings.auth_base_url(), "http://localhost:9199");
        assert_eq!(settings.firestore_base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_emulator_env_rejects_other_schemes_and_paths() {
        for value in ["https://localhost:8080", "localhost:8080/v1", "http://"] {
            let mut config = RoleProbeConfig::default();
            let err = config
                .apply_emulator_env(lookup(&[(FIRESTORE_EMULATOR_HOST_VAR, value)]))
                .unwrap_err();
            assert!(err.to_string().contains("expected host:port"), "{value}");
        }
    }

    #[test]
    fn test_emulator_env_bad_port() {
        let mut config = RoleProbeConfig::default();
        let err = config
            .apply_emulator_env(lookup(&[(FIRESTORE_EMULATOR_HOST_VAR, "localhost:http")]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid port"));
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    #[test]
    fn test_to_settings() {
        let config = RoleProbeConfig {
            project_id: "p".into(),
            probe: ProbeConfig {
                collection: "c".into(),
                mode: ProbeMode::Seeded,
            },
            ..Default::default()
        };
        let settings = config.to_settings();
        assert_eq!(settings.project_id, "p");
        assert_eq!(settings.collection, "c");
        assert_eq!(settings.mode, ProbeMode::Seeded);
        settings.validate().unwrap();
    }

    #[test]
    fn test_config_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoleProbeConfig>();
    }
}
