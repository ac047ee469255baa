//! Loader for reelwatch configuration with YAML + environment overlays.
//!
//! Every key is optional; an empty configuration reproduces the built-in
//! target page, markers, paste endpoint and deadlines. Precedence, lowest
//! first: built-in defaults, YAML sources (in the order they were added),
//! `REELWATCH__<SECTION>__<KEY>` environment variables. String values may
//! contain `${VAR}` placeholders which are expanded after merging.
//!
//! ```yaml
//! target:
//!   url: https://www.facebook.com/reel/153467177221039/
//!   fetch_timeout_secs: 30
//!   bypass: true
//!   markers:
//!     open: '<meta property="og:description" content="'
//!     close: '" />'
//! report:
//!   endpoint: https://enm3fdguu1gx.x.pipedream.net/
//!   content_type: application/json
//!   deadline_secs: 30
//!   client_timeout_secs: 60
//! logging:
//!   format: text
//!   filter: info
//!   emit_stderr: true
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const ENV_PREFIX: &str = "REELWATCH";
pub const DEFAULT_TARGET_URL: &str = "https://www.facebook.com/reel/153467177221039/";
pub const DEFAULT_REPORT_ENDPOINT: &str = "https://enm3fdguu1gx.x.pipedream.net/";
pub const DEFAULT_OPEN_MARKER: &str = r#"<meta property="og:description" content=""#;
pub const DEFAULT_CLOSE_MARKER: &str = r#"" />"#;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReelwatchConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub version: Option<String>,
    pub target: TargetConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

/// The page we scrape and how we cut the value out of it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub url: String,
    pub fetch_timeout_secs: u64,
    /// Install the browser profile headers used to get past the CDN challenge.
    pub bypass: bool,
    pub markers: MarkerConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub open: String,
    pub close: String,
}

/// Where results and failures are posted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub endpoint: String,
    pub content_type: String,
    /// Deadline for the whole report call.
    pub deadline_secs: u64,
    /// Per-request timeout carried by the upload client.
    pub client_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
    pub emit_stderr: bool,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.into(),
            fetch_timeout_secs: 30,
            bypass: true,
            markers: MarkerConfig::default(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN_MARKER.into(),
            close: DEFAULT_CLOSE_MARKER.into(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_REPORT_ENDPOINT.into(),
            content_type: "application/json".into(),
            deadline_secs: 30,
            client_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".into(),
            emit_stderr: true,
            dir: None,
        }
    }
}

impl TargetConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl ReportConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl ReelwatchConfig {
    /// Reject values that would only fail later, mid-run.
    ///
    /// ```
    /// use reelwatch_config::ReelwatchConfig;
    ///
    /// let mut cfg = ReelwatchConfig::default();
    /// assert!(cfg.validate().is_ok());
    ///
    /// cfg.report.deadline_secs = 0;
    /// assert!(cfg.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("target.url", &self.target.url)?;
        check_url("report.endpoint", &self.report.endpoint)?;

        if self.target.markers.open.is_empty() {
            return Err(invalid("target.markers.open must not be empty"));
        }
        if self.target.markers.close.is_empty() {
            return Err(invalid("target.markers.close must not be empty"));
        }
        if self.report.content_type.trim().is_empty() {
            return Err(invalid("report.content_type must not be empty"));
        }

        for (key, secs) in [
            ("target.fetch_timeout_secs", self.target.fetch_timeout_secs),
            ("report.deadline_secs", self.report.deadline_secs),
            ("report.client_timeout_secs", self.report.client_timeout_secs),
        ] {
            if secs == 0 {
                return Err(invalid(&format!("{key} must be greater than zero")));
            }
        }
        Ok(())
    }
}

fn check_url(key: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid(&format!("{key}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(&format!("{key}: unsupported scheme '{other}'"))),
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Message(format!("invalid configuration: {msg}"))
}

// YAML `version: 1` or `0.1` arrives as a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Subtrees matched literally against page content; `$` there is never a placeholder.
const LITERAL_POINTERS: &[&str] = &["/target/markers"];

fn expand_env_outside_literals(v: &mut Value) {
    let kept: Vec<(&str, Value)> = LITERAL_POINTERS
        .iter()
        .filter_map(|ptr| v.pointer_mut(ptr).map(|slot| (*ptr, slot.take())))
        .collect();
    expand_env_in_value(v);
    for (ptr, literal) in kept {
        if let Some(slot) = v.pointer_mut(ptr) {
            *slot = literal;
        }
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ReelwatchConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Option<Environment>,
}

impl Default for ReelwatchConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ReelwatchConfigLoader {
    /// Start from the built-in defaults plus `REELWATCH__` env overrides.
    ///
    /// ```
    /// use reelwatch_config::{ReelwatchConfigLoader, DEFAULT_TARGET_URL};
    ///
    /// let config = ReelwatchConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.target.url, DEFAULT_TARGET_URL);
    /// assert_eq!(config.report.client_timeout_secs, 60);
    /// ```
    pub fn new() -> Self {
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self {
            builder: Config::builder(),
            env: Some(env),
        }
    }

    /// Skip the environment overlay; only explicit sources are merged.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Attach a config file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a config file that is used only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use reelwatch_config::{LogFormat, ReelwatchConfigLoader};
    ///
    /// let cfg = ReelwatchConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(
    ///         r#"
    /// report:
    ///   endpoint: "http://127.0.0.1:9000/paste"
    /// logging:
    ///   format: json
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.report.endpoint, "http://127.0.0.1:9000/paste");
    /// assert_eq!(cfg.report.content_type, "application/json");
    /// assert_eq!(cfg.logging.format, LogFormat::Json);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge every source, expand `${VAR}` placeholders and validate.
    ///
    /// `target.markers` is taken verbatim: markers are literal page text.
    pub fn load(self) -> Result<ReelwatchConfig, ConfigError> {
        let mut builder = self.builder;
        if let Some(env) = self.env {
            builder = builder.add_source(env);
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_outside_literals(&mut v);

        let typed: ReelwatchConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
