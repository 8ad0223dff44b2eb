use anyhow::{Context, anyhow};
use inkwell_model::{ContentType, FallbackCatalog, RootMargin};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::ConfigError;
use crate::util::{non_blank_var, parse_bool};

/// Path to a TOML or JSON file holding [`LazyImageConfig`].
pub const CONFIG_PATH_VAR: &str = "INKWELL_IMAGES_CONFIG_PATH";
/// Inline JSON holding [`LazyImageConfig`].
pub const CONFIG_JSON_VAR: &str = "INKWELL_IMAGES_CONFIG_JSON";
/// Forces eager loading regardless of the configured mode.
pub const EAGER_OVERRIDE_VAR: &str = "INKWELL_IMAGES_EAGER";

fn default_selectors() -> Vec<String> {
    [
        ".article-img",
        ".author-avatar",
        "#cover-preview",
        "img[data-src]",
        ".post-card-image img",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_container_selectors() -> Vec<String> {
    vec![".post-card-image".into(), ".article-image".into()]
}

fn default_fallback_images() -> BTreeMap<String, String> {
    FallbackCatalog::default_entries()
        .map(|(kind, url)| (kind.to_string(), url.to_string()))
        .collect()
}

/// Source that produced the image loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// How elements are scheduled for loading once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationMode {
    /// Load when the element scrolls within the margin of the viewport.
    #[default]
    Lazy,
    /// Load as soon as the element is registered. Used where no visibility
    /// observation is available.
    Eager,
}

/// Settings for the HTTP image probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpProbeConfig {
    /// Whole-request timeout applied by the HTTP client.
    pub timeout_ms: u64,
    /// Idle keep-alive connections kept per image host.
    pub pool_max_idle_per_host: usize,
    pub user_agent: Option<String>,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            pool_max_idle_per_host: 10,
            user_agent: None,
        }
    }
}

impl HttpProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lazy image loader settings. Every field has a default, so partial files
/// are valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LazyImageConfig {
    /// CSS margin shorthand that grows the viewport before visibility tests.
    /// `"50px"` starts loading slightly before an image scrolls into view.
    pub root_margin: String,
    /// Fraction of the element that must be visible to trigger the load.
    pub threshold: f32,
    /// Selectors for the elements the loader manages.
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,
    /// Ancestors that receive the `loaded` class alongside the image.
    #[serde(default = "default_container_selectors")]
    pub container_selectors: Vec<String>,
    /// Content type to fallback URL. Replaces the built-in table as a whole
    /// when present.
    #[serde(default = "default_fallback_images")]
    pub fallback_images: BTreeMap<String, String>,
    pub mode: ObservationMode,
    /// Give up on a probe after this long and take the fallback path.
    /// Unset means a hung request stays pending.
    pub probe_timeout_ms: Option<u64>,
    pub http: HttpProbeConfig,
}

impl Default for LazyImageConfig {
    fn default() -> Self {
        Self {
            root_margin: "50px".into(),
            threshold: 0.1,
            selectors: default_selectors(),
            container_selectors: default_container_selectors(),
            fallback_images: default_fallback_images(),
            mode: ObservationMode::default(),
            probe_timeout_ms: None,
            http: HttpProbeConfig::default(),
        }
    }
}

impl LazyImageConfig {
    pub fn root_margin(&self) -> Result<RootMargin, ConfigError> {
        Ok(self.root_margin.parse()?)
    }

    pub fn catalog(&self) -> Result<FallbackCatalog, ConfigError> {
        self.fallback_images
            .iter()
            .map(|(kind, url)| {
                if url.trim().is_empty() {
                    return Err(ConfigError::EmptyFallbackUrl(kind.clone()));
                }
                let kind: ContentType = kind.parse()?;
                Ok((kind, url.trim().to_string()))
            })
            .collect()
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.selectors.is_empty() {
            return Err(ConfigError::NoSelectors);
        }
        if self
            .selectors
            .iter()
            .chain(&self.container_selectors)
            .any(|selector| selector.trim().is_empty())
        {
            return Err(ConfigError::BlankSelector);
        }
        if self.http.timeout_ms == 0 {
            return Err(ConfigError::ZeroHttpTimeout);
        }
        self.root_margin()?;
        self.catalog()?;
        Ok(())
    }

    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$INKWELL_IMAGES_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$INKWELL_IMAGES_CONFIG_JSON` (inline JSON),
    /// 3) the first conventional file name that exists,
    /// 4) defaults.
    ///
    /// `$INKWELL_IMAGES_EAGER` then overrides the mode when set.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::load_base()?;

        if let Some(raw) = non_blank_var(EAGER_OVERRIDE_VAR) {
            let eager = parse_bool(&raw).ok_or_else(|| {
                anyhow!("{EAGER_OVERRIDE_VAR} must be a boolean, got `{raw}`")
            })?;
            config.mode = if eager {
                ObservationMode::Eager
            } else {
                ObservationMode::Lazy
            };
        }

        config.validate().with_context(|| {
            format!("invalid image loader config from {source:?}")
        })?;
        Ok((config, source))
    }

    fn load_base() -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = non_blank_var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = non_blank_var(CONFIG_JSON_VAR) {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read image config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid image config {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!("invalid image config {}: {}", path.display(), err)
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // Try TOML first, then JSON for convenience.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse image config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid image config json: {err}"))
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "inkwell.toml",
            "inkwell.json",
            "config/inkwell.toml",
            "config/inkwell.json",
        ];

        CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(|path| path.to_path_buf())
    }
}
