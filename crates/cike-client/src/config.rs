//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/cike/config.toml` by default. Every section is optional.
//!
//! ```toml
//! timezone = "Europe/Bratislava"
//!
//! [sources]
//! enabled = ["ITVALLEY", "SOPK", "ICKK"]
//! past_days = 180
//!
//! [sources.amcham]
//! render_command = ["render-page", "--clicks", "{step}", "{url}"]
//!
//! [google]
//! calendar_id = "events@group.calendar.google.com"
//! access_token = "pass::google/cike"
//!
//! [export]
//! path = "/srv/www/cike_events.ics"
//!
//! [categories]
//! SOPK = 11
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use cike_core::SourceTag;
use cike_providers::sources::amcham::RenderSettings;
use cike_providers::{CategoryMap, FetchConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Default publishing time zone.
pub const DEFAULT_TIMEZONE: &str = "Europe/Bratislava";

/// Configuration for the cike client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// IANA time zone events are interpreted and published in.
    pub timezone: String,

    /// Source settings.
    pub sources: SourceSettings,

    /// Google Calendar destination; Mode A runs only when present.
    #[cfg(feature = "google")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleSettings>,

    /// Calendar file destination.
    pub export: ExportSettings,

    /// Category overrides keyed by source tag.
    pub categories: BTreeMap<String, u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            sources: SourceSettings::default(),
            #[cfg(feature = "google")]
            google: None,
            export: ExportSettings::default(),
            categories: BTreeMap::new(),
        }
    }
}

/// Settings shared by all sources, plus per-site sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Tags of the sources to run. Order does not matter.
    pub enabled: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Attempts per request, including the first.
    pub retries: u32,

    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// How many days back past listings are kept, at most
    /// [`MAX_PAST_DAYS`](Self::MAX_PAST_DAYS).
    pub past_days: u32,

    /// User-Agent sent to the sites.
    pub user_agent: String,

    pub itvalley: ItValleySettings,
    pub sopk: SopkSettings,
    pub amcham: AmChamSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: SourceTag::INVOCATION_ORDER
                .iter()
                .map(|tag| tag.as_str().to_string())
                .collect(),
            timeout_secs: 20,
            retries: 3,
            retry_delay_ms: 1000,
            past_days: 365,
            user_agent: cike_providers::http::DEFAULT_USER_AGENT.to_string(),
            itvalley: ItValleySettings::default(),
            sopk: SopkSettings::default(),
            amcham: AmChamSettings::default(),
        }
    }
}

impl SourceSettings {
    /// Largest accepted `past_days`, a century.
    pub const MAX_PAST_DAYS: u32 = 36_500;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItValleySettings {
    /// Listing pages walked at most.
    pub max_pages: usize,
}

impl Default for ItValleySettings {
    fn default() -> Self {
        Self { max_pages: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SopkSettings {
    /// Pages of upcoming events.
    pub future_pages: usize,

    /// Pages of the archive.
    pub past_pages: usize,

    /// The site serves an incomplete certificate chain.
    pub allow_insecure_tls: bool,
}

impl Default for SopkSettings {
    fn default() -> Self {
        Self {
            future_pages: 3,
            past_pages: 7,
            allow_insecure_tls: true,
        }
    }
}

/// The AmCham listing loads more items by script, so it is read through an
/// external renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmChamSettings {
    /// Renderer argv; `{url}` and `{step}` are substituted. Unset skips the
    /// source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_command: Option<Vec<String>>,

    /// Timeout of one render in seconds.
    pub render_timeout_secs: u64,

    /// Renders at most.
    pub max_steps: usize,

    /// Renders without new items before giving up. At least 1.
    pub max_stalls: usize,
}

impl Default for AmChamSettings {
    fn default() -> Self {
        Self {
            render_command: None,
            render_timeout_secs: 60,
            max_steps: 60,
            max_stalls: 3,
        }
    }
}

impl AmChamSettings {
    /// Renderer settings, if a command is configured.
    pub fn render_settings(&self) -> Option<RenderSettings> {
        self.render_command.as_ref().map(|command| RenderSettings {
            command: command.clone(),
            timeout: Duration::from_secs(self.render_timeout_secs),
            max_steps: self.max_steps,
            max_stalls: self.max_stalls,
        })
    }
}

/// Calendar file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// File rewritten on every run.
    pub path: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cike_events.ics"),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cike")
    }

    /// The configured time zone.
    pub fn timezone(&self) -> Result<Tz, String> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| format!("unknown time zone `{}`", self.timezone))
    }

    /// Enabled sources in invocation order.
    ///
    /// The order is fixed because it decides which source wins a duplicate;
    /// the `enabled` list only switches sources on and off.
    pub fn enabled_sources(&self) -> Result<Vec<SourceTag>, String> {
        let mut enabled = Vec::new();
        for name in &self.sources.enabled {
            enabled.push(scraped_tag(name)?);
        }
        Ok(SourceTag::INVOCATION_ORDER
            .into_iter()
            .filter(|tag| enabled.contains(tag))
            .collect())
    }

    /// Fetcher settings shared by the HTML sources.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.sources.timeout_secs),
            user_agent: self.sources.user_agent.clone(),
            allow_insecure_tls: false,
            retry: RetryPolicy::new(
                self.sources.retries,
                Duration::from_millis(self.sources.retry_delay_ms),
            ),
        }
    }

    /// Default categories with the configured overrides applied.
    pub fn category_map(&self) -> Result<CategoryMap, String> {
        let mut map = CategoryMap::default();
        for (name, category) in &self.categories {
            map = map.with_category(known_tag(name)?, *category);
        }
        Ok(map)
    }

    /// Checks everything that can be checked without network access.
    pub fn validate(&self) -> Result<(), String> {
        self.timezone()?;
        self.enabled_sources()?;
        self.category_map()?;
        if self.sources.timeout_secs == 0 {
            return Err("sources.timeout_secs must be positive".to_string());
        }
        if self.sources.past_days > SourceSettings::MAX_PAST_DAYS {
            return Err(format!(
                "sources.past_days must be at most {}",
                SourceSettings::MAX_PAST_DAYS
            ));
        }
        if self.sources.amcham.max_steps == 0 || self.sources.amcham.max_stalls == 0 {
            return Err("sources.amcham.max_steps and max_stalls must be positive".to_string());
        }
        if self.sources.user_agent.trim().is_empty() {
            return Err("sources.user_agent must not be empty".to_string());
        }
        if let Some(command) = &self.sources.amcham.render_command {
            if command.first().is_none_or(|program| program.trim().is_empty()) {
                return Err("sources.amcham.render_command must name a program".to_string());
            }
        }
        if self.export.path.as_os_str().is_empty() {
            return Err("export.path must not be empty".to_string());
        }
        #[cfg(feature = "google")]
        if let Some(google) = &self.google {
            google.validate()?;
        }
        Ok(())
    }
}

/// Parses a tag that names a scraped source.
fn scraped_tag(name: &str) -> Result<SourceTag, String> {
    match known_tag(name)? {
        SourceTag::Other => Err(format!("`{}` is not a source", name)),
        tag => Ok(tag),
    }
}

/// Parses a tag, rejecting spellings that would silently fall back to
/// `OTHER`.
fn known_tag(name: &str) -> Result<SourceTag, String> {
    let tag = SourceTag::from_tag(name);
    if tag == SourceTag::Other && !name.trim().eq_ignore_ascii_case(SourceTag::Other.as_str()) {
        return Err(format!("unknown source tag `{}`", name));
    }
    Ok(tag)
}

// ---------------------------------------------------------------------------
// GoogleSettings
// ---------------------------------------------------------------------------

/// Google Calendar destination settings.
///
/// `access_token` supports secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Calendar to manage.
    pub calendar_id: String,

    /// Bearer token with write access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Entries starting before this date are never listed.
    pub since: chrono::NaiveDate,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Listing page size.
    pub max_results: usize,
}

#[cfg(feature = "google")]
impl Default for GoogleSettings {
    fn default() -> Self {
        let defaults = cike_providers::google::GoogleConfig::new("primary", "");
        Self {
            calendar_id: defaults.calendar_id,
            access_token: None,
            since: defaults.since,
            timeout_secs: defaults.timeout.as_secs(),
            max_results: defaults.max_results,
        }
    }
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Checks the settings without resolving the token.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(format!(
                "google.access_token is missing. Add to {}:\n  \
                 [google]\n  \
                 access_token = \"env::CIKE_GOOGLE_TOKEN\"",
                ClientConfig::default_path().display()
            ));
        }
        self.provider_config(String::from("unresolved"), chrono_tz::UTC, RetryPolicy::default())
            .validate()
    }

    /// Converts to provider configuration, resolving the token reference.
    ///
    /// `retry` is the policy of the `[sources]` section; Google listing and
    /// deletion share it with the page fetches.
    pub fn to_provider_config(
        &self,
        timezone: Tz,
        retry: RetryPolicy,
    ) -> Result<cike_providers::google::GoogleConfig, String> {
        let raw = self
            .access_token
            .as_deref()
            .ok_or_else(|| "google.access_token is missing".to_string())?;
        let token = crate::secret::resolve(raw)
            .map_err(|e| format!("failed to resolve access_token: {}", e))?;
        let config = self.provider_config(token, timezone, retry);
        config.validate()?;
        Ok(config)
    }

    fn provider_config(
        &self,
        token: String,
        timezone: Tz,
        retry: RetryPolicy,
    ) -> cike_providers::google::GoogleConfig {
        cike_providers::google::GoogleConfig::new(self.calendar_id.clone(), token)
            .with_since(self.since)
            .with_timezone(timezone)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_results(self.max_results)
            .with_retry(retry)
    }
}
