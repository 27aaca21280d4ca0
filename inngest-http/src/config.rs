//! `InngestConfig` — client configuration resolved from explicit
//! builder fields first, then environment variables (§4.5 "Environment
//! variable resolution"), following `layer0::environment`'s
//! `EnvironmentSpec` pattern: a declarative struct assembled once and
//! read thereafter.

use crate::platform::Platform;
use inngest_types::AppId;

/// Whether the SDK is talking to the local dev server or the cloud
/// orchestrator. Determines which authentication rules apply (§4.5
/// "Mode determination").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local dev server: signing key optional, signatures not
    /// strictly enforced.
    Dev,
    /// Cloud orchestrator: a signing key is mandatory.
    Cloud,
}

/// Resolved SDK configuration. Builder fields take precedence over the
/// environment variables enumerated in spec.md §4.5; unset fields fall
/// through to `INNGEST_*`.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct InngestConfig {
    /// This app's id, used to resolve locally-referenced `invoke`
    /// targets into fully-qualified ids.
    pub app_id: Option<AppId>,
    /// Explicit dev-mode override. Highest precedence in mode
    /// resolution.
    pub is_dev: Option<bool>,
    /// `INNGEST_SIGNING_KEY`.
    pub signing_key: Option<String>,
    /// `INNGEST_SIGNING_KEY_FALLBACK`, consulted during key rotation.
    pub signing_key_fallback: Option<String>,
    /// `INNGEST_EVENT_KEY`.
    pub event_key: Option<String>,
    /// `INNGEST_BASE_URL`, the orchestrator's API base.
    pub base_url: Option<String>,
    /// `INNGEST_API_BASE_URL`, overrides `base_url` for registration
    /// calls specifically.
    pub api_base_url: Option<String>,
    /// `INNGEST_EVENT_API_BASE_URL`, overrides `base_url` for event
    /// sends specifically.
    pub event_api_base_url: Option<String>,
    /// `INNGEST_SERVE_ORIGIN` (preferred) / `INNGEST_SERVE_HOST`
    /// (deprecated fallback).
    pub serve_origin: Option<String>,
    /// `INNGEST_SERVE_PATH`.
    pub serve_path: Option<String>,
    /// `INNGEST_ALLOW_IN_BAND_SYNC`.
    pub allow_in_band_sync: bool,
    /// `INNGEST_ENV` — the branch/preview environment name.
    pub env: Option<String>,
    /// `INNGEST_BRANCH`, a deprecated alias for `env`.
    pub branch: Option<String>,
    /// `INNGEST_DEVSERVER_URL`, the local dev server's base URL.
    pub dev_server_url: Option<String>,
}

const DEFAULT_BASE_URL: &str = "https://api.inngest.com";
const DEFAULT_EVENT_API_BASE_URL: &str = "https://inn.gs";

impl InngestConfig {
    /// Start with no builder overrides; every field resolves from the
    /// environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a config purely from `std::env::var`, with no builder
    /// overrides. Most apps call this once at startup.
    pub fn from_env() -> Self {
        Self::new().merged_with_env(&|key| std::env::var(key).ok())
    }

    /// Fill in any unset field from `env`, leaving already-set builder
    /// fields untouched. Exposed separately from [`Self::from_env`] so
    /// tests can inject a fake environment.
    pub fn merged_with_env(mut self, env: &impl Fn(&str) -> Option<String>) -> Self {
        self.is_dev = self.is_dev.or_else(|| env("INNGEST_DEV").map(|v| parse_bool(&v)));
        self.signing_key = self.signing_key.or_else(|| env("INNGEST_SIGNING_KEY"));
        self.signing_key_fallback = self
            .signing_key_fallback
            .or_else(|| env("INNGEST_SIGNING_KEY_FALLBACK"));
        self.event_key = self.event_key.or_else(|| env("INNGEST_EVENT_KEY"));
        self.base_url = self.base_url.or_else(|| env("INNGEST_BASE_URL"));
        self.api_base_url = self.api_base_url.or_else(|| env("INNGEST_API_BASE_URL"));
        self.event_api_base_url = self
            .event_api_base_url
            .or_else(|| env("INNGEST_EVENT_API_BASE_URL"));
        self.serve_origin = self
            .serve_origin
            .or_else(|| env("INNGEST_SERVE_ORIGIN"))
            .or_else(|| env("INNGEST_SERVE_HOST"));
        self.serve_path = self.serve_path.or_else(|| env("INNGEST_SERVE_PATH"));
        if !self.allow_in_band_sync {
            self.allow_in_band_sync = env("INNGEST_ALLOW_IN_BAND_SYNC")
                .map(|v| parse_bool(&v))
                .unwrap_or(false);
        }
        self.env = self.env.or_else(|| env("INNGEST_ENV"));
        self.branch = self.branch.or_else(|| env("INNGEST_BRANCH"));
        self.dev_server_url = self.dev_server_url.or_else(|| env("INNGEST_DEVSERVER_URL"));
        self
    }

    /// Resolve dev-vs-cloud mode per §4.5's precedence: explicit
    /// `is_dev` option, then `INNGEST_DEV` (already folded into
    /// `is_dev` by [`Self::merged_with_env`]), then platform detection.
    /// A recognized hosting platform (Vercel, Netlify, ...) implies
    /// cloud; detecting none of them implies a local machine, so the
    /// SDK assumes dev.
    pub fn mode(&self) -> Mode {
        self.mode_for_platform(self.detect_platform())
    }

    /// The same resolution [`Self::mode`] performs, taking the detected
    /// platform as a parameter so it can be exercised without reading
    /// the real process environment.
    pub fn mode_for_platform(&self, platform: Platform) -> Mode {
        if let Some(is_dev) = self.is_dev {
            return if is_dev { Mode::Dev } else { Mode::Cloud };
        }
        if platform.is_unknown() {
            Mode::Dev
        } else {
            Mode::Cloud
        }
    }

    /// The base URL used for registration/sync calls.
    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    /// The base URL used for event sends.
    pub fn event_api_base_url(&self) -> &str {
        self.event_api_base_url
            .as_deref()
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_EVENT_API_BASE_URL)
    }

    /// Detect the hosting platform from the process environment.
    pub fn detect_platform(&self) -> Platform {
        Platform::detect(&|key| std::env::var(key).ok())
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.trim(), "1" | "true" | "TRUE" | "True")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(map: HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn builder_field_takes_precedence_over_env() {
        let env = env_from(HashMap::from([("INNGEST_SIGNING_KEY", "from-env")]));
        let config = InngestConfig {
            signing_key: Some("from-builder".into()),
            ..Default::default()
        }
        .merged_with_env(&env);
        assert_eq!(config.signing_key.as_deref(), Some("from-builder"));
    }

    #[test]
    fn falls_back_to_env_when_unset() {
        let env = env_from(HashMap::from([("INNGEST_SIGNING_KEY", "from-env")]));
        let config = InngestConfig::new().merged_with_env(&env);
        assert_eq!(config.signing_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn explicit_is_dev_wins_over_everything() {
        let config = InngestConfig {
            is_dev: Some(true),
            ..Default::default()
        };
        assert_eq!(config.mode_for_platform(Platform::Vercel), Mode::Dev);
    }

    #[test]
    fn explicit_is_dev_false_wins_over_unknown_platform() {
        let config = InngestConfig {
            is_dev: Some(false),
            ..Default::default()
        };
        assert_eq!(config.mode_for_platform(Platform::Unknown), Mode::Cloud);
    }

    #[test]
    fn inngest_dev_env_var_sets_dev_mode() {
        let env = env_from(HashMap::from([("INNGEST_DEV", "true")]));
        let config = InngestConfig::new().merged_with_env(&env);
        assert_eq!(config.mode_for_platform(Platform::Vercel), Mode::Dev);
    }

    #[test]
    fn no_platform_detected_defaults_to_dev() {
        let config = InngestConfig::new();
        assert_eq!(config.mode_for_platform(Platform::Unknown), Mode::Dev);
    }

    #[test]
    fn detected_platform_implies_cloud_mode() {
        let config = InngestConfig::new();
        assert_eq!(config.mode_for_platform(Platform::Vercel), Mode::Cloud);
        assert_eq!(config.mode_for_platform(Platform::Node), Mode::Cloud);
    }

    #[test]
    fn serve_origin_falls_back_to_deprecated_serve_host() {
        let env = env_from(HashMap::from([("INNGEST_SERVE_HOST", "https://example.com")]));
        let config = InngestConfig::new().merged_with_env(&env);
        assert_eq!(config.serve_origin.as_deref(), Some("https://example.com"));
    }
}
