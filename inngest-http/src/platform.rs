//! Hosting platform auto-detection, for the `X-Inngest-Platform`
//! response header and streaming-capability checks (§4.5).

use serde::{Deserialize, Serialize};

/// A hosting platform the SDK can detect from its environment. Each
/// variant's [`Platform::supports_streaming`] answer mirrors the
/// source SDK's capability table (Vercel Edge = yes, everything else
/// here = no, since this crate only ships one adapter — see
/// [`crate::axum_handler`]).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Vercel (detected via `VERCEL_ENV`/`VERCEL`).
    Vercel,
    /// Netlify (detected via `NETLIFY`).
    Netlify,
    /// Cloudflare Pages (detected via `CF_PAGES`).
    CloudflarePages,
    /// Render.com (detected via `RENDER`).
    Render,
    /// Railway (detected via `RAILWAY_ENVIRONMENT`).
    Railway,
    /// Deno Deploy (detected via `DENO_DEPLOYMENT_ID`).
    Deno,
    /// A plain Node.js production process (detected via
    /// `NODE_ENV=production`) with no more specific host signal.
    Node,
    /// No known platform detected.
    Unknown,
}

impl Platform {
    /// Detect the hosting platform from the process environment.
    pub fn detect(env: &impl Fn(&str) -> Option<String>) -> Self {
        if env("VERCEL_ENV").is_some() || env("VERCEL").is_some() {
            Self::Vercel
        } else if env("NETLIFY").is_some() || env("CONTEXT").is_some() {
            Self::Netlify
        } else if env("CF_PAGES").is_some() {
            Self::CloudflarePages
        } else if env("RENDER").is_some() {
            Self::Render
        } else if env("RAILWAY_ENVIRONMENT").is_some() {
            Self::Railway
        } else if env("DENO_DEPLOYMENT_ID").is_some() {
            Self::Deno
        } else if env("NODE_ENV").as_deref() == Some("production") {
            Self::Node
        } else {
            Self::Unknown
        }
    }

    /// Whether no hosting platform was detected — the signal
    /// [`InngestConfig::mode`](crate::config::InngestConfig::mode) reads
    /// as "probably a local machine" when deciding dev vs. cloud (§4.5).
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether this axum-based adapter can stream responses on this
    /// platform. The one shim this crate ships (axum, plain
    /// request/response) never streams, regardless of platform — only
    /// an edge-runtime adapter (out of scope here, §1) would answer
    /// `true` for Vercel Edge.
    pub fn supports_streaming(&self) -> bool {
        false
    }

    /// The string this platform reports on `X-Inngest-Platform`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vercel => "vercel",
            Self::Netlify => "netlify",
            Self::CloudflarePages => "cloudflare-pages",
            Self::Render => "render",
            Self::Railway => "railway",
            Self::Deno => "deno",
            Self::Node => "node",
            Self::Unknown => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(map: HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn detects_vercel() {
        let env = env_from(HashMap::from([("VERCEL_ENV", "production")]));
        assert_eq!(Platform::detect(&env), Platform::Vercel);
    }

    #[test]
    fn detects_railway() {
        let env = env_from(HashMap::from([("RAILWAY_ENVIRONMENT", "production")]));
        assert_eq!(Platform::detect(&env), Platform::Railway);
    }

    #[test]
    fn detects_netlify_via_context() {
        let env = env_from(HashMap::from([("CONTEXT", "production")]));
        assert_eq!(Platform::detect(&env), Platform::Netlify);
    }

    #[test]
    fn detects_deno_deploy() {
        let env = env_from(HashMap::from([("DENO_DEPLOYMENT_ID", "abc123")]));
        assert_eq!(Platform::detect(&env), Platform::Deno);
    }

    #[test]
    fn detects_node_production() {
        let env = env_from(HashMap::from([("NODE_ENV", "production")]));
        assert_eq!(Platform::detect(&env), Platform::Node);
    }

    #[test]
    fn node_env_development_does_not_imply_a_platform() {
        let env = env_from(HashMap::from([("NODE_ENV", "development")]));
        assert_eq!(Platform::detect(&env), Platform::Unknown);
    }

    #[test]
    fn falls_back_to_unknown() {
        let env = env_from(HashMap::new());
        assert_eq!(Platform::detect(&env), Platform::Unknown);
        assert!(Platform::detect(&env).is_unknown());
    }

    #[test]
    fn no_platform_streams() {
        assert!(!Platform::Vercel.supports_streaming());
        assert!(!Platform::Unknown.supports_streaming());
    }
}
