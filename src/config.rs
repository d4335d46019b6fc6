//! Service configuration, built once at startup and handed to the router.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline::EnrichmentPolicy;
use crate::sources::SourceProfile;

/// Deployment environment; only `development` exposes diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Anything other than "development"/"dev" is treated as production
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    /// The configured name wins; `NODE_ENV` covers deployments that only
    /// set that one
    pub fn resolve(configured: Option<&str>, node_env: Option<&str>) -> Self {
        Self::from_name(configured.or(node_env).unwrap_or("production"))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }

    pub fn include_trace(&self) -> bool {
        *self == Environment::Development
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub environment: Environment,
    pub source: &'static SourceProfile,
    pub source_url: Option<String>,
    pub names_url: Option<String>,
    pub max_browsers: usize,
    pub chrome_path: Option<PathBuf>,
    pub enrichment: EnrichmentPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_name() {
        assert_eq!(Environment::from_name("development"), Environment::Development);
        assert_eq!(Environment::from_name(" DEV "), Environment::Development);
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("staging"), Environment::Production);
        assert_eq!(Environment::from_name(""), Environment::Production);
    }

    #[test]
    fn test_environment_falls_back_to_node_env() {
        assert_eq!(Environment::resolve(None, Some("development")), Environment::Development);
        assert_eq!(
            Environment::resolve(Some("production"), Some("development")),
            Environment::Production
        );
        assert_eq!(Environment::resolve(Some("dev"), None), Environment::Development);
        assert_eq!(Environment::resolve(None, None), Environment::Production);
    }

    #[test]
    fn test_only_development_includes_trace() {
        assert!(Environment::Development.include_trace());
        assert!(!Environment::Production.include_trace());
    }
}
