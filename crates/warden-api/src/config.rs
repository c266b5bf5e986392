//! # Service Configuration
//!
//! Everything the service reads from the environment, validated once at
//! boot. Validation collects every problem before failing so an operator
//! sees the full list in one run:
//!
//! ```text
//! environment validation failed:
//!   - PORT: must be a positive integer
//!   - JWT_ACCESS_SECRET: must be at least 32 characters
//! ```
//!
//! Boolean variables are `true` only for the exact string `"true"`.
//! Empty values are treated as unset.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use warden_auth::{AllowList, PrincipalRegistry, ServiceSecret, DEFAULT_BINDINGS, DEFAULT_TOLERANCE_MS};

/// Minimum accepted length for `JWT_ACCESS_SECRET`.
pub const MIN_JWT_SECRET_LEN: usize = 32;

const DEFAULT_CORS_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE,OPTIONS";
const DEFAULT_CORS_HEADERS: &str = "Content-Type,Accept,Authorization,X-Requested-With";

// ── Sections ────────────────────────────────────────────────────────────────

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub environment: Environment,
    pub name: String,
    pub port: u16,
    /// Route prefix without slashes, e.g. `api`. Empty mounts at the root.
    pub api_prefix: String,
    pub debug: bool,
}

impl AppSettings {
    /// `/{prefix}` or the empty string when no prefix is configured.
    pub fn route_base(&self) -> String {
        if self.api_prefix.is_empty() {
            String::new()
        } else {
            format!("/{}", self.api_prefix)
        }
    }
}

/// Postgres connection settings. Present only when `DATABASE_URL` is set.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_ms: u64,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .finish()
    }
}

/// Which origins CORS admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    /// `*`
    Any,
    /// `true`: reflect the request origin.
    Mirror,
    /// `false`: no cross-origin access.
    Deny,
    List(Vec<String>),
}

impl CorsOrigin {
    fn parse(raw: &str) -> Self {
        match raw {
            "*" => Self::Any,
            "true" => Self::Mirror,
            "false" => Self::Deny,
            list => Self::List(split_csv(list)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsSettings {
    pub enabled: bool,
    pub origin: CorsOrigin,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
    pub max_age_secs: u64,
}

/// Internal-auth gate settings.
#[derive(Debug, Clone)]
pub struct InternalAuthSettings {
    pub registry: Arc<PrincipalRegistry>,
    pub tolerance_ms: u64,
}

/// Fully validated service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub app: AppSettings,
    pub database: Option<DatabaseSettings>,
    pub jwt_access_secret: ServiceSecret,
    pub cors: CorsSettings,
    pub internal_auth: InternalAuthSettings,
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// One failed variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub key: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {}: {}", self.key, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment validation failed:\n{}", render_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

impl ConfigError {
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::Invalid(issues) => issues,
        }
    }
}

fn render_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Loading ─────────────────────────────────────────────────────────────────

struct Reader<F> {
    lookup: F,
    issues: Vec<ConfigIssue>,
}

impl<F: Fn(&str) -> Option<String>> Reader<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| v == "true")
    }

    fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.issues.push(ConfigIssue {
            key: key.to_string(),
            message: message.into(),
        });
    }

    /// Parse a positive integer, recording an issue and returning `default` on failure.
    fn positive<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr + PartialOrd + Default + Copy,
    {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) if v > T::default() => v,
                _ => {
                    self.fail(key, "must be a positive integer");
                    default
                }
            },
        }
    }

    fn non_negative(&mut self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                self.fail(key, "must be a non-negative integer");
                default
            }),
        }
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl ServiceConfig {
    /// Load and validate from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load and validate through an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut r = Reader {
            lookup,
            issues: Vec::new(),
        };

        // App
        let env_var = r
            .get("APP_ENV")
            .map(|raw| ("APP_ENV", raw))
            .or_else(|| r.get("NODE_ENV").map(|raw| ("NODE_ENV", raw)));
        let environment = match env_var {
            None => Environment::default(),
            Some((key, raw)) => raw.parse::<Environment>().unwrap_or_else(|_| {
                r.fail(key, "must be one of development, staging, production, test");
                Environment::default()
            }),
        };
        let app = AppSettings {
            environment,
            name: r.string("APP_NAME", "Warden"),
            port: r.positive("PORT", 3000u16),
            api_prefix: r.string("API_PREFIX", "api").trim_matches('/').to_string(),
            debug: r.flag("DEBUG", false),
        };

        // Database
        let database = r.get("DATABASE_URL").map(|url| DatabaseSettings {
            url,
            max_connections: r.positive("DB_MAX_CONNECTIONS", 100u32),
            connection_timeout_ms: r.positive("DB_CONNECTION_TIMEOUT", 30_000u64),
        });

        // Security
        let jwt_access_secret = match r.get("JWT_ACCESS_SECRET") {
            None => {
                r.fail("JWT_ACCESS_SECRET", "is required");
                ServiceSecret::new("")
            }
            Some(secret) if secret.chars().count() < MIN_JWT_SECRET_LEN => {
                r.fail(
                    "JWT_ACCESS_SECRET",
                    format!("must be at least {MIN_JWT_SECRET_LEN} characters"),
                );
                ServiceSecret::new(secret)
            }
            Some(secret) => ServiceSecret::new(secret),
        };

        // CORS
        let cors = CorsSettings {
            enabled: r.flag("CORS_ENABLED", true),
            origin: CorsOrigin::parse(&r.string("CORS_ORIGIN", "*")),
            methods: split_csv(&r.string("CORS_METHODS", DEFAULT_CORS_METHODS)),
            allowed_headers: split_csv(&r.string("CORS_ALLOWED_HEADERS", DEFAULT_CORS_HEADERS)),
            exposed_headers: split_csv(&r.string("CORS_EXPOSED_HEADERS", "")),
            credentials: r.flag("CORS_CREDENTIALS", true),
            max_age_secs: r.positive("CORS_MAX_AGE", 3600u64),
        };

        // Internal auth
        let allow_list = AllowList::parse(&r.string("INTERNAL_SERVICE_WHITELIST", ""));
        let tolerance_ms = r.non_negative("INTERNAL_AUTH_TOLERANCE_MS", DEFAULT_TOLERANCE_MS);
        let registry = match PrincipalRegistry::from_bindings(DEFAULT_BINDINGS, |k| r.get(k), allow_list) {
            Ok(registry) => registry,
            Err(e) => {
                r.fail("INTERNAL_SERVICE_SECRETS", e.to_string());
                PrincipalRegistry::default()
            }
        };

        if !r.issues.is_empty() {
            return Err(ConfigError::Invalid(r.issues));
        }

        Ok(Self {
            app,
            database,
            jwt_access_secret,
            cors,
            internal_auth: InternalAuthSettings {
                registry: Arc::new(registry),
                tolerance_ms,
            },
        })
    }
}
