//! Environment profiles.
//!
//! A profile is a YAML file `env/<name>.yaml` selected by `TEST_ENV`
//! (default `dev`). `${VAR}` references inside the file are expanded from the
//! supplied variables, and the well-known variables below override whatever
//! the file says:
//!
//! | variable       | field          |
//! |----------------|----------------|
//! | `BASE_URL`     | `base_url`     |
//! | `API_BASE_URL` | `api_base_url` |
//! | `API_KEY`      | `api_key`      |
//! | `USERNAME`     | `username`     |
//! | `PASSWORD`     | `password`     |
//!
//! The result is a plain [`Settings`] value assembled once and passed by value
//! into each component; nothing here is global.

use crate::result::{AccesoError, AccesoResult};
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Variable that selects the profile.
pub const PROFILE_VAR: &str = "TEST_ENV";

/// Profile used when `TEST_ENV` is unset.
pub const DEFAULT_PROFILE: &str = "dev";

/// Default web application base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com";

/// Default login for the authenticated-session fixture.
pub const DEFAULT_USERNAME: &str = "testuser@example.com";

/// Default password for the authenticated-session fixture.
pub const DEFAULT_PASSWORD: &str = "TestPassword123!";

/// Default bound for element waits (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Default bound for navigation and redirect waits (10 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 10_000;

/// Login credentials. `Debug` redacts the password.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Username or email
    pub username: String,
    /// Password
    pub password: SecretString,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let password: String = password.into();
        Self {
            username: username.into(),
            password: SecretString::from(password),
        }
    }
}

/// On-disk shape of a profile. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    base_url: Option<String>,
    api_base_url: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    action_timeout_ms: Option<u64>,
    navigation_timeout_ms: Option<u64>,
}

/// Resolved settings for one environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Profile name these settings came from
    pub profile: String,
    /// Web application under test
    pub base_url: String,
    /// REST API under test
    pub api_base_url: String,
    /// Bearer credential for the API
    pub api_key: SecretString,
    /// Default login for the session fixture
    pub username: String,
    /// Default password for the session fixture
    pub password: SecretString,
    /// Bound for element waits
    pub action_timeout_ms: u64,
    /// Bound for navigation and redirect waits
    pub navigation_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: SecretString::from(""),
            username: DEFAULT_USERNAME.to_string(),
            password: SecretString::from(DEFAULT_PASSWORD),
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Directory holding the bundled profiles.
    #[must_use]
    pub fn default_profile_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("env")
    }

    /// Load settings from the process environment and the bundled profiles.
    pub fn from_env() -> AccesoResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::load(&Self::default_profile_dir(), &vars)
    }

    /// Load the profile named by `TEST_ENV` in `vars` from `dir`.
    ///
    /// A missing profile file is an error only when the profile was named
    /// explicitly; the implicit `dev` profile may be absent, in which case
    /// defaults and variable overrides apply.
    pub fn load(dir: &Path, vars: &HashMap<String, String>) -> AccesoResult<Self> {
        let explicit = vars.get(PROFILE_VAR).filter(|p| !p.is_empty());
        let profile = explicit.map_or(DEFAULT_PROFILE, String::as_str);
        validate_profile_name(profile)?;

        let path = dir.join(format!("{profile}.yaml"));
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => parse_profile(&path, &expand_vars(&content, vars))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                ProfileFile::default()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AccesoError::Config {
                    message: format!("profile '{profile}' not found at {}", path.display()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let settings = Self::from_profile(profile, file, vars);
        tracing::debug!(
            profile = %settings.profile,
            base_url = %settings.base_url,
            api_base_url = %settings.api_base_url,
            "loaded environment profile"
        );
        Ok(settings)
    }

    /// Assemble settings from variables alone, ignoring profile files.
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let profile = vars
            .get(PROFILE_VAR)
            .filter(|p| !p.is_empty())
            .map_or(DEFAULT_PROFILE, String::as_str);
        Self::from_profile(profile, ProfileFile::default(), vars)
    }

    fn from_profile(profile: &str, file: ProfileFile, vars: &HashMap<String, String>) -> Self {
        let pick = |var: &str, from_file: Option<String>, default: &str| -> String {
            vars.get(var)
                .cloned()
                .or_else(|| from_file.filter(|v| !has_unresolved_var(v)))
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            profile: profile.to_string(),
            base_url: pick("BASE_URL", file.base_url, DEFAULT_BASE_URL),
            api_base_url: pick("API_BASE_URL", file.api_base_url, DEFAULT_API_BASE_URL),
            api_key: SecretString::from(pick("API_KEY", file.api_key, "")),
            username: pick("USERNAME", file.username, DEFAULT_USERNAME),
            password: SecretString::from(pick("PASSWORD", file.password, DEFAULT_PASSWORD)),
            action_timeout_ms: file.action_timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            navigation_timeout_ms: file
                .navigation_timeout_ms
                .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    /// Default credentials for the session fixture.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

fn validate_profile_name(profile: &str) -> AccesoResult<()> {
    let ok = profile
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AccesoError::Config {
            message: format!("invalid profile name '{profile}'"),
        })
    }
}

fn parse_profile(path: &Path, content: &str) -> AccesoResult<ProfileFile> {
    if content.trim().is_empty() {
        return Ok(ProfileFile::default());
    }
    serde_yaml_ng::from_str(content).map_err(|e| AccesoError::Config {
        message: format!("{}: {e}", path.display()),
    })
}

/// A profile value still holding a `${VAR}` reference counts as unset.
fn has_unresolved_var(value: &str) -> bool {
    value.contains("${")
}

/// Expand `${VAR_NAME}` references; unknown variables are left as written.
fn expand_vars(content: &str, vars: &HashMap<String, String>) -> String {
    // The pattern is a literal; compilation cannot fail.
    let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &regex::Captures<'_>| {
        vars.get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
