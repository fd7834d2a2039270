use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// Registration of an OpenID Connect provider (discovery based)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OidcRegistration {
    /// Issuer URL, used for `.well-known/openid-configuration` discovery
    pub issuer: String,

    pub client_id: String,

    /// Public clients leave this unset and rely on PKCE alone
    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_oidc_scopes")]
    pub scopes: Vec<String>,
}

/// Registration of a GitHub OAuth App
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GithubRegistration {
    pub client_id: String,

    pub client_secret: String,

    #[serde(default = "default_github_scopes")]
    pub scopes: Vec<String>,
}

/// Provider registration, tagged by flow type
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ProviderRegistration {
    #[serde(rename = "oidc")]
    Oidc(OidcRegistration),
    #[serde(rename = "github")]
    GitHub(GithubRegistration),
}

/// Console client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Host the loopback redirect listener binds to
    #[serde(default = "default_callback_host")]
    pub callback_host: String,

    /// Loopback listener port (0 = ephemeral, allowed for loopback redirects by RFC 8252)
    #[serde(default)]
    pub callback_port: u16,

    /// Upper bound for a single interactive login, browser time included
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,

    /// How long shutdown waits for the login loop to wind down
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_open_browser")]
    pub open_browser: bool,

    #[serde(default)]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Provider registrations keyed by provider name ("Local", "GitHub")
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderRegistration>,

    /// Config file path (runtime metadata, not read from JSON)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_callback_host() -> String {
    "127.0.0.1".to_string()
}

fn default_login_timeout_secs() -> u64 {
    5 * 60
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_open_browser() -> bool {
    true
}

fn default_oidc_scopes() -> Vec<String> {
    ["openid", "profile", "email", "offline_access"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_github_scopes() -> Vec<String> {
    vec!["read:user".to_string()]
}

fn default_providers() -> BTreeMap<String, ProviderRegistration> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "Local".to_string(),
        ProviderRegistration::Oidc(OidcRegistration {
            issuer: "https://localhost:44395/".to_string(),
            client_id: "console".to_string(),
            client_secret: None,
            scopes: default_oidc_scopes(),
        }),
    );
    providers
}

impl Default for Config {
    fn default() -> Self {
        Self {
            callback_host: default_callback_host(),
            callback_port: 0,
            login_timeout_secs: default_login_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            open_browser: default_open_browser(),
            tls_backend: TlsBackend::default(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            providers: default_providers(),
            config_path: None,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // Config file doesn't exist, return default config
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get config file path (if available)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Look up the registration for a provider name
    pub fn provider(&self, name: &str) -> Option<&ProviderRegistration> {
        self.providers.get(name)
    }

    /// Path the loopback listener serves the redirect on for a provider
    pub fn callback_path(provider: &str) -> String {
        format!("/callback/login/{}", provider.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_registers_local_provider() {
        let config = Config::default();
        assert_eq!(config.callback_host, "127.0.0.1");
        assert_eq!(config.callback_port, 0);
        assert_eq!(config.login_timeout_secs, 300);
        assert!(config.open_browser);

        match config.provider("Local") {
            Some(ProviderRegistration::Oidc(registration)) => {
                assert_eq!(registration.issuer, "https://localhost:44395/");
                assert_eq!(registration.client_id, "console");
                assert!(registration.client_secret.is_none());
                assert!(registration.scopes.contains(&"openid".to_string()));
            }
            other => panic!("unexpected registration: {:?}", other),
        }
        assert!(config.provider("GitHub").is_none());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let path = std::env::temp_dir().join("oidc-console-client-missing-config.json");
        let _ = fs::remove_file(&path);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.config_path(), Some(path.as_path()));
        assert!(config.provider("Local").is_some());
    }

    #[test]
    fn test_parse_both_registration_kinds() {
        let json = r#"{
            "callbackPort": 8739,
            "openBrowser": false,
            "tlsBackend": "native-tls",
            "providers": {
                "Local": {
                    "type": "oidc",
                    "issuer": "https://id.example.com/",
                    "clientId": "console",
                    "clientSecret": "secret"
                },
                "GitHub": {
                    "type": "github",
                    "clientId": "gh-client",
                    "clientSecret": "gh-secret"
                }
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.callback_port, 8739);
        assert!(!config.open_browser);
        assert_eq!(config.tls_backend, TlsBackend::NativeTls);
        assert_eq!(config.callback_host, "127.0.0.1");

        match config.provider("Local") {
            Some(ProviderRegistration::Oidc(registration)) => {
                assert_eq!(registration.client_secret.as_deref(), Some("secret"));
                assert_eq!(registration.scopes, default_oidc_scopes());
            }
            other => panic!("unexpected registration: {:?}", other),
        }

        match config.provider("GitHub") {
            Some(ProviderRegistration::GitHub(registration)) => {
                assert_eq!(registration.client_id, "gh-client");
                assert_eq!(registration.scopes, vec!["read:user".to_string()]);
            }
            other => panic!("unexpected registration: {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "oidc-console-client-config-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{"loginTimeoutSecs": 30, "providers": {}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.login_timeout_secs, 30);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_load_invalid_file_names_path() {
        let path = std::env::temp_dir().join(format!(
            "oidc-console-client-broken-{}.json",
            std::process::id()
        ));
        fs::write(&path, "{ not json").unwrap();

        let error = Config::load(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        let message = format!("{:#}", error);
        assert!(message.contains("Failed to parse config file"));
        assert!(message.contains(&path.display().to_string()));
    }

    #[test]
    fn test_callback_path_is_lowercase() {
        assert_eq!(Config::callback_path("GitHub"), "/callback/login/github");
        assert_eq!(Config::callback_path("Local"), "/callback/login/local");
    }
}
