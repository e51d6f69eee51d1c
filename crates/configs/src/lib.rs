use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Settings for the bundled auth service (token, verification code, password policy).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,
    #[serde(default = "default_code_resend")]
    pub code_resend_secs: u64,
    #[serde(default = "default_code_max_attempts")]
    pub code_max_attempts: u32,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
    #[serde(default)]
    pub sign_up_requires_code: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            code_ttl_secs: default_code_ttl(),
            code_resend_secs: default_code_resend(),
            code_max_attempts: default_code_max_attempts(),
            min_password_len: default_min_password_len(),
            sign_up_requires_code: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_token_ttl_hours() -> u64 { 12 }
fn default_code_ttl() -> u64 { 300 }
fn default_code_resend() -> u64 { 60 }
fn default_code_max_attempts() -> u32 { 5 }
fn default_min_password_len() -> usize { 8 }
fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Environment wins over the file: SERVER_HOST, SERVER_PORT, JWT_SECRET, LOG_FORMAT.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.normalize_and_validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port 必须在 1..=65535 范围内"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl AuthSettings {
    fn normalize_and_validate(&mut self) -> Result<()> {
        // 空字符串视为未配置，不签发 token
        if self.jwt_secret.as_deref().map(str::trim).is_some_and(str::is_empty) {
            self.jwt_secret = None;
        }
        if self.token_ttl_hours == 0 || self.code_ttl_secs == 0 {
            return Err(anyhow!("auth.token_ttl_hours 与 auth.code_ttl_secs 必须为正整数"));
        }
        if self.code_max_attempts == 0 {
            return Err(anyhow!("auth.code_max_attempts 必须 >= 1"));
        }
        if self.min_password_len == 0 {
            return Err(anyhow!("auth.min_password_len 必须 >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let mut cfg = parse("").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.auth.min_password_len, 8);
        assert_eq!(cfg.auth.code_ttl_secs, 300);
        assert_eq!(cfg.auth.code_max_attempts, 5);
        assert_eq!(cfg.logging.format, "compact");
    }

    #[test]
    fn file_values_and_env_overrides() {
        let mut cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [auth]
            jwt_secret = "from-file"
            sign_up_requires_code = true
            "#,
        )
        .unwrap();
        cfg.apply_env(|key| match key {
            "SERVER_PORT" => Some("9100".into()),
            "JWT_SECRET" => Some("from-env".into()),
            _ => None,
        });
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.auth.jwt_secret.as_deref(), Some("from-env"));
        assert!(cfg.auth.sign_up_requires_code);
    }

    #[test]
    fn rejects_zero_port_and_zero_ttl() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.code_ttl_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.auth.code_max_attempts = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn blank_secret_is_treated_as_unset() {
        let mut cfg = AppConfig::default();
        cfg.auth.jwt_secret = Some("   ".into());
        cfg.normalize_and_validate().unwrap();
        assert!(cfg.auth.jwt_secret.is_none());
    }
}
