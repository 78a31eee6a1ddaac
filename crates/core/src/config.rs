use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SURVEY_GATEWAY__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub surveys: SurveysConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Variant lists per family plus the on-disk content locations.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveysConfig {
    #[serde(default = "default_feedback_variants")]
    pub feedback: Vec<String>,
    #[serde(default = "default_poll_variants")]
    pub poll: Vec<String>,
    #[serde(default = "default_employee_variants")]
    pub employee: Vec<String>,
    /// Directory holding `{survey_name}/{lang}.json` definition files.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Directory holding the SPA shell and other static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    /// Cookie lifetime; also the sticky-assignment window.
    #[serde(default = "default_cookie_max_age_secs")]
    pub max_age_secs: u64,
    /// Base64-encoded HMAC key. Takes precedence over `secret_file`.
    #[serde(default)]
    pub secret: Option<String>,
    /// Path to a file holding the base64-encoded HMAC key.
    #[serde(default)]
    pub secret_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

// Default functions
fn default_service_name() -> String {
    "survey-gateway".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    3000
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_feedback_variants() -> Vec<String> {
    vec![
        "customer-feedback-a".to_string(),
        "customer-feedback-b".to_string(),
    ]
}
fn default_poll_variants() -> Vec<String> {
    vec![
        "new-feature-poll-a".to_string(),
        "new-feature-poll-b".to_string(),
    ]
}
fn default_employee_variants() -> Vec<String> {
    vec![
        "employee-satisfaction-a".to_string(),
        "employee-satisfaction-b".to_string(),
    ]
}
fn default_content_dir() -> String {
    "content/surveys".to_string()
}
fn default_static_dir() -> String {
    "public".to_string()
}
fn default_cookie_max_age_secs() -> u64 {
    900
}
fn default_db_path() -> String {
    "survey-gateway.db".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for SurveysConfig {
    fn default() -> Self {
        Self {
            feedback: default_feedback_variants(),
            poll: default_poll_variants(),
            employee: default_employee_variants(),
            content_dir: default_content_dir(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_cookie_max_age_secs(),
            secret: None,
            secret_file: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            surveys: SurveysConfig::default(),
            cookie: CookieConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SURVEY_GATEWAY")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
