use std::env;
use std::str::FromStr;

/// Published location of the trained default-risk model.
const DEFAULT_MODEL_URL: &str =
    "https://storage.googleapis.com/creditdefaulters/final_credit_default_model_rf.onnx";

/// Process configuration, read once at startup. Every value has a default so
/// the service comes up with no environment at all.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_url: String,
    pub threshold: f32,
}

impl AppConfig {
    /// Load configuration from environment variables, after a best-effort
    /// `.env` load.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            host: var_or("HOST", "127.0.0.1"),
            port: var_parse("PORT", 8080),
            workers: var_parse("WORKERS", num_cpus::get()),
            model_url: var_or("MODEL_URL", DEFAULT_MODEL_URL),
            threshold: var_parse("DECISION_THRESHOLD", 0.5),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn var_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
