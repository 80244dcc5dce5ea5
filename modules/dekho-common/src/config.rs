use std::env;
use std::time::Duration;

use ai_client::gateway::DEFAULT_GATEWAY_URL;

pub const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Request auth
    pub anon_key: String,
    pub service_key: String,

    // AI gateway
    pub ai_gateway_url: String,
    pub ai_gateway_key: String,
    pub ai_model: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Site
    pub site_brand: String,
    pub default_title: String,

    // Staleness windows
    pub ad_cache_ttl: Duration,
    pub seo_cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables, reading a `.env` file
    /// first if one exists.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            database_url: required_env("DATABASE_URL"),
            anon_key: required_env("ANON_KEY"),
            service_key: required_env("SERVICE_KEY"),
            ai_gateway_url: env::var("AI_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            ai_gateway_key: required_env("AI_GATEWAY_KEY"),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            site_brand: env::var("SITE_BRAND").unwrap_or_else(|_| "DekhoCampus".to_string()),
            default_title: env::var("DEFAULT_TITLE").unwrap_or_else(|_| {
                "DekhoCampus - Find Colleges, Courses & Exams in India".to_string()
            }),
            ad_cache_ttl: Duration::from_secs(secs_env("AD_CACHE_TTL_SECS", 300)),
            seo_cache_ttl: Duration::from_secs(secs_env("SEO_CACHE_TTL_SECS", 300)),
        }
    }

    /// Config for tests and local tooling. Keys are fixed, no environment is read.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            anon_key: "anon-test-key".to_string(),
            service_key: "service-test-key".to_string(),
            ai_gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            ai_gateway_key: "gateway-test-key".to_string(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            site_brand: "DekhoCampus".to_string(),
            default_title: "DekhoCampus".to_string(),
            ad_cache_ttl: Duration::from_secs(300),
            seo_cache_ttl: Duration::from_secs(300),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn secs_env(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number of seconds")),
        Err(_) => default,
    }
}
