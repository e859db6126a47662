use std::env;

use chrono::NaiveDate;
use chrono_tz::Tz;
use url::Url;

const DEFAULT_DATA_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub request_timeout_seconds: u64,
    pub data_api_url: Url,
    pub data_api_timeout_seconds: u64,
    pub stats_cache_ttl_seconds: u64,
    pub stats_cache_max_entries: u64,
    pub timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Staydesk API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            trusted_hosts: parse_csv(&env_or("TRUSTED_HOSTS", "localhost,127.0.0.1")),
            rate_limit_enabled: env_parse_bool_or("RATE_LIMIT_ENABLED", true),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            request_timeout_seconds: env_parse_or("REQUEST_TIMEOUT_SECONDS", 30),
            data_api_url: data_api_url_or_default(&env_or("DATA_API_URL", DEFAULT_DATA_API_URL)),
            data_api_timeout_seconds: env_parse_or("DATA_API_TIMEOUT_SECONDS", 10),
            stats_cache_ttl_seconds: env_parse_or("STATS_CACHE_TTL_SECONDS", 20),
            stats_cache_max_entries: env_parse_or("STATS_CACHE_MAX_ENTRIES", 2000),
            timezone: parse_timezone(&env_or("DASHBOARD_TIMEZONE", "UTC")),
        }
    }

    /// Settings for pointing a test server at a mock data store.
    pub fn for_data_api(data_api_url: &str) -> Self {
        Self {
            app_name: "Staydesk API".to_string(),
            environment: "test".to_string(),
            api_prefix: "/v1".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            trusted_hosts: Vec::new(),
            rate_limit_enabled: false,
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
            request_timeout_seconds: 30,
            data_api_url: data_api_url_or_default(data_api_url),
            data_api_timeout_seconds: 5,
            stats_cache_ttl_seconds: 20,
            stats_cache_max_entries: 100,
            timezone: Tz::UTC,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}

/// Base URLs keep a trailing slash so `Url::join` appends instead of replacing
/// the last path segment.
fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut candidate = raw.trim().to_string();
    if !candidate.ends_with('/') {
        candidate.push('/');
    }
    Url::parse(&candidate)
}

fn data_api_url_or_default(raw: &str) -> Url {
    parse_base_url(raw).unwrap_or_else(|error| {
        tracing::warn!(value = %raw, error = %error, "Invalid DATA_API_URL, using default");
        parse_base_url(DEFAULT_DATA_API_URL).expect("valid default data API URL")
    })
}

fn parse_timezone(raw: &str) -> Tz {
    raw.trim().parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(value = %raw, "Unknown DASHBOARD_TIMEZONE, falling back to UTC");
        Tz::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::{data_api_url_or_default, normalize_prefix, parse_base_url, parse_csv, parse_timezone};
    use chrono_tz::Tz;

    #[test]
    fn normalizes_prefix() {
        assert_eq!(normalize_prefix("v1"), "/v1");
        assert_eq!(normalize_prefix("/v1/"), "/v1");
        assert_eq!(normalize_prefix(""), "/v1");
    }

    #[test]
    fn base_url_always_ends_with_slash() {
        let url = parse_base_url("http://store.local:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://store.local:5000/api/");
        assert_eq!(
            url.join("bookings").unwrap().as_str(),
            "http://store.local:5000/api/bookings"
        );
        assert_eq!(
            data_api_url_or_default("not a url").as_str(),
            "http://localhost:5000/"
        );
    }

    #[test]
    fn parses_csv_and_timezones() {
        assert_eq!(parse_csv(" a, ,b "), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(parse_timezone("America/Asuncion"), Tz::America__Asuncion);
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
    }
}
