use crate::error::{Result, SdkError};
use std::env;
use std::fs;
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "FLUENTCLOUD_ENDPOINT";
pub const ENV_SUBSCRIPTION_ID: &str = "FLUENTCLOUD_SUBSCRIPTION_ID";
pub const ENV_TOKEN: &str = "FLUENTCLOUD_TOKEN";
pub const ENV_TOKEN_FILE: &str = "FLUENTCLOUD_TOKEN_FILE";
pub const ENV_POLL_INTERVAL_MS: &str = "FLUENTCLOUD_POLL_INTERVAL_MS";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "FLUENTCLOUD_MAX_POLL_ATTEMPTS";
pub const ENV_MAX_RETRIES: &str = "FLUENTCLOUD_MAX_RETRIES";

/// Everything a `ResourceManager` needs to talk to an endpoint.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub endpoint: String,
    pub subscription_id: String,
    pub token: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientSettings {
    pub fn new(endpoint: &str, subscription_id: &str, token: &str) -> Self {
        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.trim().to_string(),
            token: token.trim().to_string(),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 900,
            max_retries: 3,
            retry_delay: Duration::from_millis(800),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Reads settings from the process environment (after loading `.env` if present).
    ///
    /// The token is taken from `FLUENTCLOUD_TOKEN_FILE` first (Docker/K8s secrets),
    /// then from `FLUENTCLOUD_TOKEN`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let endpoint = required_var(ENV_ENDPOINT)?;
        let subscription_id = required_var(ENV_SUBSCRIPTION_ID)?;
        let token = env::var(ENV_TOKEN_FILE)
            .ok()
            .and_then(|path| fs::read_to_string(path).ok())
            .or_else(|| env::var(ENV_TOKEN).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SdkError::Config(format!("{} or {} must be set", ENV_TOKEN_FILE, ENV_TOKEN))
            })?;

        let mut settings = ClientSettings::new(&endpoint, &subscription_id, &token);
        if let Some(ms) = optional_number::<u64>(ENV_POLL_INTERVAL_MS)? {
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = optional_number::<u32>(ENV_MAX_POLL_ATTEMPTS)? {
            settings.max_poll_attempts = n;
        }
        if let Some(n) = optional_number::<u32>(ENV_MAX_RETRIES)? {
            settings.max_retries = n;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(SdkError::Config("endpoint is empty".to_string()));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(SdkError::Config(format!(
                "endpoint must be an http(s) url: {}",
                self.endpoint
            )));
        }
        if self.subscription_id.is_empty() {
            return Err(SdkError::Config("subscription id is empty".to_string()));
        }
        if self.token.is_empty() {
            return Err(SdkError::Config("token is empty".to_string()));
        }
        Ok(())
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SdkError::Config(format!("{} must be set", name)))
}

fn optional_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SdkError::Config(format!("{} is not a number: {}", name, raw))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_inputs() {
        let s = ClientSettings::new(" http://localhost:8080/ ", " sub ", " tok\n");
        assert_eq!(s.endpoint, "http://localhost:8080");
        assert_eq!(s.subscription_id, "sub");
        assert_eq!(s.token, "tok");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ClientSettings::new("localhost", "sub", "tok").validate().is_err());
        assert!(ClientSettings::new("http://x", "", "tok").validate().is_err());
        assert!(ClientSettings::new("http://x", "sub", "  ").validate().is_err());
    }

    // Single test touching the environment so parallel tests don't race on it.
    #[test]
    fn from_env_reads_and_validates() {
        env::remove_var(ENV_TOKEN_FILE);
        env::set_var(ENV_ENDPOINT, "http://127.0.0.1:9/");
        env::set_var(ENV_SUBSCRIPTION_ID, "sub-env");
        env::set_var(ENV_TOKEN, "token-env");
        env::set_var(ENV_POLL_INTERVAL_MS, "25");
        env::set_var(ENV_MAX_POLL_ATTEMPTS, "7");
        env::remove_var(ENV_MAX_RETRIES);

        let s = ClientSettings::from_env().unwrap();
        assert_eq!(s.endpoint, "http://127.0.0.1:9");
        assert_eq!(s.subscription_id, "sub-env");
        assert_eq!(s.token, "token-env");
        assert_eq!(s.poll_interval, Duration::from_millis(25));
        assert_eq!(s.max_poll_attempts, 7);
        assert_eq!(s.max_retries, 3);

        env::set_var(ENV_MAX_RETRIES, "many");
        let err = ClientSettings::from_env().unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));

        env::remove_var(ENV_MAX_RETRIES);
        env::remove_var(ENV_TOKEN);
        let err = ClientSettings::from_env().unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));

        for var in [ENV_ENDPOINT, ENV_SUBSCRIPTION_ID, ENV_POLL_INTERVAL_MS, ENV_MAX_POLL_ATTEMPTS] {
            env::remove_var(var);
        }
    }
}
