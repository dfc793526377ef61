//! Mock server settings, read from the environment (`.env` honoured).

pub const ENV_BIND: &str = "FLUENTCLOUD_MOCK_BIND";
pub const ENV_SUBSCRIPTION_ID: &str = "FLUENTCLOUD_MOCK_SUBSCRIPTION_ID";
pub const ENV_TOKEN: &str = "FLUENTCLOUD_MOCK_TOKEN";
pub const ENV_POLLS_TO_COMPLETE: &str = "FLUENTCLOUD_MOCK_POLLS_TO_COMPLETE";
pub const ENV_RETRY_AFTER_SECS: &str = "FLUENTCLOUD_MOCK_RETRY_AFTER_SECS";
pub const ENV_THROTTLE_REQUESTS: &str = "FLUENTCLOUD_MOCK_THROTTLE_REQUESTS";
pub const ENV_PAGE_SIZE: &str = "FLUENTCLOUD_MOCK_PAGE_SIZE";

pub const DEFAULT_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone)]
pub struct MockSettings {
    pub bind_addr: String,
    pub subscription_id: String,
    /// When set, only this bearer token is accepted; otherwise any non-empty token is.
    pub expected_token: Option<String>,
    /// Status reads an operation needs before it completes. 0 makes every call synchronous.
    pub polls_to_complete: u32,
    pub retry_after_secs: u64,
    /// Number of mutating requests answered with 429 before the server behaves.
    pub throttle_requests: u32,
    pub page_size: usize,
}

impl Default for MockSettings {
    fn default() -> Self {
        MockSettings {
            bind_addr: "0.0.0.0:8080".to_string(),
            subscription_id: DEFAULT_SUBSCRIPTION_ID.to_string(),
            expected_token: None,
            polls_to_complete: 2,
            retry_after_secs: 1,
            throttle_requests: 0,
            page_size: 3,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

impl MockSettings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = MockSettings::default();
        MockSettings {
            bind_addr: std::env::var(ENV_BIND).unwrap_or(defaults.bind_addr),
            subscription_id: std::env::var(ENV_SUBSCRIPTION_ID)
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.subscription_id),
            expected_token: std::env::var(ENV_TOKEN)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            polls_to_complete: env_parse(ENV_POLLS_TO_COMPLETE)
                .unwrap_or(defaults.polls_to_complete),
            retry_after_secs: env_parse(ENV_RETRY_AFTER_SECS).unwrap_or(defaults.retry_after_secs),
            throttle_requests: env_parse(ENV_THROTTLE_REQUESTS)
                .unwrap_or(defaults.throttle_requests),
            page_size: env_parse::<usize>(ENV_PAGE_SIZE)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    /// Fast settings for in-process tests: one poll per operation, no wait between polls.
    pub fn for_tests() -> Self {
        MockSettings {
            bind_addr: "127.0.0.1:0".to_string(),
            polls_to_complete: 1,
            retry_after_secs: 0,
            ..MockSettings::default()
        }
    }

    pub fn with_subscription_id(mut self, subscription_id: &str) -> Self {
        self.subscription_id = subscription_id.to_string();
        self
    }

    pub fn with_expected_token(mut self, token: &str) -> Self {
        self.expected_token = Some(token.to_string());
        self
    }

    pub fn with_polls_to_complete(mut self, polls: u32) -> Self {
        self.polls_to_complete = polls;
        self
    }

    pub fn with_throttle_requests(mut self, count: u32) -> Self {
        self.throttle_requests = count;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_complete_on_first_poll() {
        let s = MockSettings::for_tests();
        assert_eq!(s.polls_to_complete, 1);
        assert_eq!(s.retry_after_secs, 0);
        assert_eq!(s.subscription_id, DEFAULT_SUBSCRIPTION_ID);
    }

    #[test]
    fn page_size_never_zero() {
        assert_eq!(MockSettings::for_tests().with_page_size(0).page_size, 1);
    }
}
