use crate::config::MockSettings;
use crate::store::Store;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub struct AppState {
    pub settings: MockSettings,
    pub store: Store,
    throttled: AtomicU32,
}

impl AppState {
    pub fn new(settings: MockSettings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            store: Store::new(),
            throttled: AtomicU32::new(0),
        })
    }

    /// True for the first `throttle_requests` mutating requests.
    pub fn should_throttle(&self) -> bool {
        let limit = self.settings.throttle_requests;
        self.throttled
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .is_ok()
    }
}
