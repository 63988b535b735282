use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::assignments::store::AssignmentStore;
use crate::services::notifications::Notifier;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn AssignmentStore>,
    redis: RedisHandle,
    notifier: Notifier,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn AssignmentStore>,
        redis: RedisHandle,
        notifier: Notifier,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, redis, notifier }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn AssignmentStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
