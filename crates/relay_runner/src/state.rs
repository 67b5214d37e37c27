use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use rolling_cache::RollingCache;

use crate::poll_runtime::Poller;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) cache: Arc<RollingCache>,
    pub(crate) poller: Arc<Poller>,
    /// `None` when the recorder could not be installed; `/metrics` then renders empty.
    pub(crate) prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub(crate) fn new(poller: Arc<Poller>, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            cache: poller.cache().clone(),
            poller,
            prometheus,
        }
    }
}
