use metrics::{describe_counter, Counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, OnceLock};

pub fn friend_requests_sent() -> Counter {
    metrics::counter!("friend_requests_sent")
}

pub fn friend_requests_accepted() -> Counter {
    metrics::counter!("friend_requests_accepted")
}

pub fn friend_requests_rejected() -> Counter {
    metrics::counter!("friend_requests_rejected")
}

pub fn friendships_removed() -> Counter {
    metrics::counter!("friendships_removed")
}

pub fn follows() -> Counter {
    metrics::counter!("follows")
}

pub fn unfollows() -> Counter {
    metrics::counter!("unfollows")
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static SETUP_LOCK: Mutex<()> = Mutex::new(());

/// Installs the global Prometheus recorder. Safe to call more than once; the
/// recorder can only be installed a single time per process, so later calls
/// get the original handle back.
pub fn setup_metrics() -> Result<PrometheusHandle, anyhow::Error> {
    let _guard = SETUP_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    describe_counter!("friend_requests_sent", "Number of friend requests sent");
    describe_counter!(
        "friend_requests_accepted",
        "Number of friend requests accepted"
    );
    describe_counter!(
        "friend_requests_rejected",
        "Number of friend requests rejected"
    );
    describe_counter!("friendships_removed", "Number of friendships removed");
    describe_counter!("follows", "Number of follows");
    describe_counter!("unfollows", "Number of unfollows");

    let prometheus_builder = PrometheusBuilder::new();
    let prometheus_handle = prometheus_builder.install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(prometheus_handle.clone());
    Ok(prometheus_handle)
}
