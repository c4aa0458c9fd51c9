//! HTTP date header value management service.
//!
//! This module provides a service for efficiently managing and updating HTTP date header values
//! in a concurrent environment. It updates the date string periodically to avoid repeated
//! date string formatting operations in high-concurrency scenarios.

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::HeaderValue;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// A service that maintains and periodically updates the current HTTP date string.
///
/// When created inside a tokio runtime, a background task refreshes the value
/// every `update_interval`; outside of one the value is formatted on every read.
#[derive(Debug)]
pub struct DateService {
    current: Arc<ArcSwap<Bytes>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

static DATE_SERVICE: Lazy<DateService> = Lazy::new(|| DateService::new_with_update_interval(Duration::from_millis(800)));

fn format_now() -> Bytes {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Bytes::from_owner(buf)
}

impl DateService {
    /// Returns a reference to the global singleton instance of `DateService`.
    pub fn get_global_instance() -> &'static DateService {
        &DATE_SERVICE
    }

    fn new_with_update_interval(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(format_now()));

        let handle = tokio::runtime::Handle::try_current().ok().map(|runtime| {
            let current = Arc::clone(&current);
            runtime.spawn(async move {
                loop {
                    tokio::time::sleep(update_interval).await;
                    current.store(Arc::new(format_now()));
                }
            })
        });

        if handle.is_none() {
            debug!("no tokio runtime, http date will be formatted on every read");
        }

        DateService { current, handle }
    }

    /// The current date, as the value of a `Date` header.
    pub fn http_date(&self) -> Option<HeaderValue> {
        let date = match &self.handle {
            Some(handle) if !handle.is_finished() => self.current.load().as_ref().clone(),
            _ => format_now(),
        };

        HeaderValue::from_maybe_shared(date).map_err(|e| error!(cause = %e, "invalid http date")).ok()
    }
}

/// Stops the background refresh when the `DateService` is dropped.
impl Drop for DateService {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
