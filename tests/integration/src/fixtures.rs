//! Test data fixtures

use std::sync::atomic::{AtomicU32, Ordering};

static EMAIL_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Unique email per call so tests never collide on the email index
pub fn unique_email(prefix: &str) -> String {
    let n = EMAIL_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}.{n}.{}@classline.test", uuid::Uuid::new_v4().simple())
}
