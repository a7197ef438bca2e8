//! Live AWS fixtures
//!
//! A [`TestRun`] names every resource one integration test creates. All
//! names share the run id, so a `--filter-name-contains <id>` style filter
//! selects that test's resources and nothing else in the account.

use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Prefix of every resource created by live tests
pub const RESOURCE_PREFIX: &str = "awstbx-it";

/// Region used when the environment names none
pub const FALLBACK_REGION: &str = "us-east-1";

/// S3 bucket names are at most 63 characters.
const MAX_BUCKET_NAME: usize = 63;

/// Region from `AWS_REGION` or `AWS_DEFAULT_REGION`, ignoring blank values.
pub fn live_region() -> Option<String> {
    ["AWS_REGION", "AWS_DEFAULT_REGION"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Names and region for the resources of one live test.
#[derive(Debug, Clone)]
pub struct TestRun {
    id: String,
    region: String,
}

impl TestRun {
    /// A run in [`live_region`], or [`FALLBACK_REGION`].
    pub fn start() -> Self {
        Self::in_region(live_region().unwrap_or_else(|| FALLBACK_REGION.to_string()))
    }

    /// A run in `region`.
    ///
    /// The id is `awstbx-it-<utc seconds>-<pid>-<seq>`: distinct across
    /// concurrent test processes and across runs in the same process.
    pub fn in_region(region: impl Into<String>) -> Self {
        static SEQ: AtomicU32 = AtomicU32::new(0);
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        Self {
            id: format!("{RESOURCE_PREFIX}-{stamp}-{}-{seq}", std::process::id()),
            region: region.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// A DNS-safe bucket name `<id>-<role>`, clipped to S3's length limit.
    ///
    /// ```
    /// use awstbx_test_utils::TestRun;
    ///
    /// let run = TestRun::in_region("eu-west-1");
    /// let bucket = run.bucket("Full");
    /// assert!(bucket.starts_with(run.id()));
    /// assert!(bucket.ends_with("-full"));
    /// ```
    pub fn bucket(&self, role: &str) -> String {
        let mut name: String = format!("{}-{}", self.id, role)
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .take(MAX_BUCKET_NAME)
            .collect();
        while name.ends_with('-') {
            name.pop();
        }
        name
    }

    /// An SSM parameter path `/<id>/<name>`.
    pub fn parameter(&self, name: &str) -> String {
        format!("/{}/{}", self.id, name.trim_start_matches('/'))
    }
}
