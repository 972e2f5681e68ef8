use std::time::Duration;

pub const DEFAULT_SAFETY_DURATION: Duration = Duration::from_secs(60 * 60);

/// Inputs of the retention decision besides the inventory itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// `name:tag` references that are never deleted. Exact match.
    pub exclude: Vec<String>,
    /// Images younger than this are never deleted.
    pub safety_duration: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            safety_duration: DEFAULT_SAFETY_DURATION,
        }
    }
}
