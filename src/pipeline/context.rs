//! Pass context management.
//!
//! Provides the pass id and start time used for log correlation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one "internet available" pass.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub pass_id: String,
    pub started_at: DateTime<Utc>,
}

impl PassContext {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        let pass_id = format!("pass-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            pass_id,
            started_at,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.pass_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_ids_are_short_and_distinct() {
        let a = PassContext::new(Utc::now());
        let b = PassContext::new(Utc::now());
        assert!(a.pass_id.starts_with("pass-"));
        assert_eq!(a.pass_id.len(), "pass-".len() + 8);
        assert_ne!(a.pass_id, b.pass_id);
        assert_eq!(format!("{}", a.log_context()), format!("[pass={}]", a.pass_id));
    }
}
