//! Log line prefix for pass correlation.
//!
//! Call sites log `"{} EVENT_NAME key=value"` with a `LogContext` as the
//! first argument.

use std::fmt;

/// Logging context for a single pass.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub pass_id: String,
    pub item: Option<String>,
}

impl LogContext {
    pub fn new(pass_id: &str) -> Self {
        Self {
            pass_id: pass_id.to_string(),
            item: None,
        }
    }

    pub fn with_item(&self, item: &str) -> Self {
        Self {
            pass_id: self.pass_id.clone(),
            item: Some(item.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item {
            Some(item) => write!(f, "[pass={}] [item={}]", self.pass_id, item),
            None => write!(f, "[pass={}]", self.pass_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_display() {
        let ctx = LogContext::new("pass-123");
        assert_eq!(format!("{}", ctx), "[pass=pass-123]");

        let ctx_with_item = ctx.with_item("Home_aabbccddeeff");
        assert_eq!(
            format!("{}", ctx_with_item),
            "[pass=pass-123] [item=Home_aabbccddeeff]"
        );
    }

    #[test]
    fn test_with_item_keeps_pass_id() {
        let ctx = LogContext::new("pass-9").with_item("a").with_item("b");
        assert_eq!(ctx.pass_id, "pass-9");
        assert_eq!(ctx.item.as_deref(), Some("b"));
    }
}
