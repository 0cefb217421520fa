//! Grid API client.
//!
//! Endpoint layout, wire models and the HTTP transport seam.

pub mod models;
#[cfg(test)]
pub mod testing;
pub mod transport;

pub use models::*;
pub use transport::*;

pub const ENROLL_PATH: &str = "/api/v1/unit/enroll";
pub const REPORT_AP_PATH: &str = "/api/v1/unit/report/ap";

/// Base URL of the grid API, e.g. `https://api.pwnagotchi.ai`.
#[derive(Debug, Clone)]
pub struct GridEndpoints {
    base: String,
}

impl GridEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn enroll_url(&self) -> String {
        format!("{}{}", self.base, ENROLL_PATH)
    }

    pub fn report_ap_url(&self) -> String {
        format!("{}{}", self.base, REPORT_AP_PATH)
    }
}

/// Authorization header value for a grid token.
pub fn access_token_header(token: &str) -> String {
    format!("access_token {}", token)
}
