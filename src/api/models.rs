//! Wire models for the grid API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionStats;

/// Body of `POST /api/v1/unit/enroll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub identity: String,
    pub public_key: String,
    pub signature: String,
    pub data: EnrollmentData,
}

/// Session statistics plus host details sent with every enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentData {
    #[serde(flatten)]
    pub session: SessionStats,
    pub uname: String,
    pub brain: Value,
}

/// Body of `POST /api/v1/unit/report/ap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApReport {
    pub essid: String,
    pub bssid: String,
}
