//! Enrollment and token lifecycle.
//!
//! Auth state is the last enrollment response, persisted verbatim. A token
//! younger than 25 minutes is reused without touching the network;
//! otherwise the unit signs its identity and enrolls again.

use std::path::PathBuf;

use serde_json::Value;

use crate::api::{EnrollmentData, EnrollmentRequest, GridEndpoints, Transport};
use crate::error::{GridError, GridResult};
use crate::identity::IdentityProvider;
use crate::logging::structured::LogContext;
use crate::session::{host_info, load_brain, SessionStats};
use crate::storage::StatusFile;

/// Tokens older than this are refreshed before use.
pub const TOKEN_TTL_MINUTES: f64 = 25.0;

/// Who is enrolling: the signing identity and its latest session summary.
#[derive(Clone, Copy)]
pub struct Unit<'a> {
    pub identity: &'a dyn IdentityProvider,
    pub session: &'a SessionStats,
}

/// Owns the auth status file and decides when to enroll.
pub struct TokenManager {
    auth: StatusFile,
    endpoints: GridEndpoints,
    brain_path: PathBuf,
}

impl TokenManager {
    pub fn new(auth: StatusFile, endpoints: GridEndpoints, brain_path: PathBuf) -> Self {
        Self {
            auth,
            endpoints,
            brain_path,
        }
    }

    /// Token currently stored, fresh or not.
    pub fn stored_token(&self) -> Option<String> {
        self.auth
            .data()
            .and_then(|d| d.get("token"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string())
    }

    /// Stored token if it is still inside the freshness window.
    pub fn cached_token(&self) -> Option<String> {
        if self.auth.newer_than_minutes(TOKEN_TTL_MINUTES) {
            self.stored_token()
        } else {
            None
        }
    }

    /// Re-read auth state written by another process.
    pub fn reload(&mut self) {
        self.auth.reload();
    }

    pub fn token_age_minutes(&self) -> Option<f64> {
        self.auth.age_minutes()
    }

    /// Return a usable token, enrolling only if the cached one is stale.
    pub fn get_token(
        &mut self,
        transport: &dyn Transport,
        unit: Unit<'_>,
        ctx: &LogContext,
    ) -> GridResult<String> {
        if let Some(token) = self.cached_token() {
            log::debug!(
                "{} TOKEN_CACHED age_minutes={:.1}",
                ctx,
                self.token_age_minutes().unwrap_or_default()
            );
            return Ok(token);
        }
        self.refresh_token(transport, unit, ctx)
    }

    /// Enroll unconditionally and persist the new auth state.
    pub fn refresh_token(
        &mut self,
        transport: &dyn Transport,
        unit: Unit<'_>,
        ctx: &LogContext,
    ) -> GridResult<String> {
        if self.auth.data().is_none() {
            log::info!("{} ENROLL_START identity={}", ctx, unit.identity.identity());
        } else {
            log::info!("{} TOKEN_REFRESH_START", ctx);
        }

        let request = self.build_request(unit)?;
        let body = serde_json::to_value(&request)?;
        let response = transport.post_json(&self.endpoints.enroll_url(), &body, None)?;

        if !response.is_success() {
            log::error!(
                "{} ENROLL_FAILED status={} body={}",
                ctx,
                response.status,
                response.body
            );
            return Err(GridError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let document = response.json()?;
        let token = document
            .get("token")
            .and_then(Value::as_str)
            .map(|t| t.to_string())
            .ok_or(GridError::MissingToken)?;

        self.auth.write(document)?;
        log::info!("{} ENROLL_COMPLETE", ctx);
        Ok(token)
    }

    fn build_request(&self, unit: Unit<'_>) -> GridResult<EnrollmentRequest> {
        let identity = unit.identity.identity();
        // Signing the identity proves ownership of both name and key.
        let signature = unit.identity.sign(&identity)?;

        Ok(EnrollmentRequest {
            identity,
            public_key: unit.identity.public_key_pem_b64().to_string(),
            signature,
            data: EnrollmentData {
                session: unit.session.clone(),
                uname: host_info(),
                brain: load_brain(&self.brain_path),
            },
        })
    }
}
