//! Report dispatch.
//!
//! Sends one access point to the report endpoint. A 401 means the token
//! expired server-side: the token is refreshed and the report retried once.
//! A second 401 is an ordinary failure, so a dispatch never loops.

use crate::api::{access_token_header, ApReport, GridEndpoints, Transport};
use crate::capture::WorkItem;
use crate::enrollment::{TokenManager, Unit};
use crate::logging::structured::LogContext;

/// Result of a single report attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// 401 from the report endpoint.
    AuthRejected,
    /// Any other status or no response at all.
    Failed(String),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            DispatchOutcome::Delivered => "delivered",
            DispatchOutcome::AuthRejected => "auth_rejected",
            DispatchOutcome::Failed(_) => "failed",
        }
    }
}

/// Delivers work items to the report endpoint.
pub struct ReportDispatcher<'a> {
    transport: &'a dyn Transport,
    endpoints: GridEndpoints,
}

impl<'a> ReportDispatcher<'a> {
    pub fn new(transport: &'a dyn Transport, endpoints: GridEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// One POST, classified. Never retries.
    pub fn send_report(&self, token: &str, item: &WorkItem, ctx: &LogContext) -> DispatchOutcome {
        log::info!(
            "{} REPORT_SEND essid={} bssid={}",
            ctx,
            item.essid,
            item.bssid
        );

        let report = ApReport {
            essid: item.essid.clone(),
            bssid: item.bssid.clone(),
        };
        let body = match serde_json::to_value(&report) {
            Ok(body) => body,
            Err(e) => return DispatchOutcome::Failed(e.to_string()),
        };

        let auth = access_token_header(token);
        match self
            .transport
            .post_json(&self.endpoints.report_ap_url(), &body, Some(&auth))
        {
            Ok(response) if response.is_success() => DispatchOutcome::Delivered,
            Ok(response) if response.status == 401 => DispatchOutcome::AuthRejected,
            Ok(response) => DispatchOutcome::Failed(format!(
                "(status {}) {}",
                response.status, response.body
            )),
            Err(e) => DispatchOutcome::Failed(e.to_string()),
        }
    }

    /// Deliver `item`, refreshing `token` at most once on a 401.
    ///
    /// Returns true only if the report endpoint accepted the item. A
    /// refreshed token is written back through `token` for later items.
    pub fn dispatch(
        &self,
        token: &mut String,
        item: &WorkItem,
        unit: Unit<'_>,
        tokens: &mut TokenManager,
        ctx: &LogContext,
    ) -> bool {
        let outcome = match self.send_report(token, item, ctx) {
            DispatchOutcome::AuthRejected => {
                log::warn!("{} REPORT_TOKEN_EXPIRED", ctx);
                match tokens.refresh_token(self.transport, unit, ctx) {
                    Ok(fresh) => {
                        *token = fresh;
                        self.send_report(token, item, ctx)
                    }
                    Err(e) => DispatchOutcome::Failed(format!("token refresh failed: {}", e)),
                }
            }
            outcome => outcome,
        };

        match outcome {
            DispatchOutcome::Delivered => {
                log::info!("{} REPORT_DELIVERED", ctx);
                true
            }
            DispatchOutcome::AuthRejected => {
                log::error!("{} REPORT_FAILED reason=unauthorized_after_refresh", ctx);
                false
            }
            DispatchOutcome::Failed(reason) => {
                log::error!("{} REPORT_FAILED reason={}", ctx, reason);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedTransport;
    use crate::api::{HttpResponse, ENROLL_PATH, REPORT_AP_PATH};
    use crate::clock::SystemClock;
    use crate::identity::Ed25519Identity;
    use crate::session::SessionStats;
    use crate::storage::StatusFile;
    use ed25519_dalek::SigningKey;
    use std::sync::Arc;

    struct Fixture {
        dir: tempfile::TempDir,
        identity: Ed25519Identity,
        session: SessionStats,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                identity: Ed25519Identity::from_signing_key(
                    "alpha",
                    SigningKey::from_bytes(&[5u8; 32]),
                )
                .unwrap(),
                session: SessionStats::default(),
            }
        }

        fn tokens(&self) -> TokenManager {
            TokenManager::new(
                StatusFile::open(self.dir.path().join("auth.json"), Arc::new(SystemClock)),
                GridEndpoints::new("http://grid.test"),
                self.dir.path().join("brain.json"),
            )
        }

        fn unit(&self) -> Unit<'_> {
            Unit {
                identity: &self.identity,
                session: &self.session,
            }
        }
    }

    fn item() -> WorkItem {
        WorkItem::from_network_id("Home_aabbccddeeff")
    }

    fn ctx() -> LogContext {
        LogContext::new("pass-test").with_item("Home_aabbccddeeff")
    }

    #[test]
    fn test_send_report_payload_and_header() {
        let transport = ScriptedTransport::new();
        transport.push(REPORT_AP_PATH, HttpResponse::new(200, "{}"));
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));

        let outcome = dispatcher.send_report("tok", &item(), &ctx());
        assert_eq!(outcome, DispatchOutcome::Delivered);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://grid.test/api/v1/unit/report/ap");
        assert_eq!(calls[0].authorization.as_deref(), Some("access_token tok"));
        assert_eq!(
            calls[0].body,
            serde_json::json!({"essid": "Home", "bssid": "aa:bb:cc:dd:ee:ff"})
        );
    }

    #[test]
    fn test_outcome_classification() {
        let transport = ScriptedTransport::new();
        transport
            .push(REPORT_AP_PATH, HttpResponse::new(401, "expired"))
            .push(REPORT_AP_PATH, HttpResponse::new(500, "boom"))
            .push_error(REPORT_AP_PATH, "connection refused");
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));

        assert_eq!(
            dispatcher.send_report("t", &item(), &ctx()),
            DispatchOutcome::AuthRejected
        );
        assert_eq!(
            dispatcher.send_report("t", &item(), &ctx()).as_str(),
            "failed"
        );
        match dispatcher.send_report("t", &item(), &ctx()) {
            DispatchOutcome::Failed(reason) => assert!(reason.contains("connection refused")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_401_refreshes_and_retries_once() {
        let fx = Fixture::new();
        let transport = ScriptedTransport::new();
        transport
            .push(REPORT_AP_PATH, HttpResponse::new(401, "expired"))
            .push(REPORT_AP_PATH, HttpResponse::new(200, "{}"))
            .push(ENROLL_PATH, HttpResponse::new(200, r#"{"token":"fresh"}"#));
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));
        let mut tokens = fx.tokens();

        let mut token = "stale".to_string();
        assert!(dispatcher.dispatch(&mut token, &item(), fx.unit(), &mut tokens, &ctx()));
        assert_eq!(token, "fresh");

        let reports = transport.calls_to(REPORT_AP_PATH);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].authorization.as_deref(), Some("access_token fresh"));
        assert_eq!(transport.calls_to(ENROLL_PATH).len(), 1);
    }

    #[test]
    fn test_second_401_is_failure() {
        let fx = Fixture::new();
        let transport = ScriptedTransport::new();
        transport
            .always(REPORT_AP_PATH, HttpResponse::new(401, "nope"))
            .always(ENROLL_PATH, HttpResponse::new(200, r#"{"token":"fresh"}"#));
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));
        let mut tokens = fx.tokens();

        let mut token = "stale".to_string();
        assert!(!dispatcher.dispatch(&mut token, &item(), fx.unit(), &mut tokens, &ctx()));
        assert_eq!(transport.calls_to(REPORT_AP_PATH).len(), 2);
        assert_eq!(transport.calls_to(ENROLL_PATH).len(), 1);
    }

    #[test]
    fn test_refresh_failure_is_failure() {
        let fx = Fixture::new();
        let transport = ScriptedTransport::new();
        transport
            .push(REPORT_AP_PATH, HttpResponse::new(401, "expired"))
            .push(ENROLL_PATH, HttpResponse::new(503, "maintenance"));
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));
        let mut tokens = fx.tokens();

        let mut token = "stale".to_string();
        assert!(!dispatcher.dispatch(&mut token, &item(), fx.unit(), &mut tokens, &ctx()));
        assert_eq!(token, "stale");
        assert_eq!(transport.calls_to(REPORT_AP_PATH).len(), 1);
    }

    #[test]
    fn test_server_error_is_not_retried() {
        let fx = Fixture::new();
        let transport = ScriptedTransport::new();
        transport.push(REPORT_AP_PATH, HttpResponse::new(500, "boom"));
        let dispatcher = ReportDispatcher::new(&transport, GridEndpoints::new("http://grid.test"));
        let mut tokens = fx.tokens();

        let mut token = "tok".to_string();
        assert!(!dispatcher.dispatch(&mut token, &item(), fx.unit(), &mut tokens, &ctx()));
        assert_eq!(transport.calls().len(), 1);
    }
}
