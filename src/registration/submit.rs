//! Submission orchestrator: one call to the account-creation service.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::compose::RequestBody;
use super::failure::{ServiceFailure, normalize};
use super::role::RoleSet;
use crate::error::ServiceError;

/// Raw response from the account service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

/// The external account-creation service.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn create_account(&self, body: &RequestBody) -> Result<ServiceReply, ServiceError>;
}

/// What a successful registration hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The user/account object echoed by the service, untouched.
    pub user: Value,
}

impl AccountCreated {
    fn from_body(body: &Value) -> Self {
        let token = |name: &str| {
            body.pointer(&format!("/tokens/{name}"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let user = ["user", "account", "data"]
            .iter()
            .find_map(|key| body.get(*key).filter(|v| v.is_object()))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            access_token: token("access"),
            refresh_token: token("refresh"),
            user,
        }
    }
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SubmissionResult {
    Success(AccountCreated),
    /// One user-facing message.
    Failure(String),
}

/// Where the caller should send the user after a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    /// Customer-only accounts go straight to their landing page.
    SingleRole,
    /// Any merchant or delivery role needs verification first.
    Verification,
}

impl Landing {
    pub fn for_roles(roles: &RoleSet) -> Self {
        if roles.is_customer_only() {
            Self::SingleRole
        } else {
            Self::Verification
        }
    }
}

/// Send `body` once and interpret the reply.
pub async fn submit(service: &dyn AccountService, body: &RequestBody) -> SubmissionResult {
    let reply = match service.create_account(body).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Account service call failed");
            return SubmissionResult::Failure(normalize(&ServiceFailure::from(&e)));
        }
    };

    let failure = match serde_json::from_str::<Value>(&reply.body) {
        Ok(json) if json.get("success").and_then(Value::as_bool) == Some(true) => {
            tracing::info!(status = reply.status, "Account created");
            return SubmissionResult::Success(AccountCreated::from_body(&json));
        }
        Ok(json) => ServiceFailure::from_body(&json),
        Err(_) => ServiceFailure::from_text(&reply.body),
    };

    tracing::info!(
        status = reply.status,
        failure = ?failure,
        "Account service rejected registration"
    );
    SubmissionResult::Failure(normalize(&failure))
}

// ── Production implementation using reqwest ─────────────────────────

/// Account service reached over HTTP.
#[derive(Clone)]
pub struct HttpAccountService {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
}

impl HttpAccountService {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl AccountService for HttpAccountService {
    #[tracing::instrument(skip(self, body), fields(url = %self.url))]
    async fn create_account(&self, body: &RequestBody) -> Result<ServiceReply, ServiceError> {
        let mut req = self.client.post(&self.url).json(body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }

        let response = req
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::InvalidBody {
                status,
                reason: e.to_string(),
            })?;

        tracing::debug!(status, response_len = text.len(), "Account service replied");
        Ok(ServiceReply { status, body: text })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::registration::failure::GENERIC_FAILURE_MESSAGE;
    use crate::registration::role::Role;

    /// Replies with a canned result and records every body it receives.
    struct CannedService {
        reply: Result<ServiceReply, String>,
        calls: Mutex<Vec<RequestBody>>,
    }

    impl CannedService {
        fn json(status: u16, body: Value) -> Self {
            Self {
                reply: Ok(ServiceReply {
                    status,
                    body: body.to_string(),
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                reply: Err(reason.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AccountService for CannedService {
        async fn create_account(&self, body: &RequestBody) -> Result<ServiceReply, ServiceError> {
            self.calls.lock().unwrap().push(body.clone());
            self.reply.clone().map_err(ServiceError::Transport)
        }
    }

    #[tokio::test]
    async fn success_extracts_tokens_and_user() {
        let service = CannedService::json(
            201,
            json!({
                "success": true,
                "tokens": {"access": "abc", "refresh": "def"},
                "user": {"id": 7, "email": "ada@example.com"}
            }),
        );
        let result = submit(&service, &RequestBody::new()).await;
        match result {
            SubmissionResult::Success(created) => {
                assert_eq!(created.access_token.as_deref(), Some("abc"));
                assert_eq!(created.refresh_token.as_deref(), Some("def"));
                assert_eq!(created.user["id"], 7);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(service.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn success_without_tokens_uses_account_object() {
        let service = CannedService::json(200, json!({"success": true, "account": {"id": 1}}));
        let SubmissionResult::Success(created) = submit(&service, &RequestBody::new()).await else {
            panic!("expected success");
        };
        assert!(created.access_token.is_none());
        assert_eq!(created.user, json!({"id": 1}));
    }

    #[tokio::test]
    async fn missing_indicator_is_failure() {
        let service = CannedService::json(200, json!({"user": {"id": 1}}));
        assert_eq!(
            submit(&service, &RequestBody::new()).await,
            SubmissionResult::Failure(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn colon_message_is_verbatim() {
        let service = CannedService::json(400, json!({"message": "phone: already in use"}));
        assert_eq!(
            submit(&service, &RequestBody::new()).await,
            SubmissionResult::Failure("phone: already in use".to_string())
        );
    }

    #[tokio::test]
    async fn transport_failure_is_normalized() {
        let service = CannedService::failing("connection reset by peer");
        assert_eq!(
            submit(&service, &RequestBody::new()).await,
            SubmissionResult::Failure("connection reset by peer".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let service = CannedService {
            reply: Ok(ServiceReply {
                status: 502,
                body: "<html>Bad Gateway</html>".to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        };
        assert_eq!(
            submit(&service, &RequestBody::new()).await,
            SubmissionResult::Failure(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[test]
    fn landing_depends_on_roles() {
        assert_eq!(
            Landing::for_roles(&RoleSet::single(Role::Customer)),
            Landing::SingleRole
        );
        let roles: RoleSet = [Role::Customer, Role::Merchant].into_iter().collect();
        assert_eq!(Landing::for_roles(&roles), Landing::Verification);
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let json = serde_json::to_value(SubmissionResult::Failure("nope".into())).unwrap();
        assert_eq!(json, json!({"status": "failure", "detail": "nope"}));
    }
}
