//! RegistrationManager owns one registration attempt: answers, roles,
//! position, submission state, and saving all of it on every change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::compose::compose;
use super::draft::{DraftField, RegistrationDraft};
use super::image::{ImageCategory, ImageHost};
use super::role::{Role, RoleSet};
use super::step::{self, Advance, Direction, Retreat, Step, WorkflowPosition};
use super::submit::{AccountService, Landing, SubmissionResult, submit};
use super::validate::{Advisory, Rejection, advisories, validate, validate_through};
use crate::error::{Error, ImageHostError, WorkflowError};
use crate::store::{DraftStore, draft_keys};

/// Whether a submission is running, finished, or neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Done,
}

/// Result of asking to move forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Moved {
        position: WorkflowPosition,
    },
    /// The terminal step was left by submitting. `landing` is set only on
    /// success.
    Submitted {
        result: SubmissionResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        landing: Option<Landing>,
    },
}

/// Result of asking to move back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetreatOutcome {
    Moved { position: WorkflowPosition },
    /// Leave the workflow for the external role-selection surface.
    ExitToRoleSelection,
}

/// Read-only view of the attempt for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub attempt_id: Uuid,
    pub position: WorkflowPosition,
    pub step: Option<Step>,
    pub roles: RoleSet,
    pub preselected_role: Option<Role>,
    pub submission: SubmissionState,
    /// Passwords blanked.
    pub draft: RegistrationDraft,
    pub advisories: Vec<String>,
}

/// What is written under [`draft_keys::DRAFT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDraft {
    roles: RoleSet,
    draft: RegistrationDraft,
    saved_at: DateTime<Utc>,
}

struct WorkflowState {
    draft: RegistrationDraft,
    roles: RoleSet,
    position: WorkflowPosition,
    submission: SubmissionState,
}

impl WorkflowState {
    fn fresh(preselected: Option<Role>) -> Self {
        let roles = preselected.map(RoleSet::single).unwrap_or_default();
        let position = WorkflowPosition::start(&roles, preselected.is_some());
        Self {
            draft: RegistrationDraft::default(),
            roles,
            position,
            submission: SubmissionState::Idle,
        }
    }

    /// Refuse anything while a submission is running or after it succeeded.
    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        match self.submission {
            SubmissionState::Idle => Ok(()),
            SubmissionState::Submitting => Err(WorkflowError::SubmissionInFlight),
            SubmissionState::Done => Err(WorkflowError::AlreadySubmitted),
        }
    }

    fn persisted(&self) -> Option<(String, String)> {
        let record = PersistedDraft {
            roles: self.roles.clone(),
            draft: self.draft.clone(),
            saved_at: Utc::now(),
        };
        match serde_json::to_string(&record) {
            Ok(json) => Some((json, self.position.step_index.to_string())),
            Err(e) => {
                tracing::warn!("Failed to serialize registration draft: {}", e);
                None
            }
        }
    }
}

/// Owns one registration attempt from first screen to submission.
pub struct RegistrationManager {
    attempt_id: Uuid,
    preselected: Option<Role>,
    store: Arc<dyn DraftStore>,
    service: Arc<dyn AccountService>,
    images: Option<Arc<dyn ImageHost>>,
    state: RwLock<WorkflowState>,
}

impl RegistrationManager {
    /// Start an attempt, resuming whatever the store holds.
    ///
    /// A missing or unreadable draft starts fresh. A pre-selected role is
    /// always part of the role set and the flow never sits on role
    /// selection.
    pub async fn start(
        store: Arc<dyn DraftStore>,
        service: Arc<dyn AccountService>,
        preselected: Option<Role>,
    ) -> Self {
        let state = Self::resume(store.as_ref(), preselected).await;
        let attempt_id = Uuid::new_v4();
        tracing::info!(
            attempt = %attempt_id,
            step = state.position.step_index,
            preselected = ?preselected,
            "Registration started"
        );
        Self {
            attempt_id,
            preselected,
            store,
            service,
            images: None,
            state: RwLock::new(state),
        }
    }

    pub fn with_image_host(mut self, images: Arc<dyn ImageHost>) -> Self {
        self.images = Some(images);
        self
    }

    async fn resume(store: &dyn DraftStore, preselected: Option<Role>) -> WorkflowState {
        let saved = match store.get(draft_keys::DRAFT).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Failed to load registration draft: {}", e);
                None
            }
        };
        let Some(raw) = saved else {
            return WorkflowState::fresh(preselected);
        };
        let record: PersistedDraft = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding unreadable registration draft: {}", e);
                return WorkflowState::fresh(preselected);
            }
        };

        let step_index = match store.get(draft_keys::STEP).await {
            Ok(Some(s)) => s.trim().parse::<usize>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Failed to load registration step: {}", e);
                0
            }
        };

        let mut roles = record.roles;
        if let Some(role) = preselected.filter(|r| !roles.contains(*r)) {
            roles.toggle(role);
        }

        let floor = if preselected.is_some() { 1 } else { 0 };
        // Without roles only role selection makes sense.
        let step_index = if roles.is_empty() { floor } else { step_index.max(floor) };
        let position = step::reclamp(
            WorkflowPosition {
                step_index,
                ..WorkflowPosition::start(&roles, preselected.is_some())
            },
            &roles,
        );

        tracing::info!(
            step = position.step_index,
            saved_at = %record.saved_at,
            "Resuming saved registration draft"
        );
        WorkflowState {
            draft: record.draft,
            roles,
            position,
            submission: SubmissionState::Idle,
        }
    }

    pub fn has_preselected_role(&self) -> bool {
        self.preselected.is_some()
    }

    pub async fn position(&self) -> WorkflowPosition {
        self.state.read().await.position
    }

    pub async fn submission_state(&self) -> SubmissionState {
        self.state.read().await.submission
    }

    pub async fn roles(&self) -> RoleSet {
        self.state.read().await.roles.clone()
    }

    /// Full draft, passwords included.
    pub async fn draft(&self) -> RegistrationDraft {
        self.state.read().await.draft.clone()
    }

    pub async fn status(&self) -> RegistrationStatus {
        let state = self.state.read().await;
        RegistrationStatus {
            attempt_id: self.attempt_id,
            position: state.position,
            step: state.position.step(),
            roles: state.roles.clone(),
            preselected_role: self.preselected,
            submission: state.submission,
            draft: state.draft.redacted(),
            advisories: advisories(&state.draft, &state.roles)
                .iter()
                .map(Advisory::to_string)
                .collect(),
        }
    }

    /// Flip a role on or off. The step count and current step follow.
    ///
    /// Past role selection the set may not become empty.
    pub async fn toggle_role(&self, role: Role) -> Result<RoleSet, WorkflowError> {
        let (roles, saved) = {
            let mut state = self.state.write().await;
            state.ensure_idle()?;
            let selected = state.roles.toggle(role);
            if state.roles.is_empty() && state.position.step_index > 0 {
                state.roles.toggle(role);
                return Err(Rejection::NoRoleSelected.into());
            }
            state.position = step::reclamp(state.position, &state.roles);
            tracing::debug!(%role, selected, total_steps = state.position.total_steps, "Role toggled");
            (state.roles.clone(), state.persisted())
        };
        self.save(saved).await;
        Ok(roles)
    }

    pub async fn set_field(
        &self,
        field: DraftField,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let saved = {
            let mut state = self.state.write().await;
            state.ensure_idle()?;
            state.draft.set(field, value);
            state.persisted()
        };
        self.save(saved).await;
        Ok(())
    }

    /// Upload an image and store its URL in the matching draft field.
    pub async fn attach_image(
        &self,
        category: ImageCategory,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<String, Error> {
        let images = self.images.as_ref().ok_or(ImageHostError::NotConfigured)?;
        self.state.read().await.ensure_idle()?;
        let url = images.upload(bytes, file_name, category).await?;
        self.set_field(category.field(), url.clone()).await?;
        Ok(url)
    }

    /// Validate the current step and move forward, or submit from the
    /// terminal step.
    ///
    /// A rejection leaves the position untouched. Before submitting, every
    /// earlier step is checked again; if one no longer passes the position
    /// moves back to it. While the submission is in flight every other
    /// transition is refused.
    pub async fn advance(&self) -> Result<AdvanceOutcome, WorkflowError> {
        let (body, roles) = {
            let mut state = self.state.write().await;
            state.ensure_idle()?;

            if let Err(rejection) = validate(state.position.step_index, &state.draft, &state.roles)
            {
                tracing::info!(
                    attempt = %self.attempt_id,
                    step = state.position.step_index,
                    reason = %rejection,
                    "Step rejected"
                );
                return Err(rejection.into());
            }
            for note in advisories(&state.draft, &state.roles) {
                tracing::debug!(step = state.position.step_index, advisory = %note, "Advisory");
            }

            match step::advance(state.position, &state.roles) {
                Advance::Moved(next) => {
                    state.position = next;
                    let saved = state.persisted();
                    drop(state);
                    self.save(saved).await;
                    tracing::info!(attempt = %self.attempt_id, step = next.step_index, "Advanced");
                    return Ok(AdvanceOutcome::Moved { position: next });
                }
                Advance::Terminal(at) => {
                    if let Err((step_index, rejection)) =
                        validate_through(at.total_steps, &state.draft, &state.roles)
                    {
                        state.position = WorkflowPosition {
                            step_index,
                            direction: Direction::Backward,
                            ..at
                        };
                        let saved = state.persisted();
                        drop(state);
                        self.save(saved).await;
                        tracing::info!(
                            attempt = %self.attempt_id,
                            step = step_index,
                            reason = %rejection,
                            "Earlier step incomplete, moved back"
                        );
                        return Err(rejection.into());
                    }
                    state.position = at;
                    state.submission = SubmissionState::Submitting;
                    (compose(&state.draft, &state.roles), state.roles.clone())
                }
            }
        };

        tracing::info!(attempt = %self.attempt_id, roles = ?roles, "Submitting registration");
        let result = submit(self.service.as_ref(), &body).await;

        let landing = {
            let mut state = self.state.write().await;
            match result {
                SubmissionResult::Success(_) => {
                    state.submission = SubmissionState::Done;
                    Some(Landing::for_roles(&roles))
                }
                SubmissionResult::Failure(ref message) => {
                    tracing::info!(attempt = %self.attempt_id, %message, "Registration failed");
                    state.submission = SubmissionState::Idle;
                    None
                }
            }
        };
        if landing.is_some() {
            self.clear_store().await;
        }

        Ok(AdvanceOutcome::Submitted { result, landing })
    }

    /// Move back one step. From the first step of a pre-selected flow this
    /// asks the caller to leave instead.
    pub async fn retreat(&self) -> Result<RetreatOutcome, WorkflowError> {
        let (outcome, saved) = {
            let mut state = self.state.write().await;
            state.ensure_idle()?;
            match step::retreat(state.position, self.has_preselected_role()) {
                Retreat::Moved(prev) => {
                    state.position = prev;
                    (RetreatOutcome::Moved { position: prev }, state.persisted())
                }
                Retreat::ExitToRoleSelection(at) => {
                    state.position = at;
                    (RetreatOutcome::ExitToRoleSelection, None)
                }
            }
        };
        self.save(saved).await;
        Ok(outcome)
    }

    /// Drop every answer and start over.
    pub async fn abandon(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.write().await;
            if state.submission == SubmissionState::Submitting {
                return Err(WorkflowError::SubmissionInFlight);
            }
            *state = WorkflowState::fresh(self.preselected);
        }
        self.clear_store().await;
        tracing::info!(attempt = %self.attempt_id, "Registration abandoned");
        Ok(())
    }

    /// Best-effort write; a failure is logged and otherwise ignored.
    async fn save(&self, saved: Option<(String, String)>) {
        let Some((draft_json, step)) = saved else {
            return;
        };
        if let Err(e) = self.store.set(draft_keys::DRAFT, &draft_json).await {
            tracing::warn!("Failed to persist registration draft: {}", e);
        }
        if let Err(e) = self.store.set(draft_keys::STEP, &step).await {
            tracing::warn!("Failed to persist registration step: {}", e);
        }
    }

    async fn clear_store(&self) {
        for key in [draft_keys::DRAFT, draft_keys::STEP] {
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key, "Failed to clear registration draft: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::{DatabaseError, ServiceError};
    use crate::registration::compose::RequestBody;
    use crate::registration::submit::ServiceReply;
    use crate::store::MemoryDraftStore;

    /// Replies with a fixed JSON body. Optionally holds every call until
    /// released.
    struct StubService {
        reply: serde_json::Value,
        calls: AtomicUsize,
        bodies: Mutex<Vec<RequestBody>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubService {
        fn new(reply: serde_json::Value) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(reply: serde_json::Value, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(reply)
            }
        }
    }

    #[async_trait]
    impl AccountService for StubService {
        async fn create_account(&self, body: &RequestBody) -> Result<ServiceReply, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.lock().unwrap().push(body.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ServiceReply {
                status: 200,
                body: self.reply.to_string(),
            })
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl DraftStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, DatabaseError> {
            Err(DatabaseError::Query("offline".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::Query("offline".into()))
        }
        async fn remove(&self, _key: &str) -> Result<bool, DatabaseError> {
            Err(DatabaseError::Query("offline".into()))
        }
    }

    struct StubImages;

    #[async_trait]
    impl ImageHost for StubImages {
        async fn upload(
            &self,
            _bytes: Vec<u8>,
            file_name: &str,
            category: ImageCategory,
        ) -> Result<String, ImageHostError> {
            Ok(format!("https://img.test/{category}/{file_name}"))
        }
    }

    fn success() -> serde_json::Value {
        json!({"success": true, "tokens": {"access": "abc", "refresh": "r"}, "user": {"id": 1}})
    }

    async fn fill_identity(manager: &RegistrationManager) {
        for (field, value) in [
            (DraftField::FirstName, "Ada"),
            (DraftField::LastName, "Obi"),
            (DraftField::Email, "ada@example.com"),
            (DraftField::Phone, "+2348000000000"),
            (DraftField::Password, "s3cret-pass"),
            (DraftField::ConfirmPassword, "s3cret-pass"),
        ] {
            manager.set_field(field, value).await.unwrap();
        }
    }

    #[tokio::test]
    async fn customer_preselected_submits_from_identity() {
        let store = Arc::new(MemoryDraftStore::new());
        let service = Arc::new(StubService::new(success()));
        let manager =
            RegistrationManager::start(store.clone(), service.clone(), Some(Role::Customer)).await;

        assert_eq!(manager.position().await.step_index, 1);
        assert_eq!(manager.position().await.total_steps, 1);
        fill_identity(&manager).await;

        let outcome = manager.advance().await.unwrap();
        match outcome {
            AdvanceOutcome::Submitted {
                result: SubmissionResult::Success(created),
                landing,
            } => {
                assert_eq!(created.access_token.as_deref(), Some("abc"));
                assert_eq!(landing, Some(Landing::SingleRole));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(manager.submission_state().await, SubmissionState::Done);
        assert!(store.is_empty().await, "store should be cleared on success");
        assert!(matches!(
            manager.advance().await,
            Err(WorkflowError::AlreadySubmitted)
        ));
    }

    #[tokio::test]
    async fn merchant_missing_address_is_rejected_in_place() {
        let service = Arc::new(StubService::new(success()));
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            service.clone(),
            Some(Role::Merchant),
        )
        .await;
        fill_identity(&manager).await;
        manager.advance().await.unwrap();
        assert_eq!(manager.position().await.step_index, 2);

        manager.set_field(DraftField::BusinessName, "Mama Put").await.unwrap();
        manager.set_field(DraftField::BusinessCategory, "food").await.unwrap();

        let before = manager.position().await;
        let err = manager.advance().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Rejected(Rejection::MissingMerchantDetails)
        ));
        assert_eq!(err.to_string(), "Business details are required for vendor role");
        assert_eq!(manager.position().await, before);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_flow_failure_keeps_draft_and_reenables() {
        let service = Arc::new(StubService::new(json!({"message": "phone: already in use"})));
        let manager =
            RegistrationManager::start(Arc::new(MemoryDraftStore::new()), service.clone(), None)
                .await;

        manager.toggle_role(Role::Merchant).await.unwrap();
        manager.toggle_role(Role::DeliveryAgent).await.unwrap();
        manager.advance().await.unwrap();
        fill_identity(&manager).await;
        manager.advance().await.unwrap();
        for (field, value) in [
            (DraftField::BusinessName, "Mama Put"),
            (DraftField::BusinessCategory, "food"),
            (DraftField::BusinessAddress, "4 Allen Ave"),
            (DraftField::VehicleType, "motorbike"),
            (DraftField::LicenseNumber, "LAG-123"),
        ] {
            manager.set_field(field, value).await.unwrap();
        }
        manager.advance().await.unwrap();
        manager.set_field(DraftField::OpeningHours, "08:00").await.unwrap();
        manager.set_field(DraftField::ClosingHours, "18:00").await.unwrap();
        let draft_before = manager.draft().await;

        let outcome = manager.advance().await.unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Submitted {
                result: SubmissionResult::Failure("phone: already in use".to_string()),
                landing: None,
            }
        );
        assert_eq!(manager.submission_state().await, SubmissionState::Idle);
        assert_eq!(manager.position().await.step_index, 3);
        assert_eq!(manager.draft().await, draft_before);

        let sent = service.bodies.lock().unwrap()[0].clone();
        assert_eq!(sent["opening_hours"], "08:00:00");
        assert_eq!(sent["vehicle_type"], "motorbike");

        // Submission is available again.
        manager.advance().await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retreat_from_preselected_identity_exits() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            Some(Role::DeliveryAgent),
        )
        .await;
        assert_eq!(
            manager.retreat().await.unwrap(),
            RetreatOutcome::ExitToRoleSelection
        );
        assert_eq!(manager.position().await.step_index, 1);
    }

    #[tokio::test]
    async fn deselecting_to_customer_collapses_steps() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            None,
        )
        .await;
        manager.toggle_role(Role::Customer).await.unwrap();
        manager.toggle_role(Role::Merchant).await.unwrap();
        manager.advance().await.unwrap();
        fill_identity(&manager).await;
        manager.advance().await.unwrap();
        assert_eq!(manager.position().await.step_index, 2);

        manager.toggle_role(Role::Merchant).await.unwrap();
        let position = manager.position().await;
        assert_eq!(position.total_steps, 1);
        assert_eq!(position.step_index, 1);
    }

    #[tokio::test]
    async fn last_role_cannot_be_dropped_after_role_selection() {
        let service = Arc::new(StubService::new(success()));
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            service.clone(),
            Some(Role::Customer),
        )
        .await;
        fill_identity(&manager).await;

        let err = manager.toggle_role(Role::Customer).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Rejected(Rejection::NoRoleSelected)
        ));
        assert!(manager.roles().await.contains(Role::Customer));
        assert_eq!(manager.position().await.total_steps, 1);

        let outcome = manager.advance().await.unwrap();
        assert!(matches!(
            outcome,
            AdvanceOutcome::Submitted {
                landing: Some(Landing::SingleRole),
                ..
            }
        ));
        let sent = service.bodies.lock().unwrap()[0].clone();
        assert_eq!(sent["roles"], json!(["customer"]));
    }

    #[tokio::test]
    async fn roles_may_be_emptied_on_role_selection() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            None,
        )
        .await;
        manager.toggle_role(Role::Merchant).await.unwrap();
        let roles = manager.toggle_role(Role::Merchant).await.unwrap();
        assert!(roles.is_empty());

        manager.toggle_role(Role::Merchant).await.unwrap();
        manager.advance().await.unwrap();
        assert!(manager.toggle_role(Role::Merchant).await.is_err());
        assert_eq!(manager.position().await.step_index, 1);
    }

    #[tokio::test]
    async fn role_added_on_terminal_step_sends_user_back() {
        let store = Arc::new(MemoryDraftStore::new());
        let service = Arc::new(StubService::new(success()));
        let manager =
            RegistrationManager::start(store.clone(), service.clone(), Some(Role::DeliveryAgent))
                .await;
        fill_identity(&manager).await;
        manager.advance().await.unwrap();
        manager.set_field(DraftField::VehicleType, "motorbike").await.unwrap();
        manager.set_field(DraftField::LicenseNumber, "LAG-123").await.unwrap();
        manager.advance().await.unwrap();
        assert_eq!(manager.position().await.step_index, 3);

        manager.toggle_role(Role::Merchant).await.unwrap();
        assert_eq!(manager.position().await.step_index, 3);
        manager.set_field(DraftField::OpeningHours, "08:00").await.unwrap();
        manager.set_field(DraftField::ClosingHours, "17:00").await.unwrap();

        let err = manager.advance().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Rejected(Rejection::MissingMerchantDetails)
        ));
        let position = manager.position().await;
        assert_eq!(position.step_index, 2);
        assert_eq!(position.direction, Direction::Backward);
        assert_eq!(manager.submission_state().await, SubmissionState::Idle);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get(draft_keys::STEP).await.unwrap().as_deref(),
            Some("2")
        );

        for (field, value) in [
            (DraftField::BusinessName, "Mama Put"),
            (DraftField::BusinessCategory, "food"),
            (DraftField::BusinessAddress, "4 Allen Ave"),
        ] {
            manager.set_field(field, value).await.unwrap();
        }
        manager.advance().await.unwrap();
        let outcome = manager.advance().await.unwrap();
        assert!(matches!(
            outcome,
            AdvanceOutcome::Submitted {
                result: SubmissionResult::Success(_),
                landing: Some(Landing::Verification),
            }
        ));
        let sent = service.bodies.lock().unwrap()[0].clone();
        assert_eq!(sent["business_name"], "Mama Put");
        assert_eq!(sent["roles"], json!(["merchant", "delivery_agent"]));
    }

    #[tokio::test]
    async fn transitions_refused_while_submitting() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService::gated(success(), gate.clone()));
        let manager = Arc::new(
            RegistrationManager::start(
                Arc::new(MemoryDraftStore::new()),
                service.clone(),
                Some(Role::Customer),
            )
            .await,
        );
        fill_identity(&manager).await;

        let in_flight = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.advance().await })
        };
        while manager.submission_state().await != SubmissionState::Submitting {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            manager.advance().await,
            Err(WorkflowError::SubmissionInFlight)
        ));
        assert!(matches!(
            manager.retreat().await,
            Err(WorkflowError::SubmissionInFlight)
        ));
        assert!(matches!(
            manager.set_field(DraftField::FirstName, "Eve").await,
            Err(WorkflowError::SubmissionInFlight)
        ));

        gate.notify_one();
        let outcome = in_flight.await.unwrap().unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Submitted { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resumes_saved_draft() {
        let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
        {
            let manager = RegistrationManager::start(
                store.clone(),
                Arc::new(StubService::new(success())),
                None,
            )
            .await;
            manager.toggle_role(Role::Merchant).await.unwrap();
            manager.advance().await.unwrap();
            fill_identity(&manager).await;
            manager.advance().await.unwrap();
        }

        let resumed =
            RegistrationManager::start(store, Arc::new(StubService::new(success())), None).await;
        assert_eq!(resumed.position().await.step_index, 2);
        assert_eq!(resumed.position().await.total_steps, 3);
        assert!(resumed.roles().await.contains(Role::Merchant));
        assert_eq!(resumed.draft().await.identity.first_name, "Ada");
    }

    #[tokio::test]
    async fn corrupt_draft_starts_fresh() {
        let store = Arc::new(MemoryDraftStore::new());
        store.set(draft_keys::DRAFT, "{not json").await.unwrap();
        store.set(draft_keys::STEP, "3").await.unwrap();

        let manager =
            RegistrationManager::start(store, Arc::new(StubService::new(success())), None).await;
        assert_eq!(manager.position().await.step_index, 0);
        assert!(manager.roles().await.is_empty());
    }

    #[tokio::test]
    async fn broken_store_never_blocks_the_flow() {
        let manager = RegistrationManager::start(
            Arc::new(BrokenStore),
            Arc::new(StubService::new(success())),
            Some(Role::Customer),
        )
        .await;
        fill_identity(&manager).await;
        assert_eq!(manager.draft().await.identity.first_name, "Ada");
        let outcome = manager.advance().await.unwrap();
        assert!(matches!(
            outcome,
            AdvanceOutcome::Submitted {
                result: SubmissionResult::Success(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn abandon_resets_and_clears() {
        let store = Arc::new(MemoryDraftStore::new());
        let manager = RegistrationManager::start(
            store.clone(),
            Arc::new(StubService::new(success())),
            None,
        )
        .await;
        manager.toggle_role(Role::Merchant).await.unwrap();
        manager.set_field(DraftField::FirstName, "Ada").await.unwrap();
        assert!(!store.is_empty().await);

        manager.abandon().await.unwrap();
        assert!(store.is_empty().await);
        assert!(manager.roles().await.is_empty());
        assert!(manager.draft().await.identity.first_name.is_empty());
    }

    #[tokio::test]
    async fn attach_image_stores_url() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            Some(Role::Merchant),
        )
        .await
        .with_image_host(Arc::new(StubImages));

        let url = manager
            .attach_image(ImageCategory::Logo, vec![1, 2, 3], "logo.png")
            .await
            .unwrap();
        assert_eq!(url, "https://img.test/logo/logo.png");
        assert_eq!(manager.draft().await.merchant.logo, url);
    }

    #[tokio::test]
    async fn attach_image_without_host_fails() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            None,
        )
        .await;
        let err = manager
            .attach_image(ImageCategory::CoverPhoto, vec![0], "c.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ImageHost(ImageHostError::NotConfigured)));
    }

    #[tokio::test]
    async fn status_redacts_passwords() {
        let manager = RegistrationManager::start(
            Arc::new(MemoryDraftStore::new()),
            Arc::new(StubService::new(success())),
            Some(Role::Customer),
        )
        .await;
        fill_identity(&manager).await;
        let status = manager.status().await;
        assert_eq!(status.step, Some(Step::Identity));
        assert!(status.draft.identity.password.is_empty());
        assert_eq!(status.draft.identity.first_name, "Ada");
        assert_eq!(status.preselected_role, Some(Role::Customer));
    }
}
