// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Circle reconciliation engine.
//!
//! Decides whether a signed-in user is registering a new circle or editing
//! the one they already lead, and commits the form accordingly:
//!
//! - Create: insert circle → leader roster entry → `joinedCircleIds`
//!   back-reference, strictly in that order. Steps 2 and 3 are idempotent,
//!   so a partially failed create can be finished with `resume_create`.
//! - Edit: one masked update of the circle document.
//!
//! Commits for one leader are serialized in-process so racing submissions
//! can never produce a second circle.

use crate::db::DocumentStore;
use crate::error::{AppError, CommitStep, ValidationError};
use crate::models::{
    CircleDocument, CircleDraft, Confirmation, DraftMode, Identity, MemberRole, MembershipEntry,
    OwnershipState, ValidCircle,
};
use crate::time_utils::{format_utc_rfc3339, system_clock, Clock};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-leader commit locks.
pub type CommitLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Clone)]
pub struct CircleService {
    db: Arc<dyn DocumentStore>,
    /// Per-leader mutex serializing commits.
    commit_locks: CommitLocks,
    clock: Clock,
}

impl CircleService {
    pub fn new(db: Arc<dyn DocumentStore>) -> Self {
        Self {
            db,
            commit_locks: Arc::new(DashMap::new()),
            clock: system_clock(),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> String {
        format_utc_rfc3339((self.clock)())
    }

    // ─── Ownership ───────────────────────────────────────────────

    /// Find the circle `identity` leads, if any.
    ///
    /// More than one match breaks the one-circle-per-leader invariant; that
    /// is logged and the lowest document id wins.
    pub async fn detect_ownership(
        &self,
        identity: &Identity,
    ) -> Result<Option<CircleDocument>, AppError> {
        let mut circles = self.db.find_circles_by_leader(&identity.uid).await?;
        circles.sort_by(|a, b| a.id.cmp(&b.id));

        if circles.len() > 1 {
            let ids: Vec<&str> = circles.iter().map(|c| c.id.as_str()).collect();
            tracing::warn!(
                uid = %identity.uid,
                count = circles.len(),
                circle_ids = ?ids,
                chosen = ids[0],
                "IntegrityAnomaly: leader owns more than one circle"
            );
        }

        Ok(circles.into_iter().next())
    }

    /// Mode and starting draft for the registration form.
    pub async fn load_ownership_state(
        &self,
        identity: Option<&Identity>,
    ) -> Result<OwnershipState, AppError> {
        let Some(identity) = identity else {
            return Ok(OwnershipState {
                mode: DraftMode::NoIdentity,
                draft_seed: CircleDraft::default(),
            });
        };

        // The profile only pre-fills the form; losing it is not fatal.
        let profile = match self.db.get_profile(&identity.uid).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(uid = %identity.uid, error = %e, "Profile unavailable for draft seed");
                None
            }
        };
        let seed = CircleDraft::seed_for_new(identity, profile.as_ref());

        let state = match self.detect_ownership(identity).await? {
            None => OwnershipState {
                mode: DraftMode::Create,
                draft_seed: seed,
            },
            Some(circle) => OwnershipState {
                draft_seed: CircleDraft::from_document(&circle, &seed),
                mode: DraftMode::Edit {
                    circle_id: circle.id,
                },
            },
        };

        tracing::debug!(uid = %identity.uid, mode = state.mode.label(), "Ownership state loaded");
        Ok(state)
    }

    /// Required-field check. Pure.
    pub fn validate(&self, draft: &CircleDraft) -> Result<ValidCircle, ValidationError> {
        draft.validate()
    }

    // ─── Commit ──────────────────────────────────────────────────

    /// Validate and persist `draft` in the given mode.
    ///
    /// Nothing touches the store unless there is an identity and the draft
    /// validates.
    pub async fn submit_draft(
        &self,
        identity: Option<&Identity>,
        draft: &CircleDraft,
        mode: &DraftMode,
    ) -> Result<Confirmation, AppError> {
        let identity = identity.ok_or(AppError::Unauthorized)?;
        if *mode == DraftMode::NoIdentity {
            return Err(AppError::Unauthorized);
        }
        let circle = self.validate(draft)?;

        let lock = self.leader_lock(&identity.uid);
        let _guard = lock.lock().await;

        match mode {
            DraftMode::Create => {
                // A concurrent submission may have created the circle while
                // this one waited for the lock.
                let existing = self.detect_ownership(identity).await.map_err(|e| {
                    AppError::commit(mode, CommitStep::InsertCircle, None, e)
                })?;
                match existing {
                    Some(existing) => {
                        tracing::info!(
                            uid = %identity.uid,
                            circle_id = %existing.id,
                            "Circle already exists, applying create as update"
                        );
                        self.commit_update(identity, &existing.id, &circle).await
                    }
                    None => self.commit_create(identity, &circle).await,
                }
            }
            DraftMode::Edit { circle_id } => {
                let existing = self.db.get_circle(circle_id).await.map_err(|e| {
                    AppError::commit(mode, CommitStep::UpdateCircle, Some(circle_id.clone()), e)
                })?;
                let existing =
                    existing.ok_or_else(|| AppError::NotFound(format!("Circle {}", circle_id)))?;
                if existing.leader_id != identity.uid {
                    tracing::warn!(uid = %identity.uid, circle_id = %circle_id, "Edit refused, not the leader");
                    return Err(AppError::Forbidden(circle_id.clone()));
                }
                self.commit_update(identity, circle_id, &circle).await
            }
            DraftMode::NoIdentity => Err(AppError::Unauthorized),
        }
    }

    /// Finish a create that failed after the circle document was written.
    ///
    /// Replays the roster entry and the profile back-reference; the circle
    /// itself is never inserted again.
    pub async fn resume_create(
        &self,
        identity: Option<&Identity>,
        circle_id: &str,
    ) -> Result<Confirmation, AppError> {
        let identity = identity.ok_or(AppError::Unauthorized)?;

        let lock = self.leader_lock(&identity.uid);
        let _guard = lock.lock().await;

        let circle = self
            .db
            .get_circle(circle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Circle {}", circle_id)))?;
        if circle.leader_id != identity.uid {
            return Err(AppError::Forbidden(circle_id.to_string()));
        }

        let joined_at = if circle.created_at.is_empty() {
            self.now()
        } else {
            circle.created_at.clone()
        };

        tracing::info!(uid = %identity.uid, circle_id, "Resuming circle create");
        self.link_leader(identity, circle_id, &joined_at).await?;
        Ok(Confirmation::created(circle_id.to_string()))
    }

    fn leader_lock(&self, uid: &str) -> Arc<Mutex<()>> {
        self.commit_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn commit_create(
        &self,
        identity: &Identity,
        circle: &ValidCircle,
    ) -> Result<Confirmation, AppError> {
        let now = self.now();
        let doc = CircleDocument::new(circle, &identity.uid, &now);

        let circle_id = self.db.insert_circle(&doc).await.map_err(|e| {
            AppError::commit(&DraftMode::Create, CommitStep::InsertCircle, None, e)
        })?;
        tracing::info!(uid = %identity.uid, circle_id = %circle_id, "Circle inserted");

        self.link_leader(identity, &circle_id, &now).await?;

        tracing::info!(uid = %identity.uid, circle_id = %circle_id, "Circle created");
        Ok(Confirmation::created(circle_id))
    }

    /// Create steps 2 and 3.
    async fn link_leader(
        &self,
        identity: &Identity,
        circle_id: &str,
        joined_at: &str,
    ) -> Result<(), AppError> {
        let entry = MembershipEntry {
            uid: identity.uid.clone(),
            joined_at: joined_at.to_string(),
            role: MemberRole::Leader,
        };

        self.db
            .set_member(circle_id, &identity.uid, &entry)
            .await
            .map_err(|e| {
                AppError::commit(
                    &DraftMode::Create,
                    CommitStep::AddLeaderMembership,
                    Some(circle_id.to_string()),
                    e,
                )
            })?;

        self.db
            .add_joined_circle(&identity.uid, circle_id)
            .await
            .map_err(|e| {
                AppError::commit(
                    &DraftMode::Create,
                    CommitStep::LinkUserProfile,
                    Some(circle_id.to_string()),
                    e,
                )
            })
    }

    async fn commit_update(
        &self,
        identity: &Identity,
        circle_id: &str,
        circle: &ValidCircle,
    ) -> Result<Confirmation, AppError> {
        let mode = DraftMode::Edit {
            circle_id: circle_id.to_string(),
        };
        self.db
            .update_circle(circle_id, circle, &self.now())
            .await
            .map_err(|e| {
                AppError::commit(&mode, CommitStep::UpdateCircle, Some(circle_id.to_string()), e)
            })?;

        tracing::info!(uid = %identity.uid, circle_id, "Circle updated");
        Ok(Confirmation::updated(circle_id.to_string()))
    }
}

// ─── Form state machine ──────────────────────────────────────────

/// Phase of one visit to the registration form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPhase {
    Loading,
    NoIdentity,
    Create,
    Edit { circle_id: String },
    Submitting,
    Done(Confirmation),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("form cannot be submitted while {0}")]
    NotReady(&'static str),
}

/// Per-visit form state: `Loading → NoIdentity | Create | Edit`, then
/// `Submitting → Done`, or back to the prior mode on failure with the
/// draft kept and the error message set.
#[derive(Debug, Clone)]
pub struct CircleForm {
    phase: FormPhase,
    mode: DraftMode,
    pub draft: CircleDraft,
    error: Option<&'static str>,
}

impl Default for CircleForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CircleForm {
    pub fn new() -> Self {
        Self {
            phase: FormPhase::Loading,
            mode: DraftMode::NoIdentity,
            draft: CircleDraft::default(),
            error: None,
        }
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn mode(&self) -> &DraftMode {
        &self.mode
    }

    /// User-facing message of the last failed submission.
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Load the ownership state and enter the matching mode.
    pub async fn load(
        &mut self,
        service: &CircleService,
        identity: Option<&Identity>,
    ) -> Result<(), AppError> {
        let state = service.load_ownership_state(identity).await?;
        self.mode = state.mode;
        self.draft = state.draft_seed;
        self.error = None;
        self.phase = self.mode_phase();
        Ok(())
    }

    /// Submit the current draft. The result is also reflected in `phase`.
    pub async fn submit(
        &mut self,
        service: &CircleService,
        identity: Option<&Identity>,
    ) -> Result<Confirmation, AppError> {
        self.begin_submit().map_err(|e| AppError::BadRequest(e.to_string()))?;
        let result = service.submit_draft(identity, &self.draft, &self.mode).await;
        self.finish_submit(&result);
        result
    }

    /// Move to `Submitting`. Rejected while loading, already submitting or
    /// done.
    pub fn begin_submit(&mut self) -> Result<(), FormError> {
        match self.phase {
            FormPhase::Submitting => Err(FormError::AlreadySubmitting),
            FormPhase::Loading => Err(FormError::NotReady("loading")),
            FormPhase::Done(_) => Err(FormError::NotReady("done")),
            FormPhase::NoIdentity | FormPhase::Create | FormPhase::Edit { .. } => {
                self.phase = FormPhase::Submitting;
                self.error = None;
                Ok(())
            }
        }
    }

    pub fn finish_submit(&mut self, result: &Result<Confirmation, AppError>) {
        match result {
            Ok(confirmation) => self.phase = FormPhase::Done(confirmation.clone()),
            Err(e) => {
                self.error = Some(e.user_message());
                self.phase = self.mode_phase();
            }
        }
    }

    fn mode_phase(&self) -> FormPhase {
        match &self.mode {
            DraftMode::NoIdentity => FormPhase::NoIdentity,
            DraftMode::Create => FormPhase::Create,
            DraftMode::Edit { circle_id } => FormPhase::Edit {
                circle_id: circle_id.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{CommitOutcome, UserProfile};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    fn user(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
        }
    }

    fn tennis_draft() -> CircleDraft {
        CircleDraft {
            name: "Tennis Club".to_string(),
            university_name: "Test Univ".to_string(),
            leader_name: "Leader".to_string(),
            contact_info: "leader@example.com".to_string(),
            genre: "スポーツ（球技）".to_string(),
            features: vec!["初心者歓迎".to_string()],
            frequency: "週１回".to_string(),
            activity_days: vec![],
            members: "11-30人".to_string(),
            gender_ratio: "半々".to_string(),
            circle_type: "学内サークル".to_string(),
            is_recruiting: true,
        }
    }

    /// Clock that advances one minute per reading.
    fn stepping_clock() -> Clock {
        let tick = Arc::new(AtomicI64::new(0));
        Arc::new(move || {
            let n = tick.fetch_add(1, Ordering::SeqCst);
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap() + Duration::minutes(n)
        })
    }

    fn setup() -> (Arc<MemoryStore>, CircleService) {
        let store = Arc::new(MemoryStore::new());
        let service = CircleService::new(store.clone()).with_clock(stepping_clock());
        (store, service)
    }

    #[tokio::test]
    async fn test_no_identity_never_touches_store() {
        let (store, service) = setup();

        let state = service.load_ownership_state(None).await.unwrap();
        assert_eq!(state.mode, DraftMode::NoIdentity);

        for mode in [DraftMode::Create, DraftMode::NoIdentity] {
            let err = service
                .submit_draft(None, &tennis_draft(), &mode)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized));
        }
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_touches_store() {
        let (store, service) = setup();
        let draft = CircleDraft {
            features: vec![],
            ..tennis_draft()
        };

        let err = service
            .submit_draft(Some(&user("a")), &draft, &DraftMode::Create)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref v) if v.missing == vec!["features"]));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_mode_seeded_from_profile() {
        let (store, service) = setup();
        let a = user("a");
        let mut profile = UserProfile::new_for(&a, "t0");
        profile.name = "山田 太郎".to_string();
        profile.university = "Test Univ".to_string();
        store.create_profile(&profile).await.unwrap();

        let state = service.load_ownership_state(Some(&a)).await.unwrap();
        assert_eq!(state.mode, DraftMode::Create);
        assert_eq!(state.draft_seed.university_name, "Test Univ");
        assert_eq!(state.draft_seed.leader_name, "山田 太郎");
        assert_eq!(state.draft_seed.contact_info, "a@example.com");
        assert!(state.draft_seed.name.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_edit_scenario() {
        let (store, service) = setup();
        let a = user("a");

        // First submission creates.
        let created = service
            .submit_draft(Some(&a), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap();
        assert_eq!(created.outcome, CommitOutcome::Created);
        assert_eq!(created.message, Confirmation::CREATED_MESSAGE);
        let circle_id = created.circle_id.clone();

        let doc = store.get_circle(&circle_id).await.unwrap().unwrap();
        assert_eq!(doc.leader_id, "a");
        assert_eq!(doc.name, "Tennis Club");
        assert_eq!(doc.genre, "スポーツ（球技）");
        assert!(doc.welcome.is_recruiting);

        let members = store.list_members(&circle_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].uid, "a");
        assert_eq!(members[0].role, MemberRole::Leader);

        let profile = store.get_profile("a").await.unwrap().unwrap();
        assert_eq!(profile.joined_circle_ids, vec![circle_id.clone()]);

        // Reloading the page now yields edit mode with the stored fields.
        let state = service.load_ownership_state(Some(&a)).await.unwrap();
        assert_eq!(
            state.mode,
            DraftMode::Edit {
                circle_id: circle_id.clone()
            }
        );
        assert_eq!(state.draft_seed, tennis_draft());

        // Second submission edits in place.
        let renamed = CircleDraft {
            name: "Tennis Club Pro".to_string(),
            ..tennis_draft()
        };
        let updated = service
            .submit_draft(Some(&a), &renamed, &state.mode)
            .await
            .unwrap();
        assert_eq!(updated.outcome, CommitOutcome::Updated);
        assert_eq!(updated.message, Confirmation::UPDATED_MESSAGE);
        assert_eq!(updated.circle_id, circle_id);

        let after = store.get_circle(&circle_id).await.unwrap().unwrap();
        assert_eq!(after.name, "Tennis Club Pro");
        assert_eq!(after.created_at, doc.created_at);
        assert!(after.updated_at.as_deref() > Some(doc.created_at.as_str()));
        assert_eq!(store.circle_count(), 1);
        assert_eq!(store.list_members(&circle_id).await.unwrap().len(), 1);

        // A further edit advances updatedAt again.
        service
            .submit_draft(Some(&a), &renamed, &state.mode)
            .await
            .unwrap();
        let again = store.get_circle(&circle_id).await.unwrap().unwrap();
        assert!(again.updated_at > after.updated_at);
        assert_eq!(store.circle_count(), 1);
    }

    #[tokio::test]
    async fn test_racing_creates_produce_one_circle() {
        let (store, service) = setup();
        let a = user("a");
        let draft = tennis_draft();

        let (first, second) = tokio::join!(
            service.submit_draft(Some(&a), &draft, &DraftMode::Create),
            service.submit_draft(Some(&a), &draft, &DraftMode::Create),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.circle_id, second.circle_id);
        let mut outcomes = vec![first.outcome, second.outcome];
        outcomes.sort_by_key(|o| *o == CommitOutcome::Updated);
        assert_eq!(outcomes, vec![CommitOutcome::Created, CommitOutcome::Updated]);

        assert_eq!(store.circle_count(), 1);
        assert_eq!(store.list_members(&first.circle_id).await.unwrap().len(), 1);
        let profile = store.get_profile("a").await.unwrap().unwrap();
        assert_eq!(profile.joined_circle_ids, vec![first.circle_id]);
    }

    #[tokio::test]
    async fn test_stale_create_mode_updates_existing_circle() {
        let (store, service) = setup();
        let a = user("a");
        let created = service
            .submit_draft(Some(&a), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap();

        // A second tab still showing create mode.
        let again = service
            .submit_draft(Some(&a), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap();
        assert_eq!(again.outcome, CommitOutcome::Updated);
        assert_eq!(again.circle_id, created.circle_id);
        assert_eq!(store.circle_count(), 1);
    }

    #[tokio::test]
    async fn test_edit_of_foreign_circle_forbidden() {
        let (store, service) = setup();
        let created = service
            .submit_draft(Some(&user("a")), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap();

        let mode = DraftMode::Edit {
            circle_id: created.circle_id.clone(),
        };
        let err = service
            .submit_draft(Some(&user("b")), &tennis_draft(), &mode)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref id) if *id == created.circle_id));

        let doc = store.get_circle(&created.circle_id).await.unwrap().unwrap();
        assert!(doc.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_partial_create_reports_step_and_resumes() {
        let (store, service) = setup();
        let a = user("a");
        store.fail_on("add_joined_circle");

        let err = service
            .submit_draft(Some(&a), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap_err();
        let circle_id = match &err {
            AppError::Commit {
                step: CommitStep::LinkUserProfile,
                circle_id: Some(id),
                ..
            } => id.clone(),
            other => panic!("unexpected error: {:?}", other),
        };
        assert_eq!(err.user_message(), AppError::CREATE_FAILED_MESSAGE);
        assert_eq!(store.circle_count(), 1);

        store.recover("add_joined_circle");
        let resumed = service.resume_create(Some(&a), &circle_id).await.unwrap();
        assert_eq!(resumed.circle_id, circle_id);

        // Resuming twice stays idempotent.
        service.resume_create(Some(&a), &circle_id).await.unwrap();
        assert_eq!(store.circle_count(), 1);
        assert_eq!(store.list_members(&circle_id).await.unwrap().len(), 1);
        let profile = store.get_profile("a").await.unwrap().unwrap();
        assert_eq!(profile.joined_circle_ids, vec![circle_id]);
    }

    #[tokio::test]
    async fn test_insert_failure_has_no_circle_id() {
        let (store, service) = setup();
        store.fail_on("insert_circle");

        let err = service
            .submit_draft(Some(&user("a")), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Commit {
                step: CommitStep::InsertCircle,
                circle_id: None,
                ..
            }
        ));
        assert_eq!(store.circle_count(), 0);
    }

    #[tokio::test]
    async fn test_resume_refuses_foreign_circle() {
        let (_store, service) = setup();
        let created = service
            .submit_draft(Some(&user("a")), &tennis_draft(), &DraftMode::Create)
            .await
            .unwrap();

        let err = service
            .resume_create(Some(&user("b")), &created.circle_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service.resume_create(None, &created.circle_id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_duplicate_ownership_picks_lowest_id() {
        let (store, service) = setup();
        let a = user("a");
        let circle = tennis_draft().validate().unwrap();

        let mut second = CircleDocument::new(&circle, "a", "t0");
        second.name = "Second".to_string();
        store.seed_circle("zzz", second);
        let mut first = CircleDocument::new(&circle, "a", "t0");
        first.name = "First".to_string();
        store.seed_circle("aaa", first);

        let owned = service.detect_ownership(&a).await.unwrap().unwrap();
        assert_eq!(owned.id, "aaa");
        assert_eq!(owned.name, "First");
    }

    #[tokio::test]
    async fn test_form_state_machine() {
        let (store, service) = setup();
        let a = user("a");
        let mut form = CircleForm::new();
        assert_eq!(form.phase(), &FormPhase::Loading);
        assert_eq!(form.begin_submit(), Err(FormError::NotReady("loading")));

        form.load(&service, Some(&a)).await.unwrap();
        assert_eq!(form.phase(), &FormPhase::Create);

        // A failed submit returns to create mode with the draft kept.
        form.draft = CircleDraft {
            features: vec![],
            ..tennis_draft()
        };
        assert!(form.submit(&service, Some(&a)).await.is_err());
        assert_eq!(form.phase(), &FormPhase::Create);
        assert_eq!(form.error(), Some(ValidationError::CIRCLE_MESSAGE));
        assert!(form.draft.features.is_empty());

        form.draft.features = vec!["初心者歓迎".to_string()];
        form.begin_submit().unwrap();
        assert_eq!(form.begin_submit(), Err(FormError::AlreadySubmitting));
        let result = service.submit_draft(Some(&a), &form.draft, form.mode()).await;
        form.finish_submit(&result);

        match form.phase() {
            FormPhase::Done(confirmation) => {
                assert_eq!(confirmation.outcome, CommitOutcome::Created)
            }
            other => panic!("unexpected phase: {:?}", other),
        }
        assert_eq!(store.circle_count(), 1);

        // Next visit lands in edit mode.
        let mut next = CircleForm::new();
        next.load(&service, Some(&a)).await.unwrap();
        assert!(matches!(next.phase(), FormPhase::Edit { .. }));
    }

    #[tokio::test]
    async fn test_form_without_identity() {
        let (_store, service) = setup();
        let mut form = CircleForm::new();
        form.load(&service, None).await.unwrap();
        assert_eq!(form.phase(), &FormPhase::NoIdentity);

        form.draft = tennis_draft();
        let err = form.submit(&service, None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(form.error(), Some(AppError::UNAUTHORIZED_MESSAGE));
        assert_eq!(form.phase(), &FormPhase::NoIdentity);
    }
}
