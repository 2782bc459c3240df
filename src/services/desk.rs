//! Desk controller: sole owner of a circulation desk session.
//!
//! Every mutation of the [`Session`] goes through this controller. Backend
//! calls never run under the session lock: a flow reads what it needs, awaits
//! the backend, then commits in one short write that first checks the session
//! generation it started from. A lookup answered after the patron was cleared
//! or replaced is therefore discarded as [`DeskError::Superseded`] instead of
//! repopulating the session; when the backend already acted on it, the caller
//! gets [`DeskError::Stranded`] naming the items. A scanned code stays claimed
//! until its flow ends, so a second scan of it is rejected as a duplicate.
//! Observers get read-only snapshots through a `watch` channel.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::watch;

use crate::{
    backend::CirculationBackend,
    config::DeskConfig,
    error::{DeskError, DeskResult},
    models::{CirculationAction, Operator, Session},
    services::{
        applier::{self, ApplyReport},
        guard::{self, ConfirmPrompt, ExitDecision, ExitReason},
        policy,
        resolver::{self, ScanOutcome, ScanTarget},
    },
};

/// Resets the in-flight flag even if the apply future is dropped
struct ApplyingFlag<'a>(&'a AtomicBool);

impl Drop for ApplyingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Holds a scanned code as in flight until its flow ends, even if the future is dropped
struct ScanClaim<'a> {
    state: &'a watch::Sender<Session>,
    code: String,
}

impl Drop for ScanClaim<'_> {
    fn drop(&mut self) {
        self.state
            .send_if_modified(|session| session.scans_in_flight.remove(&self.code));
    }
}

pub struct DeskController {
    backend: Arc<dyn CirculationBackend>,
    operator: Operator,
    config: DeskConfig,
    state: watch::Sender<Session>,
    applying: AtomicBool,
}

impl DeskController {
    pub fn new(backend: Arc<dyn CirculationBackend>, operator: Operator, config: DeskConfig) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            backend,
            operator,
            config,
            state,
            applying: AtomicBool::new(false),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn has_pending_actions(&self) -> bool {
        self.state.borrow().has_pending_actions()
    }

    /// Apply `f` to the session unless it moved past `generation`.
    /// Observers are notified only when `f` succeeds.
    fn commit<T>(&self, generation: u64, f: impl FnOnce(&mut Session) -> DeskResult<T>) -> DeskResult<T> {
        let mut result = Err(DeskError::Superseded);
        self.state.send_if_modified(|session| {
            if session.generation != generation {
                return false;
            }
            result = f(session);
            result.is_ok()
        });
        result
    }

    /// Resolve a scanned code against the current session
    pub async fn scan(&self, code: &str) -> DeskResult<ScanOutcome> {
        let mut claimed = Err(DeskError::Superseded);
        self.state.send_modify(|session| {
            session.last_scan_text = Some(code.trim().to_string());
            claimed = resolver::classify(code, session).map(|target| {
                session.scans_in_flight.insert(target.code().to_string());
                (target, session.generation)
            });
        });

        let result = match claimed {
            Ok((target, generation)) => {
                let _claim = ScanClaim {
                    state: &self.state,
                    code: target.code().to_string(),
                };
                match target {
                    ScanTarget::Patron { code } => self.scan_patron(code, generation).await,
                    ScanTarget::Item { code, patron_pid } => self.scan_item(code, patron_pid, generation).await,
                }
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => tracing::debug!("Scan {} resolved: {:?}", code, outcome),
            Err(e) => tracing::warn!("Scan {} rejected: {}", code, e),
        }
        result
    }

    async fn scan_patron(&self, code: String, generation: u64) -> DeskResult<ScanOutcome> {
        let Some(mut patron) = self.backend.find_patron(&code).await? else {
            return self.automatic_checkin(code, generation).await;
        };

        if !resolver::is_visible(&patron, &self.operator, self.config.hide_foreign_patrons) {
            tracing::info!(
                "Patron {} belongs to organisation {}, hidden from this desk",
                patron.pid,
                patron.organisation_pid
            );
            return Err(DeskError::PatronNotFound(code));
        }

        patron.items = self.backend.patron_loans(&patron.pid).await?.into_iter().collect();

        self.commit(generation, move |session| {
            let staged_item_pid = resolver::loanable_anonymous_item(&session.anonymous_items, &patron)
                .and_then(|item| {
                    let pid = item.pid.clone();
                    patron.items.push_front(item).then_some(pid)
                });
            let patron_pid = patron.pid.clone();

            tracing::info!(
                "Patron {} ({}) identified with {} items{}",
                patron_pid,
                patron.display_name(),
                patron.items.len(),
                if staged_item_pid.is_some() { ", one staged for checkout" } else { "" }
            );
            session.identify(patron);

            Ok(ScanOutcome::PatronIdentified {
                patron_pid,
                staged_item_pid,
            })
        })
    }

    async fn automatic_checkin(&self, code: String, generation: u64) -> DeskResult<ScanOutcome> {
        let outcome = self
            .backend
            .automatic_checkin(
                &code,
                Some(self.operator.user_pid.clone()),
                Some(self.operator.library_pid.clone()),
            )
            .await?
            .ok_or_else(|| DeskError::ItemNotFound(code.clone()))?;

        let item_pid = outcome.item.pid.clone();
        let action_done = outcome.action_done;
        let result = self.commit(generation, move |session| {
            let item_pid = outcome.item.pid.clone();
            session.anonymous_items.remove(&item_pid);
            session.anonymous_items.push_front(outcome.item);

            tracing::info!("Automatic {} on item {}", action_done, item_pid);
            Ok(ScanOutcome::AutomaticAction { item_pid, action_done })
        });

        match result {
            Err(DeskError::Superseded) => {
                tracing::warn!(
                    "Automatic {} on item {} applied after the desk session changed",
                    action_done,
                    item_pid
                );
                Err(DeskError::Stranded { applied: vec![item_pid] })
            }
            other => other,
        }
    }

    async fn scan_item(&self, code: String, patron_pid: String, generation: u64) -> DeskResult<ScanOutcome> {
        let mut item = self
            .backend
            .find_item(&code, Some(patron_pid.clone()))
            .await?
            .ok_or_else(|| DeskError::ItemNotFound(code.clone()))?;

        self.commit(generation, move |session| {
            let patron = session
                .identified_patron
                .as_mut()
                .filter(|patron| patron.pid == patron_pid)
                .ok_or(DeskError::Superseded)?;

            if patron.items.contains(&item.pid) || patron.items.contains_barcode(&item.barcode) {
                return Err(DeskError::AlreadyInList(code));
            }

            let action = policy::default_action(&item, patron)?;
            item.current_action = action;
            let item_pid = item.pid.clone();
            patron.items.push_front(item);

            Ok(ScanOutcome::ItemAdded { item_pid, action })
        })
    }

    /// Override the action chosen for one item of the patron's list
    pub fn set_action(&self, item_pid: &str, action: CirculationAction) -> DeskResult<()> {
        let generation = self.state.borrow().generation;
        self.commit(generation, |session| {
            let patron = session.identified_patron.as_mut().ok_or(DeskError::NoPatron)?;
            let item = patron
                .items
                .get_mut(item_pid)
                .ok_or_else(|| DeskError::NotInList(item_pid.to_string()))?;
            policy::validate_override(item, action)?;
            item.current_action = action;
            Ok(())
        })
    }

    /// Submit every pending action for the identified patron as one batch
    pub async fn apply(&self) -> DeskResult<ApplyReport> {
        if self.applying.swap(true, Ordering::SeqCst) {
            return Err(DeskError::ApplyInProgress);
        }
        let _flag = ApplyingFlag(&self.applying);

        let (patron, generation) = {
            let session = self.state.borrow();
            (session.identified_patron.clone(), session.generation)
        };
        let patron = patron.ok_or(DeskError::NoPatron)?;

        if !patron.items.has_pending_actions() {
            return Ok(ApplyReport::default());
        }

        let outcomes = applier::apply_batch(self.backend.as_ref(), &patron, &self.operator, &patron.items).await?;
        let applied: Vec<String> = outcomes.iter().map(|o| o.item.pid.clone()).collect();

        let result = self.commit(generation, move |session| {
            let current = session.identified_patron.as_mut().ok_or(DeskError::Superseded)?;
            let (items, report) = applier::reconcile(&current.items, outcomes);
            current.items = items;
            Ok(report)
        });

        match result {
            Ok(report) => {
                tracing::info!(
                    "Batch applied for patron {}: {} actions, {} items done",
                    patron.pid,
                    report.applied.len(),
                    report.removed.len()
                );
                Ok(report)
            }
            Err(DeskError::Superseded) => {
                tracing::warn!(
                    "Batch for patron {} was applied but the session changed meanwhile",
                    patron.pid
                );
                Err(DeskError::Stranded { applied })
            }
            Err(e) => Err(e),
        }
    }

    /// Clear the patron or leave the desk, going through the unsaved-changes guard
    /// Refused while a batch is being applied.
    pub async fn exit(&self, reason: ExitReason, prompt: &dyn ConfirmPrompt) -> ExitDecision {
        if self.applying.load(Ordering::SeqCst) {
            tracing::warn!("Exit ({:?}) refused while a batch is being applied", reason);
            return ExitDecision::Stay;
        }

        let decision = guard::guard_exit(self.has_pending_actions(), reason, prompt).await;
        if decision == ExitDecision::Proceed {
            self.state.send_modify(Session::reset);
            tracing::debug!("Desk session reset ({:?})", reason);
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockCirculationBackend;
    use crate::models::{Item, ItemQueue, ItemStatus, Patron};
    use crate::services::guard::PresetAnswer;

    fn operator() -> Operator {
        Operator {
            user_pid: "u1".to_string(),
            library_pid: "lib-1".to_string(),
            organisation_pid: "org-1".to_string(),
        }
    }

    fn patron(organisation: &str) -> Patron {
        Patron {
            pid: "p1".to_string(),
            barcode: "P1".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Byron".to_string()),
            library_pid: Some("lib-1".to_string()),
            organisation_pid: organisation.to_string(),
            items: ItemQueue::new(),
        }
    }

    fn shelf_item(pid: &str, barcode: &str) -> Item {
        Item {
            pid: pid.to_string(),
            barcode: barcode.to_string(),
            status: ItemStatus::OnShelf,
            title: None,
            library_pid: None,
            location_pid: None,
            available: true,
            actions: vec![CirculationAction::Checkout],
            loan: None,
            pending_loans: vec![],
            current_action: CirculationAction::No,
            action_done: None,
        }
    }

    fn controller(backend: MockCirculationBackend) -> DeskController {
        DeskController::new(Arc::new(backend), operator(), DeskConfig::default())
    }

    #[tokio::test]
    async fn test_foreign_patron_is_not_found_and_session_unchanged() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-2"))));
        backend.expect_patron_loans().times(0);
        backend.expect_automatic_checkin().times(0);

        let desk = controller(backend);
        let before = desk.snapshot();
        assert!(matches!(desk.scan("P1").await, Err(DeskError::PatronNotFound(_))));

        let after = desk.snapshot();
        assert!(after.identified_patron.is_none());
        assert_eq!(after.generation, before.generation);
    }

    #[tokio::test]
    async fn test_foreign_patron_visible_when_configured() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-2"))));
        backend.expect_patron_loans().returning(|_| Ok(vec![]));

        let desk = DeskController::new(
            Arc::new(backend),
            operator(),
            DeskConfig {
                hide_foreign_patrons: false,
            },
        );
        assert!(desk.scan("P1").await.is_ok());
        assert!(desk.snapshot().identified_patron.is_some());
    }

    #[tokio::test]
    async fn test_item_scan_adds_default_checkout() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-1"))));
        backend.expect_patron_loans().returning(|_| Ok(vec![]));
        backend.expect_find_item().times(1).returning(|barcode, patron_pid| {
            assert_eq!(barcode, "B1");
            assert_eq!(patron_pid.as_deref(), Some("p1"));
            Ok(Some(shelf_item("i1", "B1")))
        });

        let desk = controller(backend);
        desk.scan("P1").await.unwrap();
        let outcome = desk.scan("B1").await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::ItemAdded {
                item_pid: "i1".to_string(),
                action: CirculationAction::Checkout
            }
        );
        assert!(desk.has_pending_actions());
        assert!(matches!(desk.scan("B1").await, Err(DeskError::AlreadyInList(_))));
    }

    #[tokio::test]
    async fn test_set_action_rejects_unlisted_action() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-1"))));
        backend.expect_patron_loans().returning(|_| Ok(vec![shelf_item("i1", "B1")]));

        let desk = controller(backend);
        desk.scan("P1").await.unwrap();
        assert!(!desk.has_pending_actions());

        assert!(matches!(
            desk.set_action("i1", CirculationAction::Lose),
            Err(DeskError::ActionNotAllowed { .. })
        ));
        desk.set_action("i1", CirculationAction::Checkout).unwrap();
        assert!(desk.has_pending_actions());
        assert!(matches!(
            desk.set_action("i9", CirculationAction::Checkout),
            Err(DeskError::NotInList(_))
        ));
    }

    #[tokio::test]
    async fn test_exit_guard_keeps_pending_queue_without_confirmation() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-1"))));
        backend.expect_patron_loans().returning(|_| Ok(vec![shelf_item("i1", "B1")]));

        let desk = controller(backend);
        desk.scan("P1").await.unwrap();
        desk.set_action("i1", CirculationAction::Checkout).unwrap();

        let decision = desk.exit(ExitReason::ClearPatron, &PresetAnswer(false)).await;
        assert_eq!(decision, ExitDecision::Stay);
        assert!(desk.snapshot().identified_patron.is_some());

        let decision = desk.exit(ExitReason::NavigateAway, &PresetAnswer(true)).await;
        assert_eq!(decision, ExitDecision::Proceed);
        assert!(desk.snapshot().identified_patron.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_committed_changes() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_find_patron().returning(|_| Ok(Some(patron("org-1"))));
        backend.expect_patron_loans().returning(|_| Ok(vec![]));

        let desk = controller(backend);
        let mut rx = desk.subscribe();
        desk.scan("P1").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().identified_patron.as_ref().map(|p| p.pid.clone()),
            Some("p1".to_string())
        );
    }

    #[tokio::test]
    async fn test_apply_without_patron_is_rejected() {
        let desk = controller(MockCirculationBackend::new());
        assert!(matches!(desk.apply().await, Err(DeskError::NoPatron)));
        assert!(!desk.applying.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_exit_stays_while_batch_is_applied() {
        let desk = controller(MockCirculationBackend::new());
        desk.applying.store(true, Ordering::SeqCst);

        let decision = desk.exit(ExitReason::NavigateAway, &PresetAnswer(true)).await;
        assert_eq!(decision, ExitDecision::Stay);
        assert_eq!(desk.snapshot().generation, 0);
    }

    #[tokio::test]
    async fn test_second_apply_is_rejected_while_one_runs() {
        let mut backend = MockCirculationBackend::new();
        backend.expect_perform().times(0);
        let desk = controller(backend);

        desk.applying.store(true, Ordering::SeqCst);
        assert!(matches!(desk.apply().await, Err(DeskError::ApplyInProgress)));
        assert!(desk.applying.load(Ordering::SeqCst));
    }
}
