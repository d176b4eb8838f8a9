use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tokio::task::JoinHandle;

use crate::catalog::AssetPackListingData;
use crate::config::PurchaseConfig;
use crate::error::{AppError, AppResult};
use crate::services::{BillingService, CheckoutRequest, PurchaseCatalog, UrlOpener};
use crate::session::{ReceivedPacksSnapshot, UserContext, find_received_pack};

use super::attempt::{FailureKind, PurchaseAttempt, PurchaseDialogView, PurchaseStatus};
use super::event::{FlowEvent, PollEvent};
use super::poller::{PollJob, PurchasePoller};

/// Remote collaborators of the purchase flow.
#[derive(Clone)]
pub struct FlowServices {
    pub billing: Arc<dyn BillingService>,
    pub catalog: Arc<dyn PurchaseCatalog>,
    pub opener: Arc<dyn UrlOpener>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Started,
    /// The user already owns the pack; no attempt was created.
    AlreadyOwned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowTransition {
    PasswordRequested,
    CheckoutOpened { url: String },
    /// `refresh_catalog` is set when the confirmation came from polling and
    /// the received packs still need a refresh to reflect ownership.
    Succeeded { refresh_catalog: bool },
    /// The pack turned out to be owned before any purchase; the dialog closed.
    AlreadyOwned,
    LoginSettled,
}

pub struct PurchaseFlowController {
    services: FlowServices,
    user: UserContext,
    config: PurchaseConfig,
    attempt: Option<PurchaseAttempt>,
    attempt_generation: u64,
    next_generation: u64,
    poller: Option<PurchasePoller>,
    settle_timer: Option<JoinHandle<()>>,
    last_check_failure: Option<String>,
    event_tx: UnboundedSender<FlowEvent>,
    event_rx: UnboundedReceiver<FlowEvent>,
}

impl PurchaseFlowController {
    pub fn new(services: FlowServices, user: UserContext, config: PurchaseConfig) -> Self {
        let (event_tx, event_rx) = unbounded_channel();
        Self {
            services,
            user,
            config,
            attempt: None,
            attempt_generation: 0,
            next_generation: 0,
            poller: None,
            settle_timer: None,
            last_check_failure: None,
            event_tx,
            event_rx,
        }
    }

    pub fn attempt(&self) -> Option<&PurchaseAttempt> {
        self.attempt.as_ref()
    }

    pub fn status(&self) -> PurchaseStatus {
        self.attempt
            .as_ref()
            .map_or(PurchaseStatus::Idle, PurchaseAttempt::status)
    }

    pub fn target_pack_id(&self) -> Option<&str> {
        self.attempt
            .as_ref()
            .map(|attempt| attempt.target_pack.id.as_str())
    }

    pub fn last_check_failure(&self) -> Option<&str> {
        self.last_check_failure.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(PurchasePoller::is_running)
    }

    pub fn view(&self) -> PurchaseDialogView {
        let Some(attempt) = &self.attempt else {
            return PurchaseDialogView::Closed;
        };
        if !self.user.is_authenticated() {
            return PurchaseDialogView::LoginRequired;
        }
        if attempt.checking_after_login {
            return PurchaseDialogView::CheckingPurchases;
        }
        match attempt.status {
            PurchaseStatus::Idle => PurchaseDialogView::Information,
            PurchaseStatus::AwaitingPassword => PurchaseDialogView::PasswordPrompt,
            PurchaseStatus::CheckoutOpened | PurchaseStatus::Polling => {
                PurchaseDialogView::Purchasing
            }
            PurchaseStatus::Succeeded => PurchaseDialogView::Succeeded,
            PurchaseStatus::Failed => PurchaseDialogView::Failed(
                attempt.failure.unwrap_or(FailureKind::CheckoutRequest),
            ),
        }
    }

    /// Opens the purchase dialog for `listing` unless the user owns it.
    ///
    /// Any previous attempt is discarded.
    pub fn begin(&mut self, listing: AssetPackListingData) -> BeginOutcome {
        let snapshot = self.user.received_packs();
        if find_received_pack(&snapshot, &listing.id).is_some() {
            tracing::debug!(pack_id = %listing.id, "pack already owned, no purchase needed");
            return BeginOutcome::AlreadyOwned;
        }

        self.dismiss();
        self.next_generation = self.next_generation.saturating_add(1);
        self.attempt_generation = self.next_generation;
        tracing::debug!(pack_id = %listing.id, "purchase dialog opened");
        self.attempt = Some(PurchaseAttempt::new(listing, snapshot.is_none()));
        BeginOutcome::Started
    }

    /// User asked to buy. Dev builds prompt for the shared password first.
    pub async fn request_purchase(&mut self) -> AppResult<FlowTransition> {
        let status = self.require_attempt()?.status;
        if !matches!(status, PurchaseStatus::Idle | PurchaseStatus::Failed) {
            return Err(AppError::invalid_argument(format!(
                "cannot start a purchase while {status:?}"
            )));
        }
        if !self.user.is_authenticated() {
            return Err(AppError::NotAuthenticated);
        }

        if self.config.require_password {
            let attempt = self.require_attempt_mut()?;
            attempt.status = PurchaseStatus::AwaitingPassword;
            attempt.failure = None;
            return Ok(FlowTransition::PasswordRequested);
        }
        self.start_checkout().await
    }

    pub async fn retry(&mut self) -> AppResult<FlowTransition> {
        self.request_purchase().await
    }

    pub fn set_password(&mut self, value: impl Into<String>) -> AppResult<()> {
        let attempt = self.require_attempt_mut()?;
        if attempt.status != PurchaseStatus::AwaitingPassword {
            return Err(AppError::invalid_argument("no password prompt is open"));
        }
        attempt.password = value.into();
        Ok(())
    }

    pub async fn submit_password(&mut self, value: impl Into<String>) -> AppResult<FlowTransition> {
        self.set_password(value)?;
        self.start_checkout().await
    }

    pub fn cancel_password_prompt(&mut self) {
        if let Some(attempt) = self.attempt.as_mut()
            && attempt.status == PurchaseStatus::AwaitingPassword
        {
            attempt.password.clear();
            attempt.status = PurchaseStatus::Idle;
        }
    }

    /// Back to the information dialog, abandoning any checkout in progress.
    pub fn cancel(&mut self) {
        self.stop_poller();
        if let Some(attempt) = self.attempt.as_mut()
            && attempt.status != PurchaseStatus::Succeeded
        {
            attempt.password.clear();
            attempt.failure = None;
            attempt.status = PurchaseStatus::Idle;
        }
    }

    /// Closes the dialog and destroys the attempt.
    pub fn dismiss(&mut self) {
        self.stop_poller();
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        self.last_check_failure = None;
        if let Some(attempt) = self.attempt.take() {
            tracing::debug!(pack_id = %attempt.target_pack.id, status = ?attempt.status, "purchase dialog closed");
        }
    }

    pub async fn next_event(&mut self) -> Option<FlowEvent> {
        self.event_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<FlowEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Applies every event already queued.
    pub fn pump(&mut self) -> Vec<FlowTransition> {
        let mut transitions = Vec::new();
        while let Some(event) = self.try_next_event() {
            transitions.extend(self.handle_event(event));
        }
        transitions
    }

    pub fn handle_event(&mut self, event: FlowEvent) -> Option<FlowTransition> {
        match event {
            FlowEvent::Poll(event) => self.handle_poll_event(event),
            FlowEvent::LoginSettled { generation } => {
                if generation != self.attempt_generation {
                    return None;
                }
                let attempt = self.attempt.as_mut()?;
                if !attempt.checking_after_login {
                    return None;
                }
                attempt.checking_after_login = false;
                Some(FlowTransition::LoginSettled)
            }
        }
    }

    fn handle_poll_event(&mut self, event: PollEvent) -> Option<FlowTransition> {
        let current = self.poller.as_ref().map(PurchasePoller::generation);
        if current != Some(event.generation()) {
            tracing::trace!(generation = event.generation(), "ignoring stale poll event");
            return None;
        }
        match event {
            PollEvent::Confirmed { .. } => self
                .complete_purchase()
                .then_some(FlowTransition::Succeeded {
                    refresh_catalog: true,
                }),
            PollEvent::CheckFailed { message, .. } => {
                self.last_check_failure = Some(message);
                None
            }
        }
    }

    /// Reacts to a received-packs update pushed by the user context.
    pub fn on_received_packs_changed(
        &mut self,
        snapshot: &ReceivedPacksSnapshot,
    ) -> Option<FlowTransition> {
        let attempt = self.attempt.as_ref()?;
        let checking_after_login = attempt.checking_after_login;
        let status = attempt.status;
        let owned = find_received_pack(snapshot, &attempt.target_pack.id).is_some();

        if snapshot.is_some() && checking_after_login {
            self.restart_settle_timer();
        }
        if !owned {
            return None;
        }

        if status.is_purchasing() {
            return self
                .complete_purchase()
                .then_some(FlowTransition::Succeeded {
                    refresh_catalog: false,
                });
        }
        if status == PurchaseStatus::Succeeded {
            return None;
        }
        self.dismiss();
        Some(FlowTransition::AlreadyOwned)
    }

    /// The only way into `Succeeded`; repeated confirmations are no-ops.
    fn complete_purchase(&mut self) -> bool {
        let Some(attempt) = self.attempt.as_mut() else {
            return false;
        };
        if !attempt.status.is_purchasing() {
            return false;
        }
        attempt.status = PurchaseStatus::Succeeded;
        attempt.failure = None;
        tracing::info!(pack_id = %attempt.target_pack.id, "asset pack purchase succeeded");
        self.stop_poller();
        true
    }

    async fn start_checkout(&mut self) -> AppResult<FlowTransition> {
        let attempt = self
            .attempt
            .as_mut()
            .ok_or_else(|| AppError::invalid_argument("no purchase in progress"))?;
        let password = std::mem::take(&mut attempt.password);

        let Some(profile) = self.user.profile() else {
            return Err(AppError::NotAuthenticated);
        };
        let Some(price_id) = attempt.target_pack.price_reference() else {
            return Err(AppError::invalid_argument(format!(
                "pack {} has no price",
                attempt.target_pack.id
            )));
        };
        let request = CheckoutRequest {
            price_id: price_id.to_string(),
            user_id: profile.id,
            customer_email: profile.email,
            password: (!password.is_empty()).then_some(password),
        };
        let authorization = self.user.authorization_header()?;

        let result = self
            .services
            .billing
            .get_checkout_url(&authorization, &request)
            .await;
        drop(request);

        let url = match result {
            Ok(url) => url,
            Err(source) => {
                let err = AppError::from_checkout_failure(source);
                let kind = match &err {
                    AppError::Authorization { .. } => FailureKind::Authorization,
                    _ => FailureKind::CheckoutRequest,
                };
                tracing::error!(error = %err, ?kind, "unable to get the checkout URL");
                let attempt = self.require_attempt_mut()?;
                attempt.status = PurchaseStatus::Failed;
                attempt.failure = Some(kind);
                return Err(err);
            }
        };

        if let Err(err) = self.services.opener.open_external_url(&url) {
            tracing::warn!(error = %err, %url, "could not open checkout page, open it manually");
        }
        let attempt = self.require_attempt_mut()?;
        attempt.status = PurchaseStatus::CheckoutOpened;
        attempt.failure = None;
        self.start_polling()?;
        Ok(FlowTransition::CheckoutOpened { url })
    }

    fn start_polling(&mut self) -> AppResult<()> {
        self.stop_poller();
        self.next_generation = self.next_generation.saturating_add(1);
        let generation = self.next_generation;
        let attempt = self
            .attempt
            .as_mut()
            .ok_or_else(|| AppError::invalid_argument("no purchase in progress"))?;
        let job = PollJob {
            generation,
            pack_id: attempt.target_pack.id.clone(),
            user: self.user.clone(),
            catalog: Arc::clone(&self.services.catalog),
        };
        attempt.status = PurchaseStatus::Polling;
        self.last_check_failure = None;
        self.poller = Some(PurchasePoller::start(
            self.config.poll_interval(),
            job,
            self.event_tx.clone(),
        ));
        Ok(())
    }

    fn stop_poller(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
    }

    fn restart_settle_timer(&mut self) {
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        let generation = self.attempt_generation;
        let delay = self.config.login_settle();
        let events = self.event_tx.clone();
        self.settle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(FlowEvent::LoginSettled { generation });
        }));
    }

    fn require_attempt(&self) -> AppResult<&PurchaseAttempt> {
        self.attempt
            .as_ref()
            .ok_or_else(|| AppError::invalid_argument("no purchase in progress"))
    }

    fn require_attempt_mut(&mut self) -> AppResult<&mut PurchaseAttempt> {
        self.attempt
            .as_mut()
            .ok_or_else(|| AppError::invalid_argument("no purchase in progress"))
    }
}

impl Drop for PurchaseFlowController {
    fn drop(&mut self) {
        self.dismiss();
    }
}
