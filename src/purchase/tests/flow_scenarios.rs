use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::catalog::fixtures::{listing, owned, purchase};
use crate::config::PurchaseConfig;
use crate::error::AppError;
use crate::purchase::{
    BeginOutcome, FailureKind, FlowEvent, FlowServices, FlowTransition, PollEvent,
    PurchaseDialogView, PurchaseFlowController, PurchaseStatus,
};
use crate::session::UserContext;
use crate::testing::{
    FakeBilling, FakeCatalog, RecordingOpener, logged_in_user, server_error, wrong_password,
};

pub(super) struct Harness {
    pub(super) flow: PurchaseFlowController,
    pub(super) billing: Arc<FakeBilling>,
    pub(super) catalog: Arc<FakeCatalog>,
    pub(super) opener: Arc<RecordingOpener>,
    pub(super) user: UserContext,
}

pub(super) fn harness(require_password: bool, user: UserContext) -> Harness {
    let billing = Arc::new(FakeBilling::default());
    let catalog = Arc::new(FakeCatalog::default());
    let opener = Arc::new(RecordingOpener::default());
    let config = PurchaseConfig {
        require_password,
        ..PurchaseConfig::default()
    };
    let flow = PurchaseFlowController::new(
        FlowServices {
            billing: billing.clone(),
            catalog: catalog.clone(),
            opener: opener.clone(),
        },
        user.clone(),
        config,
    );
    Harness {
        flow,
        billing,
        catalog,
        opener,
        user,
    }
}

pub(super) fn loaded_user() -> UserContext {
    let user = logged_in_user();
    user.set_received_packs(vec![owned("other")]);
    user
}

#[tokio::test(start_paused = true)]
async fn dev_mode_purchase_runs_from_password_to_success() {
    let mut h = harness(true, loaded_user());
    h.catalog.respond(Ok(vec![purchase("other")]));
    h.catalog.respond(Ok(vec![purchase("other"), purchase("P")]));

    assert_eq!(h.flow.begin(listing("P")), BeginOutcome::Started);
    assert_eq!(h.flow.view(), PurchaseDialogView::Information);

    let transition = h.flow.request_purchase().await.expect("password prompt");
    assert_eq!(transition, FlowTransition::PasswordRequested);
    assert_eq!(h.flow.status(), PurchaseStatus::AwaitingPassword);

    let transition = h.flow.submit_password("x").await.expect("checkout opened");
    assert_eq!(
        transition,
        FlowTransition::CheckoutOpened {
            url: "https://checkout.example/session".to_string()
        }
    );
    let requests = h.billing.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].password.as_deref(), Some("x"));
    assert_eq!(requests[0].price_id, "price_P");
    assert_eq!(requests[0].user_id, "user-1");
    assert_eq!(requests[0].customer_email, "user@example.com");
    assert_eq!(h.opener.opened(), vec!["https://checkout.example/session"]);

    let attempt = h.flow.attempt().expect("attempt");
    assert_eq!(attempt.status(), PurchaseStatus::Polling);
    assert_eq!(attempt.password(), "");

    // First tick: purchases without P.
    time::sleep(Duration::from_millis(3_950)).await;
    assert!(h.flow.pump().is_empty());
    assert_eq!(h.flow.status(), PurchaseStatus::Polling);

    // Second tick confirms.
    let event = h.flow.next_event().await.expect("poll event");
    assert_eq!(
        h.flow.handle_event(event),
        Some(FlowTransition::Succeeded {
            refresh_catalog: true
        })
    );
    assert_eq!(h.flow.status(), PurchaseStatus::Succeeded);
    assert_eq!(h.flow.view(), PurchaseDialogView::Succeeded);
    assert!(!h.flow.is_polling());

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.catalog.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn wrong_password_fails_with_authorization_and_clears_password() {
    let mut h = harness(true, loaded_user());
    h.billing.respond(Err(wrong_password()));

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("password prompt");
    let err = h
        .flow
        .submit_password("bad")
        .await
        .expect_err("wrong password is rejected");

    assert!(matches!(err, AppError::Authorization { .. }));
    let attempt = h.flow.attempt().expect("attempt kept");
    assert_eq!(attempt.status(), PurchaseStatus::Failed);
    assert_eq!(attempt.failure(), Some(FailureKind::Authorization));
    assert_eq!(attempt.password(), "");
    assert_eq!(
        h.flow.view(),
        PurchaseDialogView::Failed(FailureKind::Authorization)
    );
    assert!(h.opener.opened().is_empty());
    assert!(!h.flow.is_polling());

    // Retrying goes back through the password prompt.
    let transition = h.flow.retry().await.expect("retry prompts again");
    assert_eq!(transition, FlowTransition::PasswordRequested);
    assert_eq!(h.flow.attempt().and_then(|a| a.failure()), None);
}

#[tokio::test(start_paused = true)]
async fn generic_checkout_failure_can_be_cancelled() {
    let mut h = harness(false, loaded_user());
    h.billing.respond(Err(server_error()));

    h.flow.begin(listing("P"));
    let err = h
        .flow
        .request_purchase()
        .await
        .expect_err("server error fails checkout");
    assert!(matches!(err, AppError::CheckoutRequest { .. }));
    assert_eq!(
        h.flow.view(),
        PurchaseDialogView::Failed(FailureKind::CheckoutRequest)
    );

    h.flow.cancel();
    assert_eq!(h.flow.status(), PurchaseStatus::Idle);
    assert_eq!(h.flow.view(), PurchaseDialogView::Information);
}

#[tokio::test(start_paused = true)]
async fn production_checkout_skips_password_prompt() {
    let mut h = harness(false, loaded_user());

    h.flow.begin(listing("P"));
    let transition = h.flow.request_purchase().await.expect("checkout");
    assert!(matches!(transition, FlowTransition::CheckoutOpened { .. }));
    assert_eq!(h.flow.status(), PurchaseStatus::Polling);
    assert_eq!(h.billing.requests()[0].password, None);
    assert!(h.flow.is_polling());
}

#[tokio::test(start_paused = true)]
async fn logged_out_user_sees_login_prompt() {
    let mut h = harness(false, UserContext::new());

    assert_eq!(h.flow.begin(listing("P")), BeginOutcome::Started);
    assert_eq!(h.flow.view(), PurchaseDialogView::LoginRequired);
    let err = h
        .flow
        .request_purchase()
        .await
        .expect_err("login required");
    assert!(matches!(err, AppError::NotAuthenticated));
    assert_eq!(h.flow.status(), PurchaseStatus::Idle);
    assert!(h.billing.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelling_password_prompt_returns_to_idle() {
    let mut h = harness(true, loaded_user());

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("password prompt");
    h.flow.set_password("typed").expect("prompt open");
    assert_eq!(h.flow.attempt().map(|a| a.password()), Some("typed"));

    h.flow.cancel_password_prompt();
    assert_eq!(h.flow.status(), PurchaseStatus::Idle);
    assert_eq!(h.flow.attempt().map(|a| a.password()), Some(""));
    assert!(h.billing.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dismiss_while_polling_releases_the_poller() {
    let mut h = harness(false, loaded_user());

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("checkout");
    time::sleep(Duration::from_millis(3_950)).await;
    assert_eq!(h.catalog.calls(), 1);

    h.flow.dismiss();
    assert!(h.flow.attempt().is_none());
    assert_eq!(h.flow.view(), PurchaseDialogView::Closed);
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.catalog.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_polling_stops_queries_and_keeps_dialog() {
    let mut h = harness(false, loaded_user());

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("checkout");
    h.flow.cancel();
    assert_eq!(h.flow.status(), PurchaseStatus::Idle);
    assert!(!h.flow.is_polling());

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.catalog.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_stops_polling() {
    let mut h = harness(false, loaded_user());

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("checkout");
    let catalog = h.catalog.clone();
    drop(h);

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(catalog.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn owned_pack_never_creates_an_attempt() {
    let mut h = harness(false, loaded_user());

    assert_eq!(h.flow.begin(listing("other")), BeginOutcome::AlreadyOwned);
    assert!(h.flow.attempt().is_none());
    assert!(h.flow.request_purchase().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn poll_failures_are_recorded_without_changing_state() {
    let mut h = harness(false, loaded_user());
    h.catalog.respond(Err(server_error()));

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("checkout");
    let event = h.flow.next_event().await.expect("poll event");
    assert_eq!(h.flow.handle_event(event), None);
    assert_eq!(h.flow.status(), PurchaseStatus::Polling);
    assert!(
        h.flow
            .last_check_failure()
            .is_some_and(|message| message.contains("P"))
    );
    assert!(h.flow.is_polling());
    assert!(h.user.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn queued_events_are_available_without_waiting() {
    let mut h = harness(false, loaded_user());
    h.catalog.respond(Err(server_error()));

    h.flow.begin(listing("P"));
    h.flow.request_purchase().await.expect("checkout");
    assert_eq!(h.flow.try_next_event(), None);

    time::sleep(Duration::from_millis(3_950)).await;
    let event = h.flow.try_next_event().expect("check failure queued");
    assert!(matches!(
        event,
        FlowEvent::Poll(PollEvent::CheckFailed { .. })
    ));
    assert_eq!(h.flow.try_next_event(), None);
}
