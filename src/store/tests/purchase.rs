use super::harness;
use crate::catalog::OpenedPack;
use crate::catalog::fixtures::{listing, owned};
use crate::purchase::{FlowTransition, PurchaseDialogView};
use crate::testing::{logged_in_user, server_error};

fn loaded_user() -> crate::session::UserContext {
    let user = logged_in_user();
    user.set_received_packs(vec![owned("other")]);
    user
}

#[tokio::test(start_paused = true)]
async fn completed_purchase_opens_the_bought_pack_once() {
    let mut h = harness(loaded_user());
    h.store.select_private_pack(listing("P"));
    let transition = h.store.request_purchase().await.expect("checkout");
    assert!(matches!(transition, FlowTransition::CheckoutOpened { .. }));
    assert_eq!(h.store.view().purchase, PurchaseDialogView::Purchasing);

    h.user.set_received_packs(vec![owned("other"), owned("P")]);
    let snapshot = h.user.received_packs();
    assert_eq!(
        h.store.on_received_packs_changed(&snapshot),
        Some(FlowTransition::Succeeded {
            refresh_catalog: false
        })
    );
    assert_eq!(h.store.history().depth(), 2);
    assert_eq!(
        h.store
            .current_page()
            .opened_asset_pack()
            .and_then(OpenedPack::id),
        Some("P")
    );
    assert!(h.store.is_filters_panel_open());

    assert_eq!(h.store.on_received_packs_changed(&snapshot), None);
    assert_eq!(h.store.history().depth(), 2);
    assert_eq!(h.store.view().purchase, PurchaseDialogView::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn dismissed_purchase_does_not_navigate_later() {
    let mut h = harness(loaded_user());
    h.store.select_private_pack(listing("P"));
    h.store.request_purchase().await.expect("checkout");
    h.store.dismiss_purchase();
    assert_eq!(h.store.view().purchase, PurchaseDialogView::Closed);

    h.user.set_received_packs(vec![owned("P")]);
    assert_eq!(
        h.store.on_received_packs_changed(&h.user.received_packs()),
        None
    );
    assert_eq!(h.store.history().depth(), 1);
}

#[tokio::test(start_paused = true)]
async fn unrelated_snapshot_keeps_the_user_in_place() {
    let mut h = harness(loaded_user());
    h.store.select_private_pack(listing("P"));
    h.store.request_purchase().await.expect("checkout");

    h.user.set_received_packs(vec![owned("other"), owned("Q")]);
    assert_eq!(
        h.store.on_received_packs_changed(&h.user.received_packs()),
        None
    );
    assert!(h.store.current_page().is_on_home_page());
    assert!(h.store.purchase_flow().is_polling());
}

#[tokio::test(start_paused = true)]
async fn switching_packs_forgets_the_abandoned_purchase() {
    let mut h = harness(loaded_user());
    h.store.select_private_pack(listing("P"));
    h.store.request_purchase().await.expect("checkout");

    h.store.select_private_pack(listing("Q"));
    assert_eq!(h.store.purchase_flow().target_pack_id(), Some("Q"));

    h.user.set_received_packs(vec![owned("other"), owned("P")]);
    assert_eq!(
        h.store.on_received_packs_changed(&h.user.received_packs()),
        None
    );
    assert_eq!(h.store.history().depth(), 1);
    assert!(h.store.current_page().is_on_home_page());
    assert_eq!(h.store.view().purchase, PurchaseDialogView::Information);
}

#[tokio::test(start_paused = true)]
async fn failed_checkout_does_not_navigate_later() {
    let mut h = harness(loaded_user());
    h.billing.respond(Err(server_error()));
    h.store.select_private_pack(listing("P"));
    h.store
        .request_purchase()
        .await
        .expect_err("checkout request fails");

    h.user.set_received_packs(vec![owned("other"), owned("P")]);
    assert_eq!(
        h.store.on_received_packs_changed(&h.user.received_packs()),
        Some(FlowTransition::AlreadyOwned)
    );
    assert_eq!(h.store.history().depth(), 1);
    assert_eq!(h.store.view().purchase, PurchaseDialogView::Closed);
}
