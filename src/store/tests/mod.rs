mod purchase;

use std::sync::Arc;

use crate::catalog::fixtures::owned;
use crate::config::PurchaseConfig;
use crate::purchase::FlowServices;
use crate::session::UserContext;
use crate::store::AssetStoreController;
use crate::testing::{FakeBilling, FakeCatalog, RecordingOpener, logged_in_user};

struct Harness {
    store: AssetStoreController,
    billing: Arc<FakeBilling>,
    opener: Arc<RecordingOpener>,
    user: UserContext,
}

fn harness(user: UserContext) -> Harness {
    let billing = Arc::new(FakeBilling::default());
    let opener = Arc::new(RecordingOpener::default());
    let store = AssetStoreController::new(
        FlowServices {
            billing: billing.clone(),
            catalog: Arc::new(FakeCatalog::default()),
            opener: opener.clone(),
        },
        user.clone(),
        PurchaseConfig::default(),
    );
    Harness {
        store,
        billing,
        opener,
        user,
    }
}

/// Logged in and owning pack `P`.
fn owner_of_p() -> UserContext {
    let user = logged_in_user();
    user.set_received_packs(vec![owned("P")]);
    user
}
