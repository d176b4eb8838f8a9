use std::sync::Arc;

use crate::catalog::{
    AssetPackKind, AssetPackListingData, AssetShortHeader, OpenedPack, PublicAssetPack,
    PublicAssetPacks, identify_asset_pack_kind,
};
use crate::config::PurchaseConfig;
use crate::error::AppResult;
use crate::history::{FiltersState, NavOutcome, NavigationHistory, Page};
use crate::logging::ANALYTICS_TARGET;
use crate::purchase::{
    BeginOutcome, FlowEvent, FlowServices, FlowTransition, PurchaseDialogView,
    PurchaseFlowController, PurchaseStatus,
};
use crate::services::UrlOpener;
use crate::session::{
    ReceivedPacksSnapshot, UserContext, find_received_pack, find_received_pack_by_tag,
};

/// Catalog data the store browses. Both lists are `None` until fetched.
#[derive(Debug, Clone, Default)]
pub struct StoreCatalog {
    pub public_asset_packs: Option<PublicAssetPacks>,
    pub private_asset_pack_listings: Option<Vec<AssetPackListingData>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackSelection {
    OpenedExternalLink,
    OpenedPackPage,
    PurchaseDialogOpened,
    /// The pack became owned while the dialog was being opened; nothing
    /// was shown.
    AlreadyOwned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreView<'a> {
    pub page: &'a Page,
    pub filters_panel_open: bool,
    pub search_text: &'a str,
    pub purchase: PurchaseDialogView,
}

pub struct AssetStoreController {
    history: NavigationHistory,
    purchase: PurchaseFlowController,
    user: UserContext,
    opener: Arc<dyn UrlOpener>,
    catalog: StoreCatalog,
    asset_filters: FiltersState,
    filters_panel_open: bool,
    search_text: String,
    visible_scroll: Option<f64>,
    scroll_update_needed: bool,
    purchasing_pack_id: Option<String>,
}

impl AssetStoreController {
    pub fn new(services: FlowServices, user: UserContext, config: PurchaseConfig) -> Self {
        let opener = Arc::clone(&services.opener);
        let history = NavigationHistory::new();
        let current = history.current();
        let filters_panel_open =
            !current.is_on_home_page() && current.opened_asset_short_header().is_none();
        Self {
            purchase: PurchaseFlowController::new(services, user.clone(), config),
            history,
            user,
            opener,
            catalog: StoreCatalog::default(),
            asset_filters: FiltersState::default(),
            filters_panel_open,
            search_text: String::new(),
            visible_scroll: None,
            scroll_update_needed: false,
            purchasing_pack_id: None,
        }
    }

    pub fn set_catalog(&mut self, catalog: StoreCatalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &StoreCatalog {
        &self.catalog
    }

    pub fn current_page(&self) -> &Page {
        self.history.current()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn asset_filters(&self) -> &FiltersState {
        &self.asset_filters
    }

    pub fn asset_filters_mut(&mut self) -> &mut FiltersState {
        &mut self.asset_filters
    }

    pub fn is_filters_panel_open(&self) -> bool {
        self.filters_panel_open
    }

    pub fn set_filters_panel_open(&mut self, open: bool) {
        self.filters_panel_open = open;
    }

    pub fn purchase_flow(&self) -> &PurchaseFlowController {
        &self.purchase
    }

    pub fn purchase_flow_mut(&mut self) -> &mut PurchaseFlowController {
        &mut self.purchase
    }

    pub fn view(&self) -> StoreView<'_> {
        StoreView {
            page: self.history.current(),
            filters_panel_open: self.filters_panel_open,
            search_text: &self.search_text,
            purchase: self.purchase.view(),
        }
    }

    /// The visible list reports its offset as the user scrolls.
    pub fn report_scroll_position(&mut self, offset: f64) {
        self.visible_scroll = Some(offset);
    }

    pub fn save_scroll_position(&mut self) {
        if let Some(offset) = self.visible_scroll {
            self.history.save_scroll_position(offset);
        }
    }

    /// Offset to restore after a navigation, handed out once. The restored
    /// offset becomes the visible one until the view reports another.
    pub fn take_scroll_to_apply(&mut self) -> Option<f64> {
        if !self.scroll_update_needed {
            return None;
        }
        self.scroll_update_needed = false;
        let offset = self.history.take_scroll_position();
        self.visible_scroll = offset;
        offset
    }

    /// Called when the store panel closes so reopening lands where the user was.
    pub fn on_close(&mut self) {
        self.save_scroll_position();
    }

    pub fn identify_asset_pack_kind(&self, pack: Option<&OpenedPack>) -> AssetPackKind {
        identify_asset_pack_kind(
            self.catalog.private_asset_pack_listings.as_deref(),
            self.catalog.public_asset_packs.as_ref(),
            pack,
        )
    }

    pub fn select_public_pack(&mut self, pack: PublicAssetPack) -> AppResult<PackSelection> {
        tracing::info!(
            target: ANALYTICS_TARGET,
            event = "asset_pack_opened",
            asset_pack_tag = %pack.tag,
            asset_pack_name = %pack.name,
            asset_pack_kind = AssetPackKind::Public.id(),
        );

        if let Some(link) = pack.external_web_link.as_deref() {
            self.opener.open_external_url(link)?;
            return Ok(PackSelection::OpenedExternalLink);
        }
        self.navigate(|history| history.open_pack(OpenedPack::Public(pack)));
        self.filters_panel_open = true;
        Ok(PackSelection::OpenedPackPage)
    }

    /// Opens an owned pack, or the purchase dialog when the user lacks it.
    pub fn select_private_pack(&mut self, listing: AssetPackListingData) -> PackSelection {
        let snapshot = self.user.received_packs();
        let Some(received) = find_received_pack(&snapshot, &listing.id).cloned() else {
            tracing::info!(
                target: ANALYTICS_TARGET,
                event = "asset_pack_information_opened",
                asset_pack_id = %listing.id,
                asset_pack_name = %listing.name,
                asset_pack_kind = AssetPackKind::Private.id(),
            );
            self.purchasing_pack_id = None;
            return match self.purchase.begin(listing) {
                BeginOutcome::Started => PackSelection::PurchaseDialogOpened,
                BeginOutcome::AlreadyOwned => PackSelection::AlreadyOwned,
            };
        };

        tracing::info!(
            target: ANALYTICS_TARGET,
            event = "asset_pack_opened",
            asset_pack_id = %listing.id,
            asset_pack_name = %listing.name,
            asset_pack_kind = AssetPackKind::Private.id(),
        );
        self.navigate(|history| history.open_pack(OpenedPack::Private(received)));
        self.filters_panel_open = true;
        PackSelection::OpenedPackPage
    }

    /// Tag clicked on an asset: owned packs first, then public starter
    /// packs, then a plain tag page.
    pub fn select_tag(&mut self, tag: &str) {
        let snapshot = self.user.received_packs();
        let target = if let Some(owned) = find_received_pack_by_tag(&snapshot, tag) {
            Some(OpenedPack::Private(owned.clone()))
        } else {
            self.catalog
                .public_asset_packs
                .as_ref()
                .and_then(|packs| packs.find_by_tag(tag))
                .map(|pack| OpenedPack::Public(pack.clone()))
        };

        self.navigate(|history| match target {
            Some(pack) => history.open_pack(pack),
            None => history.open_tag(tag),
        });
        self.asset_filters.clear_all();
        self.filters_panel_open = true;
    }

    pub fn open_details(&mut self, asset: AssetShortHeader) {
        let opened_pack = self.history.current().opened_asset_pack();
        let kind = self.identify_asset_pack_kind(opened_pack);
        tracing::info!(
            target: ANALYTICS_TARGET,
            event = "asset_opened",
            asset_id = %asset.id,
            asset_name = %asset.name,
            asset_pack_name = opened_pack.map(OpenedPack::name),
            asset_pack_tag = opened_pack.map(OpenedPack::tag),
            asset_pack_id = opened_pack.and_then(OpenedPack::id),
            asset_pack_kind = kind.id(),
        );
        self.navigate(|history| history.open_detail(asset));
    }

    pub fn open_home(&mut self) {
        self.navigate(NavigationHistory::open_home);
        self.asset_filters.clear_all();
        self.filters_panel_open = false;
    }

    /// Starts a free-text search from a clean slate.
    pub fn activate_search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.history.clear();
        self.history.activate_textual_search();
        self.visible_scroll = None;
        self.mark_scroll_update_needed();
        self.filters_panel_open = true;
    }

    pub fn back(&mut self) -> NavOutcome {
        let outcome = self.history.back();
        if outcome == NavOutcome::Applied {
            self.visible_scroll = None;
            self.mark_scroll_update_needed();
        }
        if self.history.current().is_on_home_page() {
            self.asset_filters.clear_all();
            self.filters_panel_open = false;
        }
        outcome
    }

    pub async fn request_purchase(&mut self) -> AppResult<FlowTransition> {
        self.purchasing_pack_id = self.purchase.target_pack_id().map(str::to_string);
        let result = self.purchase.request_purchase().await;
        if result.is_err() {
            self.purchasing_pack_id = None;
        }
        result
    }

    pub async fn submit_password(
        &mut self,
        password: impl Into<String>,
    ) -> AppResult<FlowTransition> {
        let result = self.purchase.submit_password(password).await;
        if result.is_err() {
            self.purchasing_pack_id = None;
        }
        result
    }

    pub fn dismiss_purchase(&mut self) {
        self.purchase.dismiss();
        self.purchasing_pack_id = None;
    }

    pub fn handle_flow_event(&mut self, event: FlowEvent) -> Option<FlowTransition> {
        self.purchase.handle_event(event)
    }

    /// Feeds a received-packs update to the purchase flow, then opens the
    /// pack being bought once it shows up as owned.
    pub fn on_received_packs_changed(
        &mut self,
        snapshot: &ReceivedPacksSnapshot,
    ) -> Option<FlowTransition> {
        let pending = self.pending_purchase_pack_id();
        let transition = self.purchase.on_received_packs_changed(snapshot);

        let Some(pack_id) = pending else {
            return transition;
        };
        let on_pack_page = self
            .history
            .current()
            .opened_asset_pack()
            .and_then(OpenedPack::id)
            == Some(pack_id.as_str());
        if on_pack_page {
            return transition;
        }
        if let Some(received) = find_received_pack(snapshot, &pack_id).cloned() {
            self.filters_panel_open = true;
            self.navigate(|history| history.open_pack(OpenedPack::Private(received)));
            self.purchasing_pack_id = None;
        }
        transition
    }

    /// The pack whose purchase is under way in the open dialog, if any.
    fn pending_purchase_pack_id(&self) -> Option<String> {
        let pack_id = self.purchasing_pack_id.as_deref()?;
        let status = self.purchase.status();
        let in_dialog = self.purchase.target_pack_id() == Some(pack_id)
            && (status.is_purchasing() || status == PurchaseStatus::Succeeded);
        in_dialog.then(|| pack_id.to_string())
    }

    fn navigate(&mut self, push: impl FnOnce(&mut NavigationHistory)) {
        self.save_scroll_position();
        push(&mut self.history);
        self.visible_scroll = None;
        self.mark_scroll_update_needed();
    }

    fn mark_scroll_update_needed(&mut self) {
        self.scroll_update_needed = true;
    }
}
