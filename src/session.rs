//! Authenticated-user context shared by the store and the purchase flow.
//!
//! The context is the single owner of the profile and of the received
//! packs. Controllers read it and subscribe to changes; they never write
//! the received packs back.

use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::PrivateAssetPack;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
}

/// Packs the user owns. `None` until the first load after login.
pub type ReceivedPacksSnapshot = Option<Arc<[PrivateAssetPack]>>;

pub fn find_received_pack<'a>(
    snapshot: &'a ReceivedPacksSnapshot,
    pack_id: &str,
) -> Option<&'a PrivateAssetPack> {
    snapshot
        .as_deref()
        .and_then(|packs| packs.iter().find(|pack| pack.id == pack_id))
}

pub fn find_received_pack_by_tag<'a>(
    snapshot: &'a ReceivedPacksSnapshot,
    tag: &str,
) -> Option<&'a PrivateAssetPack> {
    snapshot
        .as_deref()
        .and_then(|packs| packs.iter().find(|pack| pack.tag == tag))
}

#[derive(Debug, Clone, Default)]
struct UserState {
    profile: Option<Profile>,
    auth_token: Option<String>,
    received_packs: ReceivedPacksSnapshot,
}

#[derive(Clone)]
pub struct UserContext {
    state: Arc<watch::Sender<UserState>>,
    packs: Arc<watch::Sender<ReceivedPacksSnapshot>>,
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserContext")
            .field("profile", &self.profile())
            .field("received_packs", &self.received_packs().map(|packs| packs.len()))
            .finish_non_exhaustive()
    }
}

impl UserContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(UserState::default());
        let (packs, _) = watch::channel(None);
        Self {
            state: Arc::new(state),
            packs: Arc::new(packs),
        }
    }

    pub fn logged_in(profile: Profile, auth_token: impl Into<String>) -> Self {
        let context = Self::new();
        context.login(profile, auth_token);
        context
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().profile.is_some()
    }

    pub fn received_packs(&self) -> ReceivedPacksSnapshot {
        self.state.borrow().received_packs.clone()
    }

    /// Value sent as the `Authorization` header to the shop services.
    pub fn authorization_header(&self) -> AppResult<String> {
        let state = self.state.borrow();
        match (&state.profile, &state.auth_token) {
            (Some(_), Some(token)) => Ok(format!("Bearer {token}")),
            _ => Err(AppError::NotAuthenticated),
        }
    }

    pub fn login(&self, profile: Profile, auth_token: impl Into<String>) {
        let auth_token = auth_token.into();
        tracing::debug!(user_id = %profile.id, "user logged in");
        self.state.send_modify(|state| {
            state.profile = Some(profile);
            state.auth_token = Some(auth_token);
            state.received_packs = None;
        });
        self.packs.send_replace(None);
    }

    pub fn logout(&self) {
        self.state.send_modify(|state| *state = UserState::default());
        self.packs.send_replace(None);
    }

    /// Replaces the received packs, typically after a catalog refresh.
    pub fn set_received_packs(&self, packs: Vec<PrivateAssetPack>) {
        let snapshot: ReceivedPacksSnapshot = Some(packs.into());
        tracing::debug!(
            count = snapshot.as_deref().map_or(0, <[PrivateAssetPack]>::len),
            "received packs updated"
        );
        self.state
            .send_modify(|state| state.received_packs = snapshot.clone());
        self.packs.send_replace(snapshot);
    }

    /// Receives every received-packs change, including re-deliveries of an
    /// identical list.
    pub fn subscribe_received_packs(&self) -> watch::Receiver<ReceivedPacksSnapshot> {
        self.packs.subscribe()
    }
}
