use crate::catalog::AssetPackListingData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    Idle,
    AwaitingPassword,
    CheckoutOpened,
    Polling,
    Succeeded,
    Failed,
}

impl PurchaseStatus {
    pub fn is_purchasing(self) -> bool {
        matches!(self, Self::CheckoutOpened | Self::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The dev-mode password gate rejected the shared secret.
    Authorization,
    CheckoutRequest,
}

/// One purchase of one pack, alive while its dialog is open.
#[derive(Clone)]
pub struct PurchaseAttempt {
    pub(super) status: PurchaseStatus,
    pub(super) target_pack: AssetPackListingData,
    pub(super) password: String,
    pub(super) failure: Option<FailureKind>,
    pub(super) checking_after_login: bool,
}

impl PurchaseAttempt {
    pub(super) fn new(target_pack: AssetPackListingData, checking_after_login: bool) -> Self {
        Self {
            status: PurchaseStatus::Idle,
            target_pack,
            password: String::new(),
            failure: None,
            checking_after_login,
        }
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn target_pack(&self) -> &AssetPackListingData {
        &self.target_pack
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn is_checking_purchases_after_login(&self) -> bool {
        self.checking_after_login
    }
}

impl std::fmt::Debug for PurchaseAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseAttempt")
            .field("status", &self.status)
            .field("target_pack", &self.target_pack.id)
            .field("password_set", &!self.password.is_empty())
            .field("failure", &self.failure)
            .field("checking_after_login", &self.checking_after_login)
            .finish()
    }
}

/// What the purchase dialog should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseDialogView {
    Closed,
    LoginRequired,
    CheckingPurchases,
    Information,
    PasswordPrompt,
    Purchasing,
    Succeeded,
    Failed(FailureKind),
}

#[cfg(test)]
mod tests {
    use super::{PurchaseAttempt, PurchaseStatus};
    use crate::catalog::fixtures::listing;

    #[test]
    fn debug_output_never_contains_password() {
        let mut attempt = PurchaseAttempt::new(listing("p1"), false);
        attempt.password = "hunter2".to_string();
        let rendered = format!("{attempt:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password_set: true"));
    }

    #[test]
    fn only_checkout_and_polling_count_as_purchasing() {
        assert!(PurchaseStatus::Polling.is_purchasing());
        assert!(PurchaseStatus::CheckoutOpened.is_purchasing());
        assert!(!PurchaseStatus::AwaitingPassword.is_purchasing());
        assert!(!PurchaseStatus::Succeeded.is_purchasing());
    }
}
