use async_trait::async_trait;

use crate::catalog::{ASSET_PACK_PRODUCT_TYPE, UserPurchase};
use crate::error::{AppResult, ServiceError};

#[derive(Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub user_id: String,
    pub customer_email: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for CheckoutRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutRequest")
            .field("price_id", &self.price_id)
            .field("user_id", &self.user_id)
            .field("customer_email", &self.customer_email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Purchases where the user is the one who received the product.
pub const RECEIVER_ROLE: &str = "receiver";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseQuery {
    pub user_id: String,
    pub product_type: String,
    pub role: &'static str,
}

impl PurchaseQuery {
    /// Asset packs the user received, bought or gifted.
    pub fn received_asset_packs(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            product_type: ASSET_PACK_PRODUCT_TYPE.to_string(),
            role: RECEIVER_ROLE,
        }
    }
}

#[async_trait]
pub trait BillingService: Send + Sync {
    async fn get_checkout_url(
        &self,
        authorization: &str,
        request: &CheckoutRequest,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait PurchaseCatalog: Send + Sync {
    async fn list_user_purchases(
        &self,
        authorization: &str,
        query: &PurchaseQuery,
    ) -> Result<Vec<UserPurchase>, ServiceError>;
}

pub trait UrlOpener: Send + Sync {
    fn open_external_url(&self, url: &str) -> AppResult<()>;
}
