mod opener;
mod shop;
mod traits;

pub use opener::SystemUrlOpener;
pub use shop::ShopClient;
pub use traits::{
    BillingService, CheckoutRequest, PurchaseCatalog, PurchaseQuery, RECEIVER_ROLE, UrlOpener,
};
