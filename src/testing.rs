use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::UserPurchase;
use crate::error::{AppResult, ServiceError};
use crate::services::{BillingService, CheckoutRequest, PurchaseCatalog, PurchaseQuery, UrlOpener};
use crate::session::{Profile, UserContext};

pub(crate) fn test_profile() -> Profile {
    Profile {
        id: "user-1".to_string(),
        email: "user@example.com".to_string(),
    }
}

pub(crate) fn logged_in_user() -> UserContext {
    UserContext::logged_in(test_profile(), "token")
}

pub(crate) fn wrong_password() -> ServiceError {
    ServiceError::status(
        "create checkout session",
        403,
        Some("auth/wrong-password".to_string()),
        "{}",
    )
}

pub(crate) fn server_error() -> ServiceError {
    ServiceError::status("test", 500, None, "boom")
}

#[derive(Default)]
pub(crate) struct FakeBilling {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    requests: Mutex<Vec<CheckoutRequest>>,
}

impl FakeBilling {
    pub(crate) fn respond(&self, response: Result<String, ServiceError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl BillingService for FakeBilling {
    async fn get_checkout_url(
        &self,
        _authorization: &str,
        request: &CheckoutRequest,
    ) -> Result<String, ServiceError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Ok("https://checkout.example/session".to_string()))
    }
}

/// Scripted purchase listing. Once the script runs out every call returns
/// an empty list.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    responses: Mutex<VecDeque<Result<Vec<UserPurchase>, ServiceError>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl FakeCatalog {
    pub(crate) fn respond(&self, response: Result<Vec<UserPurchase>, ServiceError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency lock") = Some(latency);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PurchaseCatalog for FakeCatalog {
    async fn list_user_purchases(
        &self,
        _authorization: &str,
        _query: &PurchaseQuery,
    ) -> Result<Vec<UserPurchase>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().expect("latency lock");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let response = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

#[derive(Default)]
pub(crate) struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

impl UrlOpener for RecordingOpener {
    fn open_external_url(&self, url: &str) -> AppResult<()> {
        self.opened
            .lock()
            .expect("opened lock")
            .push(url.to_string());
        Ok(())
    }
}
