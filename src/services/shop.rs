use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{BillingService, CheckoutRequest, PurchaseCatalog, PurchaseQuery};
use crate::catalog::UserPurchase;
use crate::config::ServicesConfig;
use crate::error::{AppError, AppResult, ServiceError};

const CHECKOUT_OPERATION: &str = "create checkout session";
const LIST_PURCHASES_OPERATION: &str = "list user purchases";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionBody<'a> {
    stripe_price_id: &'a str,
    customer_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionResponse {
    session_url: Option<String>,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    code: Option<String>,
}

/// HTTP client for the shop API: checkout sessions and purchase listing.
#[derive(Clone)]
pub struct ShopClient {
    http: reqwest::Client,
    base_url: String,
}

impl ShopClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> AppResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout.max(Duration::from_millis(1)))
            .build()
            .map_err(|err| AppError::config(format!("failed to create shop client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(services: &ServicesConfig) -> AppResult<Self> {
        Self::new(services.shop_base_url.clone(), services.request_timeout())
    }

    async fn read_json<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ServiceError::transport(operation, err))?;
        if !status.is_success() {
            let code = serde_json::from_str::<ServiceErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.code);
            return Err(ServiceError::status(
                operation,
                status.as_u16(),
                code,
                truncate_for_error(&body, 512),
            ));
        }
        serde_json::from_str(&body).map_err(|err| ServiceError::decode(operation, err.to_string()))
    }
}

#[async_trait]
impl BillingService for ShopClient {
    async fn get_checkout_url(
        &self,
        authorization: &str,
        request: &CheckoutRequest,
    ) -> Result<String, ServiceError> {
        let body = CheckoutSessionBody {
            stripe_price_id: &request.price_id,
            customer_email: &request.customer_email,
            password: request.password.as_deref(),
        };
        let response = self
            .http
            .post(format!(
                "{}/purchase/action/create-stripe-checkout-session",
                self.base_url
            ))
            .query(&[("userId", request.user_id.as_str())])
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::transport(CHECKOUT_OPERATION, err))?;

        let parsed: CheckoutSessionResponse = Self::read_json(CHECKOUT_OPERATION, response).await?;
        parsed
            .session_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ServiceError::decode(CHECKOUT_OPERATION, "missing sessionUrl"))
    }
}

#[async_trait]
impl PurchaseCatalog for ShopClient {
    async fn list_user_purchases(
        &self,
        authorization: &str,
        query: &PurchaseQuery,
    ) -> Result<Vec<UserPurchase>, ServiceError> {
        let response = self
            .http
            .get(format!("{}/purchase", self.base_url))
            .query(&[
                ("userId", query.user_id.as_str()),
                ("productType", query.product_type.as_str()),
                ("role", query.role),
            ])
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| ServiceError::transport(LIST_PURCHASES_OPERATION, err))?;

        Self::read_json(LIST_PURCHASES_OPERATION, response).await
    }
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
