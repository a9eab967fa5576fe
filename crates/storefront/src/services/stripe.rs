//! Stripe API client for payment intents.
//!
//! Talks to the Stripe REST API directly with form-encoded requests. Each
//! payment intent is attached to a Stripe customer keyed by phone number,
//! which is created or updated before the intent.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use nightowl_core::{CustomerInfo, summarize_items};

use super::{PaymentError, PaymentIntent, PaymentProcessor, PaymentRequest, PaymentStatus};
use crate::config::StripeConfig;

/// Pinned API version.
const API_VERSION: &str = "2024-06-20";

/// Stripe limits metadata values to 500 characters.
const METADATA_VALUE_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
    status: PaymentStatus,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }

    /// Find a customer by phone, then update them, or create a new one.
    ///
    /// # Errors
    ///
    /// Returns error if any API request fails.
    #[instrument(skip_all)]
    pub async fn upsert_customer(&self, customer: &CustomerInfo) -> Result<String, PaymentError> {
        let query = format!("phone:'{}'", customer.phone.as_str().replace('\'', ""));
        let response = self
            .client
            .get(self.url("customers/search"))
            .query(&[("query", query.as_str()), ("limit", "1")])
            .send()
            .await?;
        let existing: SearchResult<Customer> = parse(response).await?;

        let path = match existing.data.into_iter().next() {
            Some(found) => format!("customers/{}", found.id),
            None => "customers".to_string(),
        };

        let form = [
            ("name", customer.name.as_str()),
            ("phone", customer.phone.as_str()),
            ("address[line1]", customer.address.as_str()),
            ("shipping[name]", customer.name.as_str()),
            ("shipping[address][line1]", customer.address.as_str()),
        ];
        let response = self.client.post(self.url(&path)).form(&form).send().await?;
        let saved: Customer = parse(response).await?;

        Ok(saved.id)
    }
}

impl PaymentProcessor for StripeClient {
    #[instrument(skip_all, fields(amount_minor = request.amount_minor))]
    async fn create_payment_intent(
        &self,
        request: &PaymentRequest<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        let customer_id = self.upsert_customer(request.customer).await?;
        let customer = request.customer;

        let items = summarize_items(request.items, request.amount.currency_code.symbol()).join(", ");
        let items: String = items.chars().take(METADATA_VALUE_LIMIT).collect();
        let amount = request.amount_minor.to_string();

        let form = [
            ("amount", amount.as_str()),
            ("currency", request.amount.currency_code.code()),
            ("customer", customer_id.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
            ("shipping[name]", customer.name.as_str()),
            ("shipping[address][line1]", customer.address.as_str()),
            ("metadata[customerName]", customer.name.as_str()),
            ("metadata[customerPhone]", customer.phone.as_str()),
            ("metadata[customerAddress]", customer.address.as_str()),
            ("metadata[orderItems]", items.as_str()),
        ];

        let response = self
            .client
            .post(self.url("payment_intents"))
            .form(&form)
            .send()
            .await?;
        let intent: IntentResponse = parse(response).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Parse("payment intent has no client secret".into()))?;

        tracing::info!(payment_intent_id = %intent.id, "Payment intent created");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn payment_status(&self, payment_intent_id: &str) -> Result<PaymentStatus, PaymentError> {
        let response = self
            .client
            .get(self.url(&format!("payment_intents/{payment_intent_id}")))
            .send()
            .await?;
        let intent: IntentResponse = parse(response).await?;
        Ok(intent.status)
    }

    #[instrument(skip(self))]
    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<(), PaymentError> {
        let response = self
            .client
            .post(self.url(&format!("payment_intents/{payment_intent_id}/cancel")))
            .send()
            .await?;
        let _: IntentResponse = parse(response).await?;
        Ok(())
    }
}

/// Decode a success body, or turn an error body into `PaymentError`.
async fn parse<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body).ok().map(|b| b.error);
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or(body);

        if detail.and_then(|d| d.code).as_deref() == Some("card_declined") {
            return Err(PaymentError::Declined(message));
        }
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_deserializes() {
        let intent: IntentResponse = serde_json::from_str(
            r#"{"id":"pi_123","client_secret":"pi_123_secret_abc","status":"requires_payment_method"}"#,
        )
        .unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.status, PaymentStatus::RequiresPaymentMethod);
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let intent: IntentResponse =
            serde_json::from_str(r#"{"id":"pi_1","client_secret":null,"status":"brand_new"}"#)
                .unwrap();
        assert_eq!(intent.status, PaymentStatus::Unknown);
        assert!(intent.client_secret.is_none());
    }

    #[test]
    fn test_error_body_deserializes() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":{"code":"card_declined","message":"Your card was declined.","type":"card_error"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.code.as_deref(), Some("card_declined"));
    }

    #[test]
    fn test_api_base_trailing_slash_is_trimmed() {
        let client = StripeClient::new(&StripeConfig {
            secret_key: secrecy::SecretString::from("sk_test_51HxyzAbCdEfGhIjKlMnOp"),
            api_base: "http://localhost:12111/".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.url("payment_intents"),
            "http://localhost:12111/v1/payment_intents"
        );
    }
}
