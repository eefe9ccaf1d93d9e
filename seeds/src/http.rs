//! [`Gateway`] implementation over the HTTP gateway's REST endpoints.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

use crate::gateway::{Gateway, GatewayError, OperationRequest, UserProfile};
use crate::plan::{AccountKind, CardKind, OperationKind};

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// # Errors
    /// Errors when the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(HttpGateway {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        envelope: &str,
    ) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        entity_id(&body, envelope)
    }
}

fn from_reqwest(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Pulls `<envelope>.id` out of a creation response such as
/// `{"account": {"id": "...", ...}}`.
fn entity_id(body: &Value, envelope: &str) -> Result<String, GatewayError> {
    body.get(envelope)
        .and_then(|entity| entity.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Decode(format!("response has no `{envelope}.id`: {body}")))
}

fn account_path(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::DebitCard => "/api/v1/accounts/open-debit-card-account",
        AccountKind::CreditCard => "/api/v1/accounts/open-credit-card-account",
        AccountKind::Deposit => "/api/v1/accounts/open-deposit-account",
        AccountKind::Savings => "/api/v1/accounts/open-savings-account",
    }
}

fn card_path(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Virtual => "/api/v1/cards/issue-virtual-card",
        CardKind::Physical => "/api/v1/cards/issue-physical-card",
    }
}

fn operation_path(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Purchase => "/api/v1/operations/make-purchase-operation",
        OperationKind::TopUp => "/api/v1/operations/make-top-up-operation",
        OperationKind::Cashback => "/api/v1/operations/make-cashback-operation",
        OperationKind::Transfer => "/api/v1/operations/make-transfer-operation",
        OperationKind::BillPayment => "/api/v1/operations/make-bill-payment-operation",
        OperationKind::CashWithdrawal => "/api/v1/operations/make-cash-withdrawal-operation",
        OperationKind::Fee => "/api/v1/operations/make-fee-operation",
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn create_user(&self, profile: &UserProfile) -> Result<String, GatewayError> {
        self.post("/api/v1/users", profile, "user").await
    }

    async fn open_account(
        &self,
        user_id: &str,
        kind: AccountKind,
    ) -> Result<String, GatewayError> {
        let body = json!({ "userId": user_id });
        self.post(account_path(kind), &body, "account").await
    }

    async fn issue_card(
        &self,
        user_id: &str,
        account_id: &str,
        kind: CardKind,
    ) -> Result<String, GatewayError> {
        let body = json!({ "userId": user_id, "accountId": account_id });
        self.post(card_path(kind), &body, "card").await
    }

    async fn make_operation(&self, request: &OperationRequest) -> Result<String, GatewayError> {
        self.post(operation_path(request.kind), request, "operation")
            .await
    }
}
