use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::plan::{AccountKind, CardKind, OperationKind};
use crate::result::OperationStatus;
use crate::retry::Retryable;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Gateway responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed gateway response: {0}")]
    Decode(String),
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Timeout => true,
            GatewayError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            GatewayError::Decode(_) => false,
        }
    }
}

/// Body of a user creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub phone_number: String,
}

impl UserProfile {
    /// A throwaway profile with a unique email, as every created user must be
    /// distinguishable on the remote side.
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut word = |len: usize| -> String {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect()
        };
        let email = format!("user.{}@example.com", uuid::Uuid::new_v4().simple());
        let last_name = word(10);
        let first_name = word(8);
        let middle_name = word(8);
        let phone_number = format!("+7{:010}", rng.gen_range(0..10_000_000_000_u64));
        UserProfile {
            email,
            last_name,
            first_name,
            middle_name,
            phone_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    #[serde(skip)]
    pub kind: OperationKind,
    pub status: OperationStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub card_id: String,
    pub account_id: String,
    /// Merchant category, required by purchases only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

const PURCHASE_CATEGORIES: [&str; 6] = [
    "groceries",
    "restaurants",
    "transport",
    "electronics",
    "clothing",
    "entertainment",
];

/// Random merchant category for purchases, `None` for every other kind.
#[must_use]
pub fn operation_category(kind: OperationKind) -> Option<String> {
    match kind {
        OperationKind::Purchase => {
            let index = rand::thread_rng().gen_range(0..PURCHASE_CATEGORIES.len());
            Some(PURCHASE_CATEGORIES[index].to_string())
        }
        _ => None,
    }
}

/// Remote creation calls the builder depends on. Implementations must be
/// safe to call from many tasks at once.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn create_user(&self, profile: &UserProfile) -> Result<String, GatewayError>;

    async fn open_account(&self, user_id: &str, kind: AccountKind)
        -> Result<String, GatewayError>;

    async fn issue_card(
        &self,
        user_id: &str,
        account_id: &str,
        kind: CardKind,
    ) -> Result<String, GatewayError>;

    async fn make_operation(&self, request: &OperationRequest) -> Result<String, GatewayError>;
}
