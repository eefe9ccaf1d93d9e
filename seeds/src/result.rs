//! The materialized counterpart of a [`SeedsPlan`](crate::plan::SeedsPlan):
//! same nesting, identifiers instead of counts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::plan::{AccountKind, CardKind, OperationKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    InProgress,
    #[default]
    Completed,
    Failed,
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCardResult {
    pub card_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOperationResult {
    pub operation_id: String,
    pub card_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub status: OperationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedAccountResult {
    pub account_id: String,
    pub virtual_cards: Vec<SeedCardResult>,
    pub physical_cards: Vec<SeedCardResult>,
    pub purchase_operations: Vec<SeedOperationResult>,
    pub top_up_operations: Vec<SeedOperationResult>,
    pub cashback_operations: Vec<SeedOperationResult>,
    pub transfer_operations: Vec<SeedOperationResult>,
    pub bill_payment_operations: Vec<SeedOperationResult>,
    pub cash_withdrawal_operations: Vec<SeedOperationResult>,
    pub fee_operations: Vec<SeedOperationResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedUserResult {
    pub user_id: String,
    pub debit_card_accounts: Vec<SeedAccountResult>,
    pub credit_card_accounts: Vec<SeedAccountResult>,
    pub deposit_accounts: Vec<SeedAccountResult>,
    pub savings_accounts: Vec<SeedAccountResult>,
}

impl SeedAccountResult {
    #[must_use]
    pub fn new(account_id: impl Into<String>) -> Self {
        SeedAccountResult {
            account_id: account_id.into(),
            ..SeedAccountResult::default()
        }
    }

    #[must_use]
    pub fn cards(&self, kind: CardKind) -> &[SeedCardResult] {
        match kind {
            CardKind::Virtual => &self.virtual_cards,
            CardKind::Physical => &self.physical_cards,
        }
    }

    #[must_use]
    pub fn operations(&self, kind: OperationKind) -> &[SeedOperationResult] {
        match kind {
            OperationKind::Purchase => &self.purchase_operations,
            OperationKind::TopUp => &self.top_up_operations,
            OperationKind::Cashback => &self.cashback_operations,
            OperationKind::Transfer => &self.transfer_operations,
            OperationKind::BillPayment => &self.bill_payment_operations,
            OperationKind::CashWithdrawal => &self.cash_withdrawal_operations,
            OperationKind::Fee => &self.fee_operations,
        }
    }

    pub(crate) fn cards_mut(&mut self, kind: CardKind) -> &mut Vec<SeedCardResult> {
        match kind {
            CardKind::Virtual => &mut self.virtual_cards,
            CardKind::Physical => &mut self.physical_cards,
        }
    }

    pub(crate) fn operations_mut(&mut self, kind: OperationKind) -> &mut Vec<SeedOperationResult> {
        match kind {
            OperationKind::Purchase => &mut self.purchase_operations,
            OperationKind::TopUp => &mut self.top_up_operations,
            OperationKind::Cashback => &mut self.cashback_operations,
            OperationKind::Transfer => &mut self.transfer_operations,
            OperationKind::BillPayment => &mut self.bill_payment_operations,
            OperationKind::CashWithdrawal => &mut self.cash_withdrawal_operations,
            OperationKind::Fee => &mut self.fee_operations,
        }
    }

    /// Every issued card regardless of kind, virtual cards first.
    pub fn all_cards(&self) -> impl Iterator<Item = &SeedCardResult> + '_ {
        CardKind::ALL.into_iter().flat_map(move |kind| self.cards(kind))
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        CardKind::ALL.iter().map(|&kind| self.cards(kind).len()).sum()
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        OperationKind::ALL
            .iter()
            .map(|&kind| self.operations(kind).len())
            .sum()
    }
}

impl SeedUserResult {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        SeedUserResult {
            user_id: user_id.into(),
            ..SeedUserResult::default()
        }
    }

    #[must_use]
    pub fn accounts(&self, kind: AccountKind) -> &[SeedAccountResult] {
        match kind {
            AccountKind::DebitCard => &self.debit_card_accounts,
            AccountKind::CreditCard => &self.credit_card_accounts,
            AccountKind::Deposit => &self.deposit_accounts,
            AccountKind::Savings => &self.savings_accounts,
        }
    }

    pub(crate) fn accounts_mut(&mut self, kind: AccountKind) -> &mut Vec<SeedAccountResult> {
        match kind {
            AccountKind::DebitCard => &mut self.debit_card_accounts,
            AccountKind::CreditCard => &mut self.credit_card_accounts,
            AccountKind::Deposit => &mut self.deposit_accounts,
            AccountKind::Savings => &mut self.savings_accounts,
        }
    }

    /// Every account regardless of kind, in [`AccountKind::ALL`] order.
    pub fn all_accounts(&self) -> impl Iterator<Item = &SeedAccountResult> + '_ {
        AccountKind::ALL
            .into_iter()
            .flat_map(move |kind| self.accounts(kind))
    }

    #[must_use]
    pub fn has_account(&self, kind: AccountKind) -> bool {
        !self.accounts(kind).is_empty()
    }

    #[must_use]
    pub fn has_card(&self, kind: CardKind) -> bool {
        self.all_accounts()
            .any(|account| !account.cards(kind).is_empty())
    }

    #[must_use]
    pub fn has_operation(&self, kind: OperationKind) -> bool {
        self.all_accounts()
            .any(|account| !account.operations(kind).is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_accessors() {
        let mut account = SeedAccountResult::new("acc-1");
        account.cards_mut(CardKind::Virtual).push(SeedCardResult {
            card_id: "card-1".to_string(),
        });
        account
            .operations_mut(OperationKind::Fee)
            .push(SeedOperationResult {
                operation_id: "op-1".to_string(),
                card_id: "card-1".to_string(),
                amount: Decimal::new(1250, 2),
                status: OperationStatus::Completed,
            });
        assert_eq!(account.card_count(), 1);
        assert_eq!(account.operation_count(), 1);
        assert_eq!(account.fee_operations.len(), 1);

        let mut user = SeedUserResult::new("user-1");
        user.accounts_mut(AccountKind::Savings).push(account);
        assert!(user.has_account(AccountKind::Savings));
        assert!(!user.has_account(AccountKind::Deposit));
        assert!(user.has_card(CardKind::Virtual));
        assert!(!user.has_card(CardKind::Physical));
        assert!(user.has_operation(OperationKind::Fee));
        assert!(!user.has_operation(OperationKind::Purchase));
    }

    #[test]
    fn test_operation_wire_format() {
        let operation = SeedOperationResult {
            operation_id: "op-1".to_string(),
            card_id: "card-1".to_string(),
            amount: Decimal::new(1250, 2),
            status: OperationStatus::InProgress,
        };
        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["amount"], "12.50");
        assert_eq!(json["status"], "IN_PROGRESS");
    }
}
