//! Declarative, count-driven description of the entity graph a scenario needs.
//!
//! A plan is a tree: users own accounts (one slot per [`AccountKind`]), accounts
//! own cards (one slot per [`CardKind`]) and operations (one slot per
//! [`OperationKind`]). Every slot carries a count; a zero count disables the
//! slot together with everything nested under it.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    DebitCard,
    CreditCard,
    Deposit,
    Savings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Virtual,
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Purchase,
    TopUp,
    Cashback,
    Transfer,
    BillPayment,
    CashWithdrawal,
    Fee,
}

impl AccountKind {
    pub const ALL: [AccountKind; 4] = [
        AccountKind::DebitCard,
        AccountKind::CreditCard,
        AccountKind::Deposit,
        AccountKind::Savings,
    ];

    /// Name of the slot holding this kind, both in plans and in dumps.
    #[must_use]
    pub fn slot(self) -> &'static str {
        match self {
            AccountKind::DebitCard => "debit_card_accounts",
            AccountKind::CreditCard => "credit_card_accounts",
            AccountKind::Deposit => "deposit_accounts",
            AccountKind::Savings => "savings_accounts",
        }
    }
}

impl CardKind {
    pub const ALL: [CardKind; 2] = [CardKind::Virtual, CardKind::Physical];

    #[must_use]
    pub fn slot(self) -> &'static str {
        match self {
            CardKind::Virtual => "virtual_cards",
            CardKind::Physical => "physical_cards",
        }
    }
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Purchase,
        OperationKind::TopUp,
        OperationKind::Cashback,
        OperationKind::Transfer,
        OperationKind::BillPayment,
        OperationKind::CashWithdrawal,
        OperationKind::Fee,
    ];

    #[must_use]
    pub fn slot(self) -> &'static str {
        match self {
            OperationKind::Purchase => "purchase_operations",
            OperationKind::TopUp => "top_up_operations",
            OperationKind::Cashback => "cashback_operations",
            OperationKind::Transfer => "transfer_operations",
            OperationKind::BillPayment => "bill_payment_operations",
            OperationKind::CashWithdrawal => "cash_withdrawal_operations",
            OperationKind::Fee => "fee_operations",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot())
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slot())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedsPlan {
    users: UsersPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsersPlan {
    count: u32,
    debit_card_accounts: AccountsPlan,
    credit_card_accounts: AccountsPlan,
    deposit_accounts: AccountsPlan,
    savings_accounts: AccountsPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsPlan {
    count: u32,
    virtual_cards: CardsPlan,
    physical_cards: CardsPlan,
    purchase_operations: OperationsPlan,
    top_up_operations: OperationsPlan,
    cashback_operations: OperationsPlan,
    transfer_operations: OperationsPlan,
    bill_payment_operations: OperationsPlan,
    cash_withdrawal_operations: OperationsPlan,
    fee_operations: OperationsPlan,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardsPlan {
    count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationsPlan {
    count: u32,
}

impl SeedsPlan {
    #[must_use]
    pub fn new(users: UsersPlan) -> Self {
        SeedsPlan { users }
    }

    #[must_use]
    pub fn users(&self) -> &UsersPlan {
        &self.users
    }

    /// # Errors
    /// Errors when `json` is not a plan document or when any count is negative.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        let value: Value = serde_json::from_str(json)?;
        reject_negative_counts(&value, &mut Vec::new())?;
        Ok(serde_json::from_value(value)?)
    }

    /// # Errors
    /// Errors when the file cannot be read or does not hold a valid plan.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Number of remote creations the plan implies when nothing fails.
    #[must_use]
    pub fn total_entities(&self) -> u64 {
        let per_user: u64 = self
            .users
            .accounts()
            .map(|(_, accounts)| {
                let leaves: u64 = accounts.cards().map(|(_, n)| u64::from(n)).sum::<u64>()
                    + accounts.operations().map(|(_, n)| u64::from(n)).sum::<u64>();
                u64::from(accounts.count) * (1 + leaves)
            })
            .sum();
        u64::from(self.users.count) * (1 + per_user)
    }
}

impl UsersPlan {
    #[must_use]
    pub fn new(count: u32) -> Self {
        UsersPlan {
            count,
            ..UsersPlan::default()
        }
    }

    #[must_use]
    pub fn with_accounts(mut self, kind: AccountKind, plan: AccountsPlan) -> Self {
        *self.slot_mut(kind) = plan;
        self
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn account(&self, kind: AccountKind) -> &AccountsPlan {
        match kind {
            AccountKind::DebitCard => &self.debit_card_accounts,
            AccountKind::CreditCard => &self.credit_card_accounts,
            AccountKind::Deposit => &self.deposit_accounts,
            AccountKind::Savings => &self.savings_accounts,
        }
    }

    /// Account slots with a non-zero count, in declaration order.
    pub fn accounts(&self) -> impl Iterator<Item = (AccountKind, &AccountsPlan)> + '_ {
        AccountKind::ALL
            .into_iter()
            .map(|kind| (kind, self.account(kind)))
            .filter(|(_, plan)| plan.count > 0)
    }

    fn slot_mut(&mut self, kind: AccountKind) -> &mut AccountsPlan {
        match kind {
            AccountKind::DebitCard => &mut self.debit_card_accounts,
            AccountKind::CreditCard => &mut self.credit_card_accounts,
            AccountKind::Deposit => &mut self.deposit_accounts,
            AccountKind::Savings => &mut self.savings_accounts,
        }
    }
}

impl AccountsPlan {
    #[must_use]
    pub fn new(count: u32) -> Self {
        AccountsPlan {
            count,
            ..AccountsPlan::default()
        }
    }

    #[must_use]
    pub fn with_cards(mut self, kind: CardKind, count: u32) -> Self {
        match kind {
            CardKind::Virtual => self.virtual_cards = CardsPlan { count },
            CardKind::Physical => self.physical_cards = CardsPlan { count },
        }
        self
    }

    #[must_use]
    pub fn with_operations(mut self, kind: OperationKind, count: u32) -> Self {
        *self.operation_slot_mut(kind) = OperationsPlan { count };
        self
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn card_count(&self, kind: CardKind) -> u32 {
        match kind {
            CardKind::Virtual => self.virtual_cards.count,
            CardKind::Physical => self.physical_cards.count,
        }
    }

    #[must_use]
    pub fn operation_count(&self, kind: OperationKind) -> u32 {
        match kind {
            OperationKind::Purchase => self.purchase_operations.count,
            OperationKind::TopUp => self.top_up_operations.count,
            OperationKind::Cashback => self.cashback_operations.count,
            OperationKind::Transfer => self.transfer_operations.count,
            OperationKind::BillPayment => self.bill_payment_operations.count,
            OperationKind::CashWithdrawal => self.cash_withdrawal_operations.count,
            OperationKind::Fee => self.fee_operations.count,
        }
    }

    /// Card slots with a non-zero count, in declaration order.
    pub fn cards(&self) -> impl Iterator<Item = (CardKind, u32)> + '_ {
        CardKind::ALL
            .into_iter()
            .map(|kind| (kind, self.card_count(kind)))
            .filter(|&(_, count)| count > 0)
    }

    /// Operation slots with a non-zero count, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = (OperationKind, u32)> + '_ {
        OperationKind::ALL
            .into_iter()
            .map(|kind| (kind, self.operation_count(kind)))
            .filter(|&(_, count)| count > 0)
    }

    fn operation_slot_mut(&mut self, kind: OperationKind) -> &mut OperationsPlan {
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
}

/// Walks a raw plan document and reports the first negative `count` by its
/// dotted path, since `u32` deserialization alone would lose the location.
fn reject_negative_counts(value: &Value, path: &mut Vec<String>) -> Result<(), SeedError> {
    if let Value::Object(map) = value {
        for (key, child) in map {
            if key == "count" && child.as_i64().is_some_and(|count| count < 0) {
                return Err(SeedError::NegativeCount {
                    path: path.join("."),
                });
            }
            path.push(key.clone());
            reject_negative_counts(child, path)?;
            path.pop();
        }
    }
    Ok(())
}
