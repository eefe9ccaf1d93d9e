//! Named plans. The scenario name doubles as the key of its dump.

use std::path::Path;

use crate::error::SeedError;
use crate::plan::{AccountKind, AccountsPlan, CardKind, OperationKind, SeedsPlan, UsersPlan};

pub trait SeedsScenario: Send + Sync {
    fn name(&self) -> &str;

    fn plan(&self) -> SeedsPlan;
}

/// Users with a credit card account and a short operation history, for
/// tests that read operations and their summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingUserGetOperations;

impl SeedsScenario for ExistingUserGetOperations {
    fn name(&self) -> &str {
        "existing_user_get_operations"
    }

    fn plan(&self) -> SeedsPlan {
        SeedsPlan::new(
            UsersPlan::new(300).with_accounts(
                AccountKind::CreditCard,
                AccountsPlan::new(1)
                    .with_operations(OperationKind::Purchase, 5)
                    .with_operations(OperationKind::TopUp, 1)
                    .with_operations(OperationKind::CashWithdrawal, 1),
            ),
        )
    }
}

/// Users with a debit card account, for tests that issue further cards
/// against an existing account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistingUserIssueVirtualCard;

impl SeedsScenario for ExistingUserIssueVirtualCard {
    fn name(&self) -> &str {
        "existing_user_issue_virtual_card"
    }

    fn plan(&self) -> SeedsPlan {
        SeedsPlan::new(UsersPlan::new(300).with_accounts(
            AccountKind::DebitCard,
            AccountsPlan::new(1).with_cards(CardKind::Virtual, 1),
        ))
    }
}

/// A plan supplied at runtime, e.g. read from a JSON document.
#[derive(Debug, Clone)]
pub struct PlanScenario {
    name: String,
    plan: SeedsPlan,
}

impl PlanScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, plan: SeedsPlan) -> Self {
        PlanScenario {
            name: name.into(),
            plan,
        }
    }

    /// # Errors
    /// Errors when the file does not hold a valid plan.
    pub fn from_path(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, SeedError> {
        Ok(PlanScenario::new(name, SeedsPlan::from_path(path)?))
    }
}

impl SeedsScenario for PlanScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self) -> SeedsPlan {
        self.plan.clone()
    }
}

#[must_use]
pub fn builtin_scenarios() -> Vec<Box<dyn SeedsScenario>> {
    vec![
        Box::new(ExistingUserGetOperations),
        Box::new(ExistingUserIssueVirtualCard),
    ]
}

#[must_use]
pub fn builtin_scenario(name: &str) -> Option<Box<dyn SeedsScenario>> {
    builtin_scenarios()
        .into_iter()
        .find(|scenario| scenario.name() == name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let scenario = builtin_scenario("existing_user_get_operations").unwrap();
        let plan = scenario.plan();
        let credit = plan.users().account(AccountKind::CreditCard);
        assert_eq!(plan.users().count(), 300);
        assert_eq!(credit.count(), 1);
        assert_eq!(credit.operation_count(OperationKind::Purchase), 5);
        assert!(builtin_scenario("unknown").is_none());
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let mut names: Vec<_> = builtin_scenarios()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), builtin_scenarios().len());
    }
}
