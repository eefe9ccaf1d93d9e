//! Read-only, randomized access to loaded fixtures for load-test workers.
//!
//! Every [`UserFilter`] is resolved once at construction into a list of user
//! positions, so a pick is a single random index. The registry is shared
//! between workers behind an `Arc` and never mutated, apart from the atomic
//! cursors and claim flags [`SelectionMode::Unique`] relies on.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SeedError;
use crate::plan::{AccountKind, CardKind, OperationKind};
use crate::result::{SeedAccountResult, SeedUserResult};
use crate::store::SeedsDump;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserFilter {
    Any,
    HasAccount(AccountKind),
    HasCard(CardKind),
    HasOperation(OperationKind),
}

/// How picks are distributed among concurrent workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Uniform pick on every call; two workers may drive the same user.
    #[default]
    WithReplacement,
    /// Every user is handed out at most once per registry, whatever filter
    /// it is picked through, in an order shuffled at load time.
    Unique,
}

#[derive(Debug, Serialize)]
pub struct UserSummary<'a> {
    pub user_id: &'a str,
    pub accounts: usize,
    pub cards: usize,
    pub operations: usize,
}

impl UserFilter {
    fn all() -> impl Iterator<Item = UserFilter> {
        std::iter::once(UserFilter::Any)
            .chain(AccountKind::ALL.into_iter().map(UserFilter::HasAccount))
            .chain(CardKind::ALL.into_iter().map(UserFilter::HasCard))
            .chain(OperationKind::ALL.into_iter().map(UserFilter::HasOperation))
    }

    #[must_use]
    pub fn matches(self, user: &SeedUserResult) -> bool {
        match self {
            UserFilter::Any => true,
            UserFilter::HasAccount(kind) => user.has_account(kind),
            UserFilter::HasCard(kind) => user.has_card(kind),
            UserFilter::HasOperation(kind) => user.has_operation(kind),
        }
    }

    /// Parses the filter notation used on the command line: `any`, or a slot
    /// name such as `credit_card_accounts`, `virtual_cards` or
    /// `purchase_operations`.
    #[must_use]
    pub fn from_slot(slot: &str) -> Option<UserFilter> {
        UserFilter::all().find(|filter| filter.to_string() == slot)
    }
}

impl fmt::Display for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserFilter::Any => f.write_str("any"),
            UserFilter::HasAccount(kind) => fmt::Display::fmt(kind, f),
            UserFilter::HasCard(kind) => fmt::Display::fmt(kind, f),
            UserFilter::HasOperation(kind) => fmt::Display::fmt(kind, f),
        }
    }
}

#[derive(Debug)]
struct FilterIndex {
    members: Vec<usize>,
    cursor: AtomicUsize,
}

#[derive(Debug)]
pub struct SeedsRegistry {
    scenario: String,
    users: Vec<SeedUserResult>,
    index: HashMap<UserFilter, FilterIndex>,
    claimed: Vec<AtomicBool>,
    mode: SelectionMode,
}

impl SeedsRegistry {
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        users: Vec<SeedUserResult>,
        mode: SelectionMode,
    ) -> Self {
        let mut rng = rand::thread_rng();
        let index = UserFilter::all()
            .map(|filter| {
                let mut members: Vec<usize> = users
                    .iter()
                    .enumerate()
                    .filter(|(_, user)| filter.matches(user))
                    .map(|(position, _)| position)
                    .collect();
                if mode == SelectionMode::Unique {
                    members.shuffle(&mut rng);
                }
                let entry = FilterIndex {
                    members,
                    cursor: AtomicUsize::new(0),
                };
                (filter, entry)
            })
            .collect();
        let claimed = users.iter().map(|_| AtomicBool::new(false)).collect();
        let scenario = scenario.into();
        debug!(
            "Indexed {} users for scenario `{}` ({:?})",
            users.len(),
            scenario,
            mode
        );
        SeedsRegistry {
            scenario,
            users,
            index,
            claimed,
            mode,
        }
    }

    #[must_use]
    pub fn from_dump(dump: SeedsDump, mode: SelectionMode) -> Self {
        SeedsRegistry::new(dump.scenario, dump.users, mode)
    }

    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    #[must_use]
    pub fn users(&self) -> &[SeedUserResult] {
        &self.users
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[must_use]
    pub fn count_matching(&self, filter: UserFilter) -> usize {
        self.index
            .get(&filter)
            .map_or(0, |entry| entry.members.len())
    }

    /// # Errors
    /// [`SeedError::NoMatchingFixture`] when the registry holds no users,
    /// [`SeedError::FixturePoolExhausted`] once every user was handed out in
    /// [`SelectionMode::Unique`].
    pub fn get_random_user(&self) -> Result<&SeedUserResult, SeedError> {
        self.get_random_user_matching(UserFilter::Any)
    }

    /// # Errors
    /// [`SeedError::NoMatchingFixture`] when no user satisfies `filter`,
    /// [`SeedError::FixturePoolExhausted`] once every matching user was
    /// handed out in [`SelectionMode::Unique`].
    pub fn get_random_user_matching(
        &self,
        filter: UserFilter,
    ) -> Result<&SeedUserResult, SeedError> {
        let entry = match self.index.get(&filter) {
            Some(entry) if !entry.members.is_empty() => entry,
            _ => return Err(SeedError::NoMatchingFixture(filter)),
        };
        let position = match self.mode {
            SelectionMode::WithReplacement => {
                entry.members[rand::thread_rng().gen_range(0..entry.members.len())]
            }
            SelectionMode::Unique => self.claim_next(entry, filter)?,
        };
        Ok(&self.users[position])
    }

    /// Walks the filter's shuffled members from its cursor and claims the
    /// first user no other pick has taken yet.
    fn claim_next(&self, entry: &FilterIndex, filter: UserFilter) -> Result<usize, SeedError> {
        loop {
            let next = entry.cursor.fetch_add(1, Ordering::Relaxed);
            let position = *entry
                .members
                .get(next)
                .ok_or(SeedError::FixturePoolExhausted(filter))?;
            if self.claimed[position]
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(position);
            }
        }
    }

    /// Per-user entity counts, in load order.
    pub fn summaries(&self) -> impl Iterator<Item = UserSummary<'_>> + '_ {
        self.users.iter().map(|user| UserSummary {
            user_id: &user.user_id,
            accounts: user.all_accounts().count(),
            cards: user
                .all_accounts()
                .map(SeedAccountResult::card_count)
                .sum(),
            operations: user
                .all_accounts()
                .map(SeedAccountResult::operation_count)
                .sum(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::result::SeedCardResult;
    use std::collections::HashSet;

    fn users() -> Vec<SeedUserResult> {
        let mut with_card = SeedUserResult::new("u-card");
        let mut account = SeedAccountResult::new("acc-1");
        account.virtual_cards.push(SeedCardResult {
            card_id: "card-1".to_string(),
        });
        with_card.debit_card_accounts.push(account);

        let mut plain = SeedUserResult::new("u-plain");
        plain
            .debit_card_accounts
            .push(SeedAccountResult::new("acc-2"));

        vec![with_card, plain, SeedUserResult::new("u-empty")]
    }

    #[test]
    fn test_random_user_is_loaded() {
        let registry = SeedsRegistry::new("s", users(), SelectionMode::WithReplacement);
        let ids: HashSet<_> = registry.users().iter().map(|u| u.user_id.clone()).collect();
        for _ in 0..100 {
            let user = registry.get_random_user().unwrap();
            assert!(ids.contains(&user.user_id));
        }
    }

    #[test]
    fn test_filters() {
        let registry = SeedsRegistry::new("s", users(), SelectionMode::WithReplacement);
        assert_eq!(registry.count_matching(UserFilter::Any), 3);
        assert_eq!(
            registry.count_matching(UserFilter::HasAccount(AccountKind::DebitCard)),
            2
        );
        for _ in 0..20 {
            let user = registry
                .get_random_user_matching(UserFilter::HasCard(CardKind::Virtual))
                .unwrap();
            assert_eq!(user.user_id, "u-card");
        }
        assert!(matches!(
            registry.get_random_user_matching(UserFilter::HasCard(CardKind::Physical)),
            Err(SeedError::NoMatchingFixture(UserFilter::HasCard(
                CardKind::Physical
            )))
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = SeedsRegistry::new("s", Vec::new(), SelectionMode::default());
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get_random_user(),
            Err(SeedError::NoMatchingFixture(UserFilter::Any))
        ));
    }

    #[test]
    fn test_unique_selection() {
        let registry = SeedsRegistry::new("s", users(), SelectionMode::Unique);
        let picked: HashSet<_> = (0..3)
            .map(|_| registry.get_random_user().unwrap().user_id.clone())
            .collect();
        assert_eq!(picked.len(), 3);
        assert!(matches!(
            registry.get_random_user(),
            Err(SeedError::FixturePoolExhausted(UserFilter::Any))
        ));
    }

    #[test]
    fn test_unique_selection_across_filters() {
        let registry = SeedsRegistry::new("s", users(), SelectionMode::Unique);
        let carded = registry
            .get_random_user_matching(UserFilter::HasCard(CardKind::Virtual))
            .unwrap();
        assert_eq!(carded.user_id, "u-card");

        let debit = UserFilter::HasAccount(AccountKind::DebitCard);
        assert_eq!(
            registry.get_random_user_matching(debit).unwrap().user_id,
            "u-plain"
        );
        assert!(matches!(
            registry.get_random_user_matching(debit),
            Err(SeedError::FixturePoolExhausted(_))
        ));

        assert_eq!(registry.get_random_user().unwrap().user_id, "u-empty");
        assert!(matches!(
            registry.get_random_user(),
            Err(SeedError::FixturePoolExhausted(UserFilter::Any))
        ));
    }

    #[test]
    fn test_unique_single_user_goes_out_once() {
        let mut only = SeedUserResult::new("only-user");
        only.credit_card_accounts.push(SeedAccountResult::new("acc-1"));
        let registry = SeedsRegistry::new("s", vec![only], SelectionMode::Unique);
        assert_eq!(registry.get_random_user().unwrap().user_id, "only-user");
        assert!(matches!(
            registry.get_random_user_matching(UserFilter::HasAccount(AccountKind::CreditCard)),
            Err(SeedError::FixturePoolExhausted(_))
        ));
    }

    #[test]
    fn test_filter_slot_names() {
        assert_eq!(UserFilter::from_slot("any"), Some(UserFilter::Any));
        assert_eq!(
            UserFilter::from_slot("credit_card_accounts"),
            Some(UserFilter::HasAccount(AccountKind::CreditCard))
        );
        assert_eq!(
            UserFilter::from_slot("virtual_cards"),
            Some(UserFilter::HasCard(CardKind::Virtual))
        );
        assert_eq!(
            UserFilter::from_slot("cash_withdrawal_operations"),
            Some(UserFilter::HasOperation(OperationKind::CashWithdrawal))
        );
        assert_eq!(UserFilter::from_slot("crypto_accounts"), None);
    }

    #[test]
    fn test_summaries() {
        let registry = SeedsRegistry::new("s", users(), SelectionMode::default());
        let summaries: Vec<_> = registry.summaries().collect();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].user_id, "u-card");
        assert_eq!(summaries[0].accounts, 1);
        assert_eq!(summaries[0].cards, 1);
        assert_eq!(summaries[2].accounts, 0);
    }
}
