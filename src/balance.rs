use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::schemas::{Expense, Member, MemberId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub member_id: MemberId,
    pub member_name: String,
    pub total_paid: Decimal,
    pub total_owed: Decimal,
    /// Positive when the group owes this member, negative when they owe.
    pub net_balance: Decimal,
}

impl Balance {
    fn empty(member: &Member) -> Self {
        Balance {
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            total_paid: Decimal::ZERO,
            total_owed: Decimal::ZERO,
            net_balance: Decimal::ZERO,
        }
    }
}

/// Folds every expense into one balance per member, in member order.
///
/// Payers and split members that are not in `members` are skipped for that
/// attribution only.
pub fn calculate_member_balances(expenses: &[Expense], members: &[Member]) -> Vec<Balance> {
    let mut balances: Vec<Balance> = members.iter().map(Balance::empty).collect();
    let index: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(position, member)| (member.id.as_str(), position))
        .collect();

    for expense in expenses {
        if let Some(&payer) = index.get(expense.paid_by.as_str()) {
            balances[payer].total_paid += expense.amount;
        }
        for split in &expense.splits {
            if let Some(&owner) = index.get(split.member_id.as_str()) {
                balances[owner].total_owed += split.amount;
            }
        }
    }

    for balance in &mut balances {
        balance.net_balance = balance.total_paid - balance.total_owed;
    }
    balances
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::schemas::{Expense, Member, Split, SplitType, DEFAULT_CURRENCY};

    pub fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{id}@example.com"),
            user_id: None,
            added_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn members(ids: &[&str]) -> Vec<Member> {
        ids.iter().map(|id| member(id)).collect()
    }

    pub fn expense(paid_by: &str, amount: Decimal, splits: &[(&str, Decimal)]) -> Expense {
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        Expense {
            id: format!("{paid_by}-{amount}"),
            group_id: "trip".to_string(),
            description: "shared".to_string(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            paid_by: paid_by.to_string(),
            split_type: SplitType::Custom,
            splits: splits
                .iter()
                .map(|(member_id, owed)| Split {
                    member_id: member_id.to_string(),
                    amount: *owed,
                    percentage: None,
                    paid: *member_id == paid_by,
                })
                .collect(),
            category: None,
            date,
            created_by: "tester".to_string(),
            created_at: date,
            updated_at: date,
            settled: false,
        }
    }
}
