use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::calculate_member_balances;
use crate::money::round_to_2_decimals;
use crate::schemas::{find_category, Expense, Member, MemberId, FALLBACK_CATEGORY};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub id: String,
    pub name: String,
    pub color: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTotal {
    pub member_id: MemberId,
    pub name: String,
    pub paid: Decimal,
    pub owed: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub total_spent: Decimal,
    pub expense_count: usize,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
    pub by_member: Vec<MemberTotal>,
}

pub fn summarize(expenses: &[Expense], members: &[Member]) -> GroupSummary {
    let total_spent = expenses.iter().map(|expense| expense.amount).sum();

    let mut per_category: HashMap<&str, Decimal> = HashMap::new();
    let mut per_month: BTreeMap<String, Decimal> = BTreeMap::new();
    for expense in expenses {
        // Unknown category ids fold into "other" like missing ones
        let category = expense
            .category
            .as_deref()
            .filter(|id| find_category(id).is_some())
            .unwrap_or(FALLBACK_CATEGORY);
        *per_category.entry(category).or_default() += expense.amount;
        *per_month
            .entry(expense.date.format("%Y-%m").to_string())
            .or_default() += expense.amount;
    }

    let mut by_category: Vec<CategoryTotal> = per_category
        .into_iter()
        .filter_map(|(id, amount)| {
            find_category(id).map(|category| CategoryTotal {
                id: category.id.to_string(),
                name: category.name.to_string(),
                color: category.color.to_string(),
                amount,
            })
        })
        .collect();
    by_category.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.id.cmp(&b.id)));

    let by_month = per_month
        .into_iter()
        .map(|(month, amount)| MonthTotal { month, amount })
        .collect();

    let by_member = calculate_member_balances(expenses, members)
        .into_iter()
        .map(|balance| MemberTotal {
            member_id: balance.member_id,
            name: balance.member_name,
            paid: round_to_2_decimals(balance.total_paid),
            owed: round_to_2_decimals(balance.total_owed),
        })
        .collect();

    GroupSummary {
        total_spent,
        expense_count: expenses.len(),
        by_category,
        by_month,
        by_member,
    }
}
