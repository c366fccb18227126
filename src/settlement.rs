use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::balance::Balance;
use crate::money::{is_negligible, round_to_2_decimals, TOLERANCE};
use crate::schemas::MemberId;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub from: MemberId,
    pub from_name: String,
    pub to: MemberId,
    pub to_name: String,
    pub amount: Decimal,
}

// Running balance of one member while matching; the caller's Balance records
// are never touched.
#[derive(Clone, Debug)]
struct PersonalBalance<'a> {
    id: &'a str,
    name: &'a str,
    balance: Decimal,
}

impl<'a> From<&'a Balance> for PersonalBalance<'a> {
    fn from(balance: &'a Balance) -> Self {
        PersonalBalance {
            id: &balance.member_id,
            name: &balance.member_name,
            balance: balance.net_balance,
        }
    }
}

/// Greedily matches the largest creditor with the largest debtor until one
/// side runs out.
///
/// Every emitted settlement is rounded to cents and exceeds the tolerance.
/// If the balances do not sum to zero the imbalance is logged and the
/// settlements found so far are returned. Members sitting exactly on the
/// tolerance are left out of matching without counting as an imbalance.
pub fn simplify_debts(balances: &[Balance]) -> Vec<Settlement> {
    let mut creditors: Vec<PersonalBalance> = balances
        .iter()
        .filter(|b| b.net_balance > TOLERANCE)
        .map(PersonalBalance::from)
        .collect();
    let mut debtors: Vec<PersonalBalance> = balances
        .iter()
        .filter(|b| b.net_balance < -TOLERANCE)
        .map(PersonalBalance::from)
        .collect();

    // Stable sorts, so equal balances keep the input order
    creditors.sort_by(|a, b| b.balance.cmp(&a.balance));
    debtors.sort_by(|a, b| a.balance.cmp(&b.balance));

    let mut settlements = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < creditors.len() && j < debtors.len() {
        let creditor = &mut creditors[i];
        let debtor = &mut debtors[j];

        let amount = creditor.balance.min(debtor.balance.abs());
        if amount > TOLERANCE {
            settlements.push(Settlement {
                from: debtor.id.to_string(),
                from_name: debtor.name.to_string(),
                to: creditor.id.to_string(),
                to_name: creditor.name.to_string(),
                amount: round_to_2_decimals(amount),
            });
        }

        creditor.balance -= amount;
        debtor.balance += amount;

        if is_negligible(creditor.balance) {
            i += 1;
        }
        if is_negligible(debtor.balance) {
            j += 1;
        }
    }

    let imbalance: Decimal = balances.iter().map(|b| b.net_balance).sum();
    if !is_negligible(imbalance) {
        let unmatched_credit: Decimal = creditors[i..].iter().map(|c| c.balance).sum();
        let unmatched_debt: Decimal = debtors[j..].iter().map(|d| d.balance).sum();
        warn!(
            %imbalance,
            %unmatched_credit,
            %unmatched_debt,
            settlements = settlements.len(),
            "balances do not sum to zero, settlement plan is incomplete"
        );
    }

    settlements
}

pub fn get_settlement_suggestions(balances: &[Balance]) -> Vec<Settlement> {
    simplify_debts(balances)
}
