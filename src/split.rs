use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::money::{round_to_2_decimals, MAX_AMOUNT, TOLERANCE};
use crate::schemas::{Expense, Member, MemberId, Split, SplitType};

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("Expense amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("Expense amount {0} is too large")]
    AmountTooLarge(Decimal),
    #[error("Payer {0} is not a member of the group")]
    UnknownPayer(MemberId),
    #[error("Expense must be split between at least one member")]
    NoSplits,
    #[error("Split member {0} is not a member of the group")]
    UnknownMember(MemberId),
    #[error("Member {0} appears in more than one split")]
    DuplicateMember(MemberId),
    #[error("Splits add up to {splits} but the expense amount is {amount}")]
    SplitSumMismatch { amount: Decimal, splits: Decimal },
    #[error("Percentages add up to {0}, expected 100")]
    PercentageSumMismatch(Decimal),
    #[error("Split for member {0} is missing its {1}")]
    MissingSplitInput(MemberId, &'static str),
    #[error("Split for member {0} must be between 0 and the expense amount, got {1}")]
    SplitOutOfRange(MemberId, Decimal),
    #[error("Percentage for member {0} must be between 0 and 100, got {1}")]
    PercentageOutOfRange(MemberId, Decimal),
}

/// Per-member input for non-equal splits, as sent by clients.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitInput {
    pub member_id: MemberId,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub percentage: Option<Decimal>,
}

fn unpaid_split(member_id: &str, amount: Decimal) -> Split {
    Split {
        member_id: member_id.to_string(),
        amount,
        percentage: None,
        paid: false,
    }
}

/// Divides `amount` evenly, rounding each share to cents.
///
/// The shares may not add back up to `amount`; use [`allocate_equal_split`]
/// when the total has to be exact.
pub fn calculate_equal_split(amount: Decimal, member_ids: &[MemberId]) -> Vec<Split> {
    if member_ids.is_empty() {
        return vec![];
    }
    let share = round_to_2_decimals(amount / Decimal::from(member_ids.len()));
    member_ids
        .iter()
        .map(|member_id| unpaid_split(member_id, share))
        .collect()
}

pub fn validate_splits(total: Decimal, splits: &[Split]) -> bool {
    let split_total: Decimal = splits.iter().map(|split| split.amount).sum();
    (total - split_total).abs() < TOLERANCE
}

// The last member absorbs whatever rounding left over.
fn assign_remainder(amount: Decimal, splits: &mut [Split]) {
    let allocated: Decimal = splits.iter().map(|split| split.amount).sum();
    if let Some(last) = splits.last_mut() {
        last.amount += amount - allocated;
    }
}

pub fn allocate_equal_split(amount: Decimal, member_ids: &[MemberId]) -> Vec<Split> {
    let mut splits = calculate_equal_split(amount, member_ids);
    assign_remainder(amount, &mut splits);
    splits
}

fn check_amount(amount: Decimal) -> Result<(), SplitError> {
    if amount <= Decimal::ZERO {
        return Err(SplitError::NonPositiveAmount(amount));
    }
    if amount > MAX_AMOUNT {
        return Err(SplitError::AmountTooLarge(amount));
    }
    Ok(())
}

pub fn calculate_percentage_split(
    amount: Decimal,
    shares: &[(MemberId, Decimal)],
) -> Result<Vec<Split>, SplitError> {
    if let Some((member_id, percentage)) = shares
        .iter()
        .find(|(_, percentage)| *percentage < Decimal::ZERO || *percentage > Decimal::ONE_HUNDRED)
    {
        return Err(SplitError::PercentageOutOfRange(member_id.clone(), *percentage));
    }
    let total_percentage: Decimal = shares.iter().map(|(_, percentage)| *percentage).sum();
    if (total_percentage - Decimal::ONE_HUNDRED).abs() >= TOLERANCE {
        return Err(SplitError::PercentageSumMismatch(total_percentage));
    }
    let mut splits: Vec<Split> = shares
        .iter()
        .map(|(member_id, percentage)| Split {
            member_id: member_id.clone(),
            amount: round_to_2_decimals(amount * percentage / Decimal::ONE_HUNDRED),
            percentage: Some(*percentage),
            paid: false,
        })
        .collect();
    assign_remainder(amount, &mut splits);
    Ok(splits)
}

/// Turns a client split request into stored splits.
///
/// Equal splits without explicit inputs cover the whole group. The payer's
/// own share is marked as paid.
pub fn build_splits(
    amount: Decimal,
    paid_by: &str,
    split_type: SplitType,
    inputs: Option<&[SplitInput]>,
    members: &[Member],
) -> Result<Vec<Split>, SplitError> {
    check_amount(amount)?;
    let inputs = inputs.unwrap_or_default();
    let mut splits = match split_type {
        SplitType::Equal => {
            let participants: Vec<MemberId> = if inputs.is_empty() {
                members.iter().map(|member| member.id.clone()).collect()
            } else {
                inputs.iter().map(|input| input.member_id.clone()).collect()
            };
            allocate_equal_split(amount, &participants)
        }
        SplitType::Unequal | SplitType::Custom => inputs
            .iter()
            .map(|input| {
                input
                    .amount
                    .map(|owed| unpaid_split(&input.member_id, owed))
                    .ok_or_else(|| SplitError::MissingSplitInput(input.member_id.clone(), "amount"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        SplitType::Percentage => {
            let shares = inputs
                .iter()
                .map(|input| {
                    input
                        .percentage
                        .map(|percentage| (input.member_id.clone(), percentage))
                        .ok_or_else(|| {
                            SplitError::MissingSplitInput(input.member_id.clone(), "percentage")
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            calculate_percentage_split(amount, &shares)?
        }
    };
    for split in &mut splits {
        split.paid = split.member_id == paid_by;
    }
    Ok(splits)
}

/// Checks an expense against the group before it is persisted.
pub fn validate_expense(expense: &Expense, members: &[Member]) -> Result<(), SplitError> {
    check_amount(expense.amount)?;
    let known: HashSet<&str> = members.iter().map(|member| member.id.as_str()).collect();
    if !known.contains(expense.paid_by.as_str()) {
        return Err(SplitError::UnknownPayer(expense.paid_by.clone()));
    }
    if expense.splits.is_empty() {
        return Err(SplitError::NoSplits);
    }
    let mut seen = HashSet::new();
    for split in &expense.splits {
        if !known.contains(split.member_id.as_str()) {
            return Err(SplitError::UnknownMember(split.member_id.clone()));
        }
        if !seen.insert(split.member_id.as_str()) {
            return Err(SplitError::DuplicateMember(split.member_id.clone()));
        }
        if split.amount < Decimal::ZERO || split.amount > expense.amount {
            return Err(SplitError::SplitOutOfRange(split.member_id.clone(), split.amount));
        }
    }
    if !validate_splits(expense.amount, &expense.splits) {
        return Err(SplitError::SplitSumMismatch {
            amount: expense.amount,
            splits: expense.splits.iter().map(|split| split.amount).sum(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::fixtures::{expense, members};
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn ids(raw: &[&str]) -> Vec<MemberId> {
        raw.iter().map(|id| id.to_string()).collect()
    }

    fn amounts(splits: &[Split]) -> Vec<Decimal> {
        splits.iter().map(|split| split.amount).collect()
    }

    fn input(member_id: &str, amount: Option<Decimal>, percentage: Option<Decimal>) -> SplitInput {
        SplitInput {
            member_id: member_id.to_string(),
            amount,
            percentage,
        }
    }

    #[test]
    fn equal_split_rounds_without_redistributing() {
        let splits = calculate_equal_split(dec!(100), &ids(&["a", "b", "c"]));
        assert_eq!(amounts(&splits), vec![dec!(33.33), dec!(33.33), dec!(33.33)]);
        assert_eq!(splits[2].member_id, "c");
        assert!(splits.iter().all(|split| !split.paid));
    }

    #[test]
    fn equal_split_of_nobody_is_empty() {
        assert!(calculate_equal_split(dec!(10), &[]).is_empty());
        assert!(allocate_equal_split(dec!(10), &[]).is_empty());
    }

    #[test]
    fn allocation_gives_remainder_to_last_member() {
        let splits = allocate_equal_split(dec!(100), &ids(&["a", "b", "c"]));
        assert_eq!(amounts(&splits), vec![dec!(33.33), dec!(33.33), dec!(33.34)]);

        let splits = allocate_equal_split(dec!(0.05), &ids(&["a", "b", "c"]));
        assert_eq!(amounts(&splits), vec![dec!(0.02), dec!(0.02), dec!(0.01)]);
    }

    #[rstest]
    #[case::thirds(dec!(100), vec![dec!(33.33), dec!(33.33), dec!(33.34)], true)]
    #[case::exact(dec!(50), vec![dec!(25), dec!(25)], true)]
    #[case::just_inside(dec!(10), vec![dec!(3.33), dec!(3.33), dec!(3.335)], true)]
    #[case::off_by_a_cent(dec!(100), vec![dec!(33.33), dec!(33.33), dec!(33.33)], false)]
    #[case::empty(dec!(10), vec![], false)]
    fn validates_split_totals(
        #[case] total: Decimal,
        #[case] split_amounts: Vec<Decimal>,
        #[case] expected: bool,
    ) {
        let splits: Vec<Split> = split_amounts
            .into_iter()
            .enumerate()
            .map(|(idx, owed)| unpaid_split(&idx.to_string(), owed))
            .collect();
        assert_eq!(validate_splits(total, &splits), expected);
    }

    #[test]
    fn percentage_split_records_percentages() {
        let shares = vec![("a".to_string(), dec!(50)), ("b".to_string(), dec!(30)), ("c".to_string(), dec!(20))];
        let splits = calculate_percentage_split(dec!(99.99), &shares).unwrap();
        assert_eq!(amounts(&splits), vec![dec!(50.00), dec!(30.00), dec!(19.99)]);
        assert_eq!(splits[1].percentage, Some(dec!(30)));
        assert!(validate_splits(dec!(99.99), &splits));
    }

    #[test]
    fn percentage_split_rejects_bad_totals() {
        let shares = vec![("a".to_string(), dec!(50)), ("b".to_string(), dec!(40))];
        assert_eq!(
            calculate_percentage_split(dec!(10), &shares),
            Err(SplitError::PercentageSumMismatch(dec!(90)))
        );
    }

    #[test]
    fn build_equal_defaults_to_whole_group_and_marks_payer() {
        let group = members(&["a", "b", "c"]);
        let splits = build_splits(dec!(30), "b", SplitType::Equal, None, &group).unwrap();
        assert_eq!(amounts(&splits), vec![dec!(10), dec!(10), dec!(10)]);
        assert_eq!(
            splits.iter().map(|split| split.paid).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[test]
    fn build_equal_with_subset() {
        let group = members(&["a", "b", "c"]);
        let inputs = vec![input("a", None, None), input("c", None, None)];
        let splits = build_splits(dec!(9), "a", SplitType::Equal, Some(&inputs), &group).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(amounts(&splits), vec![dec!(4.50), dec!(4.50)]);
    }

    #[test]
    fn build_custom_requires_amounts() {
        let group = members(&["a", "b"]);
        let inputs = vec![input("a", Some(dec!(5)), None), input("b", None, None)];
        assert_eq!(
            build_splits(dec!(10), "a", SplitType::Custom, Some(&inputs), &group),
            Err(SplitError::MissingSplitInput("b".to_string(), "amount"))
        );
    }

    #[test]
    fn build_rejects_oversized_amounts() {
        let group = members(&["a", "b"]);
        let huge = dec!(50000000000000000000000000000);
        assert_eq!(
            build_splits(huge, "a", SplitType::Percentage, None, &group),
            Err(SplitError::AmountTooLarge(huge))
        );
        assert!(build_splits(MAX_AMOUNT, "a", SplitType::Equal, None, &group).is_ok());
    }

    #[test]
    fn percentage_split_rejects_out_of_range_shares() {
        let shares = vec![("a".to_string(), dec!(150)), ("b".to_string(), dec!(-50))];
        assert_eq!(
            calculate_percentage_split(dec!(10), &shares),
            Err(SplitError::PercentageOutOfRange("a".to_string(), dec!(150)))
        );
    }

    #[test]
    fn build_percentage_split() {
        let group = members(&["a", "b"]);
        let inputs = vec![input("a", None, Some(dec!(75))), input("b", None, Some(dec!(25)))];
        let splits =
            build_splits(dec!(40), "b", SplitType::Percentage, Some(&inputs), &group).unwrap();
        assert_eq!(amounts(&splits), vec![dec!(30), dec!(10)]);
        assert!(splits[1].paid);
    }

    #[rstest]
    #[case::valid(expense("a", dec!(50), &[("a", dec!(25)), ("b", dec!(25))]), Ok(()))]
    #[case::zero_amount(
        expense("a", dec!(0), &[("a", dec!(0))]),
        Err(SplitError::NonPositiveAmount(dec!(0)))
    )]
    #[case::too_large(
        expense("a", dec!(50000000000000), &[("a", dec!(50000000000000))]),
        Err(SplitError::AmountTooLarge(dec!(50000000000000)))
    )]
    #[case::negative_split(
        expense("a", dec!(50), &[("b", dec!(-10)), ("a", dec!(60))]),
        Err(SplitError::SplitOutOfRange("b".to_string(), dec!(-10)))
    )]
    #[case::unknown_payer(
        expense("z", dec!(10), &[("a", dec!(10))]),
        Err(SplitError::UnknownPayer("z".to_string()))
    )]
    #[case::no_splits(expense("a", dec!(10), &[]), Err(SplitError::NoSplits))]
    #[case::unknown_member(
        expense("a", dec!(10), &[("a", dec!(5)), ("z", dec!(5))]),
        Err(SplitError::UnknownMember("z".to_string()))
    )]
    #[case::duplicate_member(
        expense("a", dec!(10), &[("b", dec!(5)), ("b", dec!(5))]),
        Err(SplitError::DuplicateMember("b".to_string()))
    )]
    #[case::sum_mismatch(
        expense("a", dec!(10), &[("a", dec!(4)), ("b", dec!(5))]),
        Err(SplitError::SplitSumMismatch { amount: dec!(10), splits: dec!(9) })
    )]
    fn validates_expenses(#[case] candidate: Expense, #[case] expected: Result<(), SplitError>) {
        let group = members(&["a", "b"]);
        assert_eq!(validate_expense(&candidate, &group), expected);
    }

    proptest! {
        #[test]
        fn equal_shares_stay_within_half_a_cent(cents in 1i64..10_000_000, count in 1usize..12) {
            let amount = Decimal::new(cents, 2);
            let member_ids: Vec<MemberId> = (0..count).map(|idx| format!("m{idx}")).collect();
            let exact = amount / Decimal::from(count);
            let splits = calculate_equal_split(amount, &member_ids);
            prop_assert_eq!(splits.len(), count);
            for split in &splits {
                prop_assert!((split.amount - exact).abs() <= dec!(0.005));
            }
        }

        #[test]
        fn allocation_is_exact(cents in 1i64..10_000_000, count in 1usize..12) {
            let amount = Decimal::new(cents, 2);
            let member_ids: Vec<MemberId> = (0..count).map(|idx| format!("m{idx}")).collect();
            let total: Decimal = allocate_equal_split(amount, &member_ids).iter().map(|s| s.amount).sum();
            prop_assert_eq!(total, amount);
        }
    }
}
