use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type MemberId = String;

pub const DEFAULT_CURRENCY: &str = "USD";

/// RFC 3339 strings for JSON, native BSON dates for MongoDB.
mod timestamp {
    use bson::serde_helpers::chrono_datetime_as_bson_datetime;

    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            value.serialize(serializer)
        } else {
            chrono_datetime_as_bson_datetime::serialize(value, serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        if deserializer.is_human_readable() {
            DateTime::deserialize(deserializer)
        } else {
            chrono_datetime_as_bson_datetime::deserialize(deserializer)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(with = "timestamp")]
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<Member>,
    pub created_by: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Unequal,
    Percentage,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub member_id: MemberId,
    /// What this member owes for the expense.
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    #[serde(default)]
    pub paid: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub paid_by: MemberId,
    pub split_type: SplitType,
    pub splits: Vec<Split>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub created_by: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub settled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ExpenseAdded,
    ExpenseEdited,
    ExpenseDeleted,
    ExpenseSettled,
    MemberAdded,
    MemberRemoved,
    GroupCreated,
    GroupUpdated,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub group_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub description: String,
    pub performed_by: String,
    pub performed_by_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ExpenseCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

pub const FALLBACK_CATEGORY: &str = "other";

pub const DEFAULT_CATEGORIES: [ExpenseCategory; 9] = [
    ExpenseCategory { id: "food", name: "Food & Dining", icon: "utensils", color: "#FF6B6B" },
    ExpenseCategory { id: "transport", name: "Transportation", icon: "car", color: "#4ECDC4" },
    ExpenseCategory { id: "shopping", name: "Shopping", icon: "shopping-bag", color: "#95E1D3" },
    ExpenseCategory { id: "entertainment", name: "Entertainment", icon: "film", color: "#F38181" },
    ExpenseCategory { id: "utilities", name: "Utilities", icon: "bolt", color: "#FFA07A" },
    ExpenseCategory { id: "rent", name: "Rent", icon: "home", color: "#6C5CE7" },
    ExpenseCategory { id: "groceries", name: "Groceries", icon: "shopping-cart", color: "#00B894" },
    ExpenseCategory { id: "health", name: "Health", icon: "heartbeat", color: "#E74C3C" },
    ExpenseCategory { id: "other", name: "Other", icon: "ellipsis-h", color: "#95A5A6" },
];

pub fn find_category(id: &str) -> Option<&'static ExpenseCategory> {
    DEFAULT_CATEGORIES.iter().find(|category| category.id == id)
}
