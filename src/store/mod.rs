//! Persistence seam for groups, expenses and the activity feed.
//!
//! Reads hand back owned snapshots; balances and settlements are always
//! recomputed from them and never stored.

use async_trait::async_trait;
use thiserror::Error;

use crate::schemas::{Activity, Expense, Group};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Group {0} already exists")]
    DuplicateGroup(String),
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn insert_group(&self, group: Group) -> Result<(), StoreError>;

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>, StoreError>;

    /// Groups listing a member with this email, most recently updated first.
    async fn user_groups(&self, email: &str) -> Result<Vec<Group>, StoreError>;

    /// Deletes the group together with its expenses and activities.
    async fn delete_group(&self, group_id: &str) -> Result<bool, StoreError>;

    /// Returns whether a member was actually removed.
    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool, StoreError>;

    async fn insert_expense(&self, expense: Expense) -> Result<(), StoreError>;

    /// All expenses of the group, newest first.
    async fn group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, StoreError>;

    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, StoreError>;

    async fn insert_activity(&self, activity: Activity) -> Result<(), StoreError>;

    /// Newest first. A zero `limit` is treated as one.
    async fn recent_activities(
        &self,
        group_id: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, StoreError>;
}
