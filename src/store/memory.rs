use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{GroupStore, StoreError};
use crate::schemas::{Activity, Expense, Group};

#[derive(Default)]
struct State {
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    activities: Vec<Activity>,
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn insert_group(&self, group: Group) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.groups.iter().any(|existing| existing.id == group.id) {
            return Err(StoreError::DuplicateGroup(group.id));
        }
        state.groups.push(group);
        Ok(())
    }

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|group| group.id == group_id).cloned())
    }

    async fn user_groups(&self, email: &str) -> Result<Vec<Group>, StoreError> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state
            .groups
            .iter()
            .filter(|group| group.members.iter().any(|member| member.email == email))
            .cloned()
            .collect();
        groups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.groups.len();
        state.groups.retain(|group| group.id != group_id);
        if state.groups.len() == before {
            return Ok(false);
        }
        state.expenses.retain(|expense| expense.group_id != group_id);
        state.activities.retain(|activity| activity.group_id != group_id);
        Ok(true)
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let Some(group) = state.groups.iter_mut().find(|group| group.id == group_id) else {
            return Ok(false);
        };
        let before = group.members.len();
        group.members.retain(|member| member.id != member_id);
        let removed = group.members.len() != before;
        if removed {
            group.updated_at = Utc::now();
        }
        Ok(removed)
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), StoreError> {
        self.state.write().await.expenses.push(expense);
        Ok(())
    }

    async fn group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, StoreError> {
        let state = self.state.read().await;
        let mut expenses: Vec<Expense> = state
            .expenses
            .iter()
            .filter(|expense| expense.group_id == group_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let before = state.expenses.len();
        state
            .expenses
            .retain(|expense| !(expense.group_id == group_id && expense.id == expense_id));
        Ok(state.expenses.len() != before)
    }

    async fn insert_activity(&self, activity: Activity) -> Result<(), StoreError> {
        self.state.write().await.activities.push(activity);
        Ok(())
    }

    async fn recent_activities(
        &self,
        group_id: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, StoreError> {
        let state = self.state.read().await;
        let mut activities: Vec<Activity> = state
            .activities
            .iter()
            .filter(|activity| activity.group_id == group_id)
            .cloned()
            .collect();
        // Newest first; insertion order breaks ties
        activities.reverse();
        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        activities.truncate(limit.max(1) as usize);
        Ok(activities)
    }
}
