use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Client, Collection, Database,
};
use tracing::{debug, info};

use super::{GroupStore, StoreError};
use crate::schemas::{Activity, Expense, Group};

const GROUPS: &str = "Groups";
const EXPENSES: &str = "Expenses";
const ACTIVITIES: &str = "Activities";

#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }, None).await?;
        info!(database = %database.name(), "connected to MongoDB");
        Ok(MongoStore { database })
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection(GROUPS)
    }

    fn expenses(&self) -> Collection<Expense> {
        self.database.collection(EXPENSES)
    }

    fn activities(&self) -> Collection<Activity> {
        self.database.collection(ACTIVITIES)
    }
}

// Matches only while the member is still listed, so a no-op pull reports
// nothing removed.
fn member_filter(group_id: &str, member_id: &str) -> Document {
    doc! { "id": group_id, "members.id": member_id }
}

#[async_trait]
impl GroupStore for MongoStore {
    async fn insert_group(&self, group: Group) -> Result<(), StoreError> {
        let groups = self.groups();
        if groups.find_one(doc! { "id": group.id.as_str() }, None).await?.is_some() {
            return Err(StoreError::DuplicateGroup(group.id));
        }
        groups.insert_one(&group, None).await?;
        debug!(group = %group.id, "group inserted");
        Ok(())
    }

    async fn find_group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        Ok(self.groups().find_one(doc! { "id": group_id }, None).await?)
    }

    async fn user_groups(&self, email: &str) -> Result<Vec<Group>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "updatedAt": -1 }).build();
        let cursor = self
            .groups()
            .find(doc! { "members.email": email }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_group(&self, group_id: &str) -> Result<bool, StoreError> {
        let result = self.groups().delete_one(doc! { "id": group_id }, None).await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        let expenses = self
            .expenses()
            .delete_many(doc! { "groupId": group_id }, None)
            .await?;
        self.activities()
            .delete_many(doc! { "groupId": group_id }, None)
            .await?;
        debug!(group = %group_id, expenses = expenses.deleted_count, "group deleted");
        Ok(true)
    }

    async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<bool, StoreError> {
        let updated_at = bson::DateTime::from_chrono(Utc::now());
        let result = self
            .groups()
            .update_one(
                member_filter(group_id, member_id),
                doc! {
                    "$pull": { "members": { "id": member_id } },
                    "$set": { "updatedAt": updated_at },
                },
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), StoreError> {
        self.expenses().insert_one(&expense, None).await?;
        debug!(group = %expense.group_id, expense = %expense.id, "expense inserted");
        Ok(())
    }

    async fn group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
        let cursor = self
            .expenses()
            .find(doc! { "groupId": group_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, StoreError> {
        let result = self
            .expenses()
            .delete_one(doc! { "groupId": group_id, "id": expense_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_activity(&self, activity: Activity) -> Result<(), StoreError> {
        self.activities().insert_one(&activity, None).await?;
        Ok(())
    }

    async fn recent_activities(
        &self,
        group_id: &str,
        limit: u32,
    ) -> Result<Vec<Activity>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(i64::from(limit.max(1)))
            .build();
        let cursor = self
            .activities()
            .find(doc! { "groupId": group_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_removal_matches_on_the_member() {
        let filter = member_filter("trip", "b");
        assert_eq!(filter.get_str("id").unwrap(), "trip");
        assert_eq!(filter.get_str("members.id").unwrap(), "b");
    }
}
