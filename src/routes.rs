use std::collections::HashSet;

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::balance::calculate_member_balances;
use crate::error::ApiError;
use crate::schemas::{
    Activity, ActivityType, Expense, Group, Member, SplitType, DEFAULT_CURRENCY,
};
use crate::settlement::get_settlement_suggestions;
use crate::split::{build_splits, validate_expense, SplitInput};
use crate::store::{GroupStore, DEFAULT_ACTIVITY_LIMIT};
use crate::summary::summarize;

type Store = web::Data<dyn GroupStore>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberJson {
    id: Option<String>,
    name: String,
    email: String,
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupJson {
    name: String,
    description: Option<String>,
    #[serde(default)]
    members: Vec<MemberJson>,
    created_by: String,
    created_by_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseJson {
    description: String,
    amount: Decimal,
    currency: Option<String>,
    paid_by: String,
    #[serde(default = "default_split_type")]
    split_type: SplitType,
    splits: Option<Vec<SplitInput>>,
    category: Option<String>,
    date: Option<DateTime<Utc>>,
    created_by: String,
    created_by_name: Option<String>,
}

fn default_split_type() -> SplitType {
    SplitType::Equal
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorQuery {
    performed_by: Option<String>,
    performed_by_name: Option<String>,
}

impl ActorQuery {
    fn actor(&self) -> (String, String) {
        let id = self
            .performed_by
            .clone()
            .unwrap_or_else(|| "anonymous".to_string());
        let name = self.performed_by_name.clone().unwrap_or_else(|| id.clone());
        (id, name)
    }
}

#[derive(Deserialize)]
struct UserGroupsQuery {
    email: String,
}

#[derive(Deserialize)]
struct ActivityQuery {
    limit: Option<u32>,
}

fn new_activity(
    group_id: &str,
    kind: ActivityType,
    description: String,
    (performed_by, performed_by_name): (String, String),
    metadata: Option<serde_json::Value>,
) -> Activity {
    Activity {
        id: Uuid::new_v4().to_string(),
        group_id: group_id.to_string(),
        kind,
        description,
        performed_by,
        performed_by_name,
        metadata,
        created_at: Utc::now(),
    }
}

async fn load_group(store: &Store, group_id: &str) -> Result<Group, ApiError> {
    store
        .find_group(group_id)
        .await?
        .ok_or_else(|| ApiError::group_not_found(group_id))
}

async fn load_snapshot(store: &Store, group_id: &str) -> Result<(Group, Vec<Expense>), ApiError> {
    let group = load_group(store, group_id).await?;
    let expenses = store.group_expenses(group_id).await?;
    Ok((group, expenses))
}

fn build_members(members: Vec<MemberJson>, now: DateTime<Utc>) -> Result<Vec<Member>, ApiError> {
    let mut seen = HashSet::new();
    let mut built = Vec::with_capacity(members.len());
    for member in members {
        let id = member.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if !seen.insert(id.clone()) {
            return Err(ApiError::Invalid(format!("Member {id} is listed twice")));
        }
        built.push(Member {
            id,
            name: member.name,
            email: member.email,
            user_id: member.user_id,
            added_at: now,
        });
    }
    Ok(built)
}

#[put("/groups/{id}")]
async fn add_group(
    store: Store,
    id: web::Path<String>,
    json: web::Json<GroupJson>,
) -> Result<HttpResponse, ApiError> {
    let json = json.into_inner();
    let name = json.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Invalid("Group name is required".to_string()));
    }
    let now = Utc::now();
    let group = Group {
        id: id.into_inner(),
        name,
        description: json.description,
        members: build_members(json.members, now)?,
        created_by: json.created_by.clone(),
        created_at: now,
        updated_at: now,
    };
    let actor_name = json.created_by_name.unwrap_or_else(|| json.created_by.clone());
    let activity = new_activity(
        &group.id,
        ActivityType::GroupCreated,
        format!("{actor_name} created group: {}", group.name),
        (json.created_by, actor_name),
        Some(json!({ "memberCount": group.members.len() })),
    );

    store.insert_group(group.clone()).await?;
    store.insert_activity(activity).await?;
    info!(group = %group.id, members = group.members.len(), "group created");
    Ok(HttpResponse::Created().json(group))
}

#[get("/groups/{id}")]
async fn get_group(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(load_group(&store, &id).await?))
}

#[get("/groups")]
async fn list_user_groups(
    store: Store,
    query: web::Query<UserGroupsQuery>,
) -> Result<HttpResponse, ApiError> {
    let email = query.email.trim();
    if email.is_empty() {
        return Err(ApiError::Invalid("Email is required".to_string()));
    }
    Ok(HttpResponse::Ok().json(store.user_groups(email).await?))
}

#[delete("/groups/{id}")]
async fn delete_group(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    if !store.delete_group(&id).await? {
        return Err(ApiError::group_not_found(&id));
    }
    info!(group = %id, "group deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/groups/{id}/members/{member_id}")]
async fn remove_member(
    store: Store,
    path: web::Path<(String, String)>,
    actor: web::Query<ActorQuery>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, member_id) = path.into_inner();
    let group = load_group(&store, &group_id).await?;
    let member = group
        .member(&member_id)
        .ok_or_else(|| ApiError::NotFound(format!("Couldn't find member {member_id}")))?;
    let member_name = member.name.clone();

    if !store.remove_member(&group_id, &member_id).await? {
        return Err(ApiError::NotFound(format!("Couldn't find member {member_id}")));
    }
    let actor = actor.actor();
    let activity = new_activity(
        &group_id,
        ActivityType::MemberRemoved,
        format!("{} removed member: {member_name}", actor.1),
        actor,
        Some(json!({ "memberId": member_id })),
    );
    store.insert_activity(activity).await?;
    info!(group = %group_id, member = %member_id, "member removed");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    store: Store,
    id: web::Path<String>,
    json: web::Json<ExpenseJson>,
) -> Result<HttpResponse, ApiError> {
    let group = load_group(&store, &id).await?;
    let json = json.into_inner();
    let description = json.description.trim().to_string();
    if description.is_empty() {
        return Err(ApiError::Invalid("Description is required".to_string()));
    }

    let splits = build_splits(
        json.amount,
        &json.paid_by,
        json.split_type,
        json.splits.as_deref(),
        &group.members,
    )?;
    let now = Utc::now();
    let expense = Expense {
        id: Uuid::new_v4().to_string(),
        group_id: group.id.clone(),
        description,
        amount: json.amount,
        currency: json.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        paid_by: json.paid_by,
        split_type: json.split_type,
        splits,
        category: json.category,
        date: json.date.unwrap_or(now),
        created_by: json.created_by.clone(),
        created_at: now,
        updated_at: now,
        settled: false,
    };
    validate_expense(&expense, &group.members)?;

    let payer_name = group
        .member(&expense.paid_by)
        .map(|member| member.name.clone())
        .unwrap_or_default();
    let actor_name = json.created_by_name.unwrap_or_else(|| json.created_by.clone());
    let activity = new_activity(
        &group.id,
        ActivityType::ExpenseAdded,
        format!(
            "{actor_name} added expense: {} ({} {})",
            expense.description, expense.amount, expense.currency
        ),
        (json.created_by, actor_name),
        Some(json!({ "expenseAmount": expense.amount, "paidBy": payer_name })),
    );

    store.insert_expense(expense.clone()).await?;
    store.insert_activity(activity).await?;
    info!(group = %group.id, expense = %expense.id, amount = %expense.amount, "expense added");
    Ok(HttpResponse::Created().json(expense))
}

#[get("/groups/{id}/expenses")]
async fn list_expenses(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (_, expenses) = load_snapshot(&store, &id).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[delete("/groups/{id}/expenses/{expense_id}")]
async fn delete_expense(
    store: Store,
    path: web::Path<(String, String)>,
    actor: web::Query<ActorQuery>,
) -> Result<HttpResponse, ApiError> {
    let (group_id, expense_id) = path.into_inner();
    load_group(&store, &group_id).await?;
    if !store.delete_expense(&group_id, &expense_id).await? {
        return Err(ApiError::NotFound(format!("Couldn't find expense {expense_id}")));
    }
    let actor = actor.actor();
    let activity = new_activity(
        &group_id,
        ActivityType::ExpenseDeleted,
        format!("{} deleted an expense", actor.1),
        actor,
        Some(json!({ "expenseId": expense_id })),
    );
    store.insert_activity(activity).await?;
    info!(group = %group_id, expense = %expense_id, "expense deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[get("/groups/{id}/balance")]
async fn get_balance(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (group, expenses) = load_snapshot(&store, &id).await?;
    Ok(HttpResponse::Ok().json(calculate_member_balances(&expenses, &group.members)))
}

#[get("/groups/{id}/settlements")]
async fn get_settlements(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (group, expenses) = load_snapshot(&store, &id).await?;
    let balances = calculate_member_balances(&expenses, &group.members);
    let settlements = get_settlement_suggestions(&balances);
    debug!(
        group = %group.id,
        expenses = expenses.len(),
        settlements = settlements.len(),
        "settlements planned"
    );
    Ok(HttpResponse::Ok().json(settlements))
}

#[get("/groups/{id}/activities")]
async fn list_activities(
    store: Store,
    id: web::Path<String>,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, ApiError> {
    load_group(&store, &id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Ok(HttpResponse::Ok().json(store.recent_activities(&id, limit).await?))
}

#[get("/groups/{id}/summary")]
async fn get_summary(store: Store, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let (group, expenses) = load_snapshot(&store, &id).await?;
    Ok(HttpResponse::Ok().json(summarize(&expenses, &group.members)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_group)
        .service(get_group)
        .service(list_user_groups)
        .service(delete_group)
        .service(remove_member)
        .service(add_expense)
        .service(list_expenses)
        .service(delete_expense)
        .service(get_balance)
        .service(get_settlements)
        .service(list_activities)
        .service(get_summary);
}
