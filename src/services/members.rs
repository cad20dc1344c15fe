use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    prelude::Expr,
    sea_query::{Alias, Func, SimpleExpr},
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        member::{self, Entity as MemberEntity, MemberLevel},
        points_transaction::{self, Entity as PointsTransactionEntity, PointsTransactionType},
    },
    errors::ServiceError,
    services::{fetch_page, ListResult, PageRequest},
};

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BodyMeasurements {
    pub body_height: Option<Decimal>,
    pub body_weight: Option<Decimal>,
    pub shoulder_width: Option<Decimal>,
    pub bust_size: Option<Decimal>,
    pub waist_size: Option<Decimal>,
    pub hip_size: Option<Decimal>,
    pub inseam: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMemberInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 5, max = 20, message = "Phone must be between 5 and 20 characters"))]
    pub phone: String,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub measurements: BodyMeasurements,
    pub style_preference: Option<String>,
    pub favorite_colors: Option<String>,
    pub favorite_categories: Option<String>,
    pub consumption_level: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub measurements: Option<BodyMeasurements>,
    pub style_preference: Option<String>,
    pub favorite_colors: Option<String>,
    pub favorite_categories: Option<String>,
    pub consumption_level: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PointsChangeInput {
    #[validate(range(min = 1, message = "Points must be positive"))]
    pub points: i64,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub level: Option<MemberLevel>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PointsBalance {
    pub member_id: Uuid,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LevelResult {
    pub member_id: Uuid,
    pub level: MemberLevel,
    pub total_spent: Decimal,
}

/// A ledger entry about to be written for a member.
#[derive(Debug, Clone)]
pub struct PointsEntry {
    pub member_id: Uuid,
    pub points: i64,
    pub transaction_type: PointsTransactionType,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub description: Option<String>,
    pub operator_id: Option<Uuid>,
}

/// Sum of a member's points ledger; 0 when the member has no entries.
pub async fn points_balance<C: ConnectionTrait>(
    conn: &C,
    member_id: Uuid,
) -> Result<i64, ServiceError> {
    let balance: Option<Option<i64>> = PointsTransactionEntity::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::cast_as(
                Func::sum(Expr::col(points_transaction::Column::Points)),
                Alias::new("BIGINT"),
            )),
            "balance",
        )
        .filter(points_transaction::Column::MemberId.eq(member_id))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(balance.flatten().unwrap_or(0))
}

/// Appends one entry to the points ledger. Zero-point entries are skipped.
pub async fn record_points<C: ConnectionTrait>(
    conn: &C,
    entry: PointsEntry,
) -> Result<Option<points_transaction::Model>, ServiceError> {
    if entry.points == 0 {
        return Ok(None);
    }
    let model = points_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        member_id: Set(entry.member_id),
        points: Set(entry.points),
        transaction_type: Set(entry.transaction_type),
        reference_id: Set(entry.reference_id),
        reference_type: Set(entry.reference_type),
        description: Set(entry.description),
        operator_id: Set(entry.operator_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(Some(model))
}

pub(crate) async fn find_member<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<member::Model, ServiceError> {
    MemberEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Member", id))
}

async fn ensure_phone_free<C: ConnectionTrait>(
    conn: &C,
    phone: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = MemberEntity::find().filter(member::Column::Phone.eq(phone));
    if let Some(id) = except {
        query = query.filter(member::Column::Id.ne(id));
    }
    let taken = query.one(conn).await.map_err(ServiceError::db_error)?;
    match taken {
        Some(_) => Err(ServiceError::Conflict(format!(
            "a member with phone {} already exists",
            phone
        ))),
        None => Ok(()),
    }
}

fn apply_measurements(active: &mut member::ActiveModel, m: BodyMeasurements) {
    active.body_height = Set(m.body_height);
    active.body_weight = Set(m.body_weight);
    active.shoulder_width = Set(m.shoulder_width);
    active.bust_size = Set(m.bust_size);
    active.waist_size = Set(m.waist_size);
    active.hip_size = Set(m.hip_size);
    active.inseam = Set(m.inseam);
}

#[derive(Clone)]
pub struct MemberService {
    db: Arc<DatabaseConnection>,
}

impl MemberService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_member(
        &self,
        input: CreateMemberInput,
    ) -> Result<member::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        ensure_phone_free(db, &input.phone, None).await?;

        let now = Utc::now();
        let mut active = member::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            phone: Set(input.phone),
            gender: Set(input.gender),
            birthday: Set(input.birthday),
            email: Set(input.email),
            address: Set(input.address),
            level: Set(MemberLevel::Regular),
            total_spent: Set(Decimal::ZERO),
            last_purchase_date: Set(None),
            style_preference: Set(input.style_preference),
            favorite_colors: Set(input.favorite_colors),
            favorite_categories: Set(input.favorite_categories),
            consumption_level: Set(input.consumption_level),
            note: Set(input.note),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_measurements(&mut active, input.measurements);
        let member = active.insert(db).await.map_err(ServiceError::db_error)?;

        info!(member_id = %member.id, "Member created");
        Ok(member)
    }

    #[instrument(skip(self))]
    pub async fn list_members(
        &self,
        filter: MemberFilter,
        page: PageRequest,
    ) -> Result<ListResult<member::Model>, ServiceError> {
        let mut query = MemberEntity::find();
        if let Some(name) = filter.name.filter(|n| !n.is_empty()) {
            query = query.filter(member::Column::Name.contains(name.as_str()));
        }
        if let Some(phone) = filter.phone.filter(|p| !p.is_empty()) {
            query = query.filter(member::Column::Phone.contains(phone.as_str()));
        }
        if let Some(level) = filter.level {
            query = query.filter(member::Column::Level.eq(level));
        }
        let query = query.order_by_desc(member::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get_member(&self, id: Uuid) -> Result<member::Model, ServiceError> {
        find_member(&*self.db, id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_member(
        &self,
        id: Uuid,
        input: UpdateMemberInput,
    ) -> Result<member::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        let member = find_member(db, id).await?;
        if let Some(phone) = input.phone.as_deref() {
            ensure_phone_free(db, phone, Some(id)).await?;
        }

        let mut active: member::ActiveModel = member.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if input.gender.is_some() {
            active.gender = Set(input.gender);
        }
        if input.birthday.is_some() {
            active.birthday = Set(input.birthday);
        }
        if input.email.is_some() {
            active.email = Set(input.email);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        if let Some(measurements) = input.measurements {
            apply_measurements(&mut active, measurements);
        }
        if input.style_preference.is_some() {
            active.style_preference = Set(input.style_preference);
        }
        if input.favorite_colors.is_some() {
            active.favorite_colors = Set(input.favorite_colors);
        }
        if input.favorite_categories.is_some() {
            active.favorite_categories = Set(input.favorite_categories);
        }
        if input.consumption_level.is_some() {
            active.consumption_level = Set(input.consumption_level);
        }
        if input.note.is_some() {
            active.note = Set(input.note);
        }
        active.updated_at = Set(Utc::now());
        let member = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(member_id = %id, "Member updated");
        Ok(member)
    }

    #[instrument(skip(self))]
    pub async fn delete_member(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_member(&txn, id).await?;
        PointsTransactionEntity::delete_many()
            .filter(points_transaction::Column::MemberId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        MemberEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(member_id = %id, "Member deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_points(&self, member_id: Uuid) -> Result<PointsBalance, ServiceError> {
        let db = &*self.db;
        find_member(db, member_id).await?;
        Ok(PointsBalance {
            member_id,
            points: points_balance(db, member_id).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_points_transactions(
        &self,
        member_id: Uuid,
        page: PageRequest,
    ) -> Result<ListResult<points_transaction::Model>, ServiceError> {
        find_member(&*self.db, member_id).await?;
        let query = PointsTransactionEntity::find()
            .filter(points_transaction::Column::MemberId.eq(member_id))
            .order_by_desc(points_transaction::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    #[instrument(skip(self, input), fields(points = input.points))]
    pub async fn add_points(
        &self,
        member_id: Uuid,
        input: PointsChangeInput,
        operator_id: Uuid,
    ) -> Result<PointsBalance, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_member(&txn, member_id).await?;
        record_points(
            &txn,
            PointsEntry {
                member_id,
                points: input.points,
                transaction_type: PointsTransactionType::Adjust,
                reference_id: None,
                reference_type: None,
                description: input.description.or_else(|| Some("manual credit".into())),
                operator_id: Some(operator_id),
            },
        )
        .await?;
        let points = points_balance(&txn, member_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(member_id = %member_id, balance = points, "Points added");
        Ok(PointsBalance { member_id, points })
    }

    #[instrument(skip(self, input), fields(points = input.points))]
    pub async fn deduct_points(
        &self,
        member_id: Uuid,
        input: PointsChangeInput,
        operator_id: Uuid,
    ) -> Result<PointsBalance, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_member(&txn, member_id).await?;
        let balance = points_balance(&txn, member_id).await?;
        if input.points > balance {
            return Err(ServiceError::InsufficientPoints(format!(
                "member has {} points, {} requested",
                balance, input.points
            )));
        }
        record_points(
            &txn,
            PointsEntry {
                member_id,
                points: -input.points,
                transaction_type: PointsTransactionType::Adjust,
                reference_id: None,
                reference_type: None,
                description: input.description.or_else(|| Some("manual debit".into())),
                operator_id: Some(operator_id),
            },
        )
        .await?;
        let points = points_balance(&txn, member_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(member_id = %member_id, balance = points, "Points deducted");
        Ok(PointsBalance { member_id, points })
    }

    /// Recomputes the tier from lifetime spend and stores it.
    #[instrument(skip(self))]
    pub async fn calculate_level(&self, member_id: Uuid) -> Result<LevelResult, ServiceError> {
        let db = &*self.db;
        let member = find_member(db, member_id).await?;
        let level = MemberLevel::for_total_spent(member.total_spent);
        let total_spent = member.total_spent;

        if member.level != level {
            let previous = member.level;
            let mut active: member::ActiveModel = member.into();
            active.level = Set(level);
            active.updated_at = Set(Utc::now());
            active.update(db).await.map_err(ServiceError::db_error)?;
            info!(member_id = %member_id, from = %previous, to = %level, "Member level changed");
        }
        Ok(LevelResult {
            member_id,
            level,
            total_spent,
        })
    }
}
