use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        fitting_record::{self, Entity as FittingRecordEntity},
        fitting_room::{self, Entity as FittingRoomEntity, FittingRoomStatus},
        product::Entity as ProductEntity,
        store::Entity as StoreEntity,
    },
    errors::ServiceError,
    services::{fetch_page, members::find_member, ListResult, PageRequest},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFittingRoomInput {
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 20, message = "Room number is required"))]
    pub room_number: String,
    pub status: Option<FittingRoomStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFittingRoomInput {
    #[validate(length(min = 1, max = 20))]
    pub room_number: Option<String>,
    pub status: Option<FittingRoomStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFittingRecordInput {
    pub member_id: Uuid,
    pub product_id: Uuid,
    pub fitting_room_id: Uuid,
    pub store_id: Uuid,
    pub body_height: Option<Decimal>,
    pub body_weight: Option<Decimal>,
    pub shoulder_width: Option<Decimal>,
    pub bust_size: Option<Decimal>,
    pub waist_size: Option<Decimal>,
    pub hip_size: Option<Decimal>,
    #[validate(length(max = 500))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFittingRecordInput {
    pub fitting_room_id: Option<Uuid>,
    #[validate(range(min = 1, max = 5))]
    pub satisfaction_level: Option<i32>,
    pub body_height: Option<Decimal>,
    pub body_weight: Option<Decimal>,
    pub shoulder_width: Option<Decimal>,
    pub bust_size: Option<Decimal>,
    pub waist_size: Option<Decimal>,
    pub hip_size: Option<Decimal>,
    #[validate(length(max = 500))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CompleteFittingInput {
    #[validate(range(min = 1, max = 5, message = "Satisfaction must be between 1 and 5"))]
    pub satisfaction_level: i32,
    #[validate(length(max = 500))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FittingRoomFilter {
    pub store_id: Option<Uuid>,
    pub status: Option<FittingRoomStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct FittingRecordFilter {
    pub member_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

async fn find_room<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<fitting_room::Model, ServiceError> {
    FittingRoomEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Fitting room", id))
}

async fn find_record<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<fitting_record::Model, ServiceError> {
    FittingRecordEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Fitting record", id))
}

async fn set_room_status<C: ConnectionTrait>(
    conn: &C,
    room: fitting_room::Model,
    status: FittingRoomStatus,
) -> Result<fitting_room::Model, ServiceError> {
    let mut active: fitting_room::ActiveModel = room.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)
}

async fn occupy<C: ConnectionTrait>(conn: &C, room_id: Uuid) -> Result<(), ServiceError> {
    let room = find_room(conn, room_id).await?;
    if room.status != FittingRoomStatus::Available {
        return Err(ServiceError::InvalidOperation(format!(
            "fitting room {} is {}",
            room.room_number, room.status
        )));
    }
    set_room_status(conn, room, FittingRoomStatus::Occupied).await?;
    Ok(())
}

async fn release<C: ConnectionTrait>(conn: &C, room_id: Uuid) -> Result<(), ServiceError> {
    let room = find_room(conn, room_id).await?;
    if room.status == FittingRoomStatus::Occupied {
        set_room_status(conn, room, FittingRoomStatus::Available).await?;
    }
    Ok(())
}

/// Fitting rooms and the try-on sessions held in them.
#[derive(Clone)]
pub struct FittingService {
    db: Arc<DatabaseConnection>,
}

impl FittingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_room(
        &self,
        input: CreateFittingRoomInput,
    ) -> Result<fitting_room::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;
        StoreEntity::find_by_id(input.store_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Store", input.store_id))?;

        let now = Utc::now();
        let room = fitting_room::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(input.store_id),
            room_number: Set(input.room_number),
            status: Set(input.status.unwrap_or(FittingRoomStatus::Available)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;
        info!(room_id = %room.id, "Fitting room created");
        Ok(room)
    }

    pub async fn list_rooms(
        &self,
        filter: FittingRoomFilter,
        page: PageRequest,
    ) -> Result<ListResult<fitting_room::Model>, ServiceError> {
        let mut query = FittingRoomEntity::find();
        if let Some(store_id) = filter.store_id {
            query = query.filter(fitting_room::Column::StoreId.eq(store_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(fitting_room::Column::Status.eq(status));
        }
        let query = query.order_by_asc(fitting_room::Column::RoomNumber);
        fetch_page(&*self.db, query, page).await
    }

    pub async fn get_room(&self, id: Uuid) -> Result<fitting_room::Model, ServiceError> {
        find_room(&*self.db, id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_room(
        &self,
        id: Uuid,
        input: UpdateFittingRoomInput,
    ) -> Result<fitting_room::Model, ServiceError> {
        input.validate()?;
        let room = find_room(&*self.db, id).await?;
        let mut active: fitting_room::ActiveModel = room.into();
        if let Some(room_number) = input.room_number {
            active.room_number = Set(room_number);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());
        let room = active.update(&*self.db).await.map_err(ServiceError::db_error)?;
        info!(room_id = %id, status = %room.status, "Fitting room updated");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn delete_room(&self, id: Uuid) -> Result<(), ServiceError> {
        let room = find_room(&*self.db, id).await?;
        if room.status == FittingRoomStatus::Occupied {
            return Err(ServiceError::InvalidOperation(format!(
                "fitting room {} is occupied",
                room.room_number
            )));
        }
        FittingRoomEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(room_id = %id, "Fitting room deleted");
        Ok(())
    }

    /// Opens a session: the room must be available and becomes occupied.
    #[instrument(skip(self, input), fields(room_id = %input.fitting_room_id))]
    pub async fn create_record(
        &self,
        input: CreateFittingRecordInput,
    ) -> Result<fitting_record::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        find_member(&txn, input.member_id).await?;
        ProductEntity::find_by_id(input.product_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Product", input.product_id))?;
        StoreEntity::find_by_id(input.store_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Store", input.store_id))?;
        occupy(&txn, input.fitting_room_id).await?;

        let now = Utc::now();
        let record = fitting_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            member_id: Set(input.member_id),
            product_id: Set(input.product_id),
            fitting_room_id: Set(input.fitting_room_id),
            store_id: Set(input.store_id),
            satisfaction_level: Set(None),
            body_height: Set(input.body_height),
            body_weight: Set(input.body_weight),
            shoulder_width: Set(input.shoulder_width),
            bust_size: Set(input.bust_size),
            waist_size: Set(input.waist_size),
            hip_size: Set(input.hip_size),
            comments: Set(input.comments),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(record_id = %record.id, "Fitting session started");
        Ok(record)
    }

    pub async fn list_records(
        &self,
        filter: FittingRecordFilter,
        page: PageRequest,
    ) -> Result<ListResult<fitting_record::Model>, ServiceError> {
        let mut query = FittingRecordEntity::find();
        if let Some(member_id) = filter.member_id {
            query = query.filter(fitting_record::Column::MemberId.eq(member_id));
        }
        if let Some(store_id) = filter.store_id {
            query = query.filter(fitting_record::Column::StoreId.eq(store_id));
        }
        if let Some(product_id) = filter.product_id {
            query = query.filter(fitting_record::Column::ProductId.eq(product_id));
        }
        let query = query.order_by_desc(fitting_record::Column::CreatedAt);
        fetch_page(&*self.db, query, page).await
    }

    pub async fn get_record(&self, id: Uuid) -> Result<fitting_record::Model, ServiceError> {
        find_record(&*self.db, id).await
    }

    /// Edits a session; moving it to another room frees the old room.
    #[instrument(skip(self, input))]
    pub async fn update_record(
        &self,
        id: Uuid,
        input: UpdateFittingRecordInput,
    ) -> Result<fitting_record::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let record = find_record(&txn, id).await?;

        let mut active: fitting_record::ActiveModel = record.clone().into();
        if let Some(room_id) = input.fitting_room_id.filter(|r| *r != record.fitting_room_id) {
            if record.completed_at.is_some() {
                return Err(ServiceError::InvalidOperation(
                    "a completed fitting cannot change rooms".to_string(),
                ));
            }
            occupy(&txn, room_id).await?;
            release(&txn, record.fitting_room_id).await?;
            active.fitting_room_id = Set(room_id);
        }
        if input.satisfaction_level.is_some() {
            active.satisfaction_level = Set(input.satisfaction_level);
        }
        if input.body_height.is_some() {
            active.body_height = Set(input.body_height);
        }
        if input.body_weight.is_some() {
            active.body_weight = Set(input.body_weight);
        }
        if input.shoulder_width.is_some() {
            active.shoulder_width = Set(input.shoulder_width);
        }
        if input.bust_size.is_some() {
            active.bust_size = Set(input.bust_size);
        }
        if input.waist_size.is_some() {
            active.waist_size = Set(input.waist_size);
        }
        if input.hip_size.is_some() {
            active.hip_size = Set(input.hip_size);
        }
        if input.comments.is_some() {
            active.comments = Set(input.comments);
        }
        active.updated_at = Set(Utc::now());
        let record = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(record)
    }

    /// Closes a session and frees its room in one transaction.
    #[instrument(skip(self, input))]
    pub async fn complete_record(
        &self,
        id: Uuid,
        input: CompleteFittingInput,
    ) -> Result<fitting_record::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let record = find_record(&txn, id).await?;
        if record.completed_at.is_some() {
            return Err(ServiceError::InvalidOperation(
                "fitting has already been completed".to_string(),
            ));
        }
        let room_id = record.fitting_room_id;

        let now = Utc::now();
        let mut active: fitting_record::ActiveModel = record.into();
        active.satisfaction_level = Set(Some(input.satisfaction_level));
        if input.comments.is_some() {
            active.comments = Set(input.comments);
        }
        active.completed_at = Set(Some(now));
        active.updated_at = Set(now);
        let record = active.update(&txn).await.map_err(ServiceError::db_error)?;
        release(&txn, room_id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(record_id = %id, room_id = %room_id, "Fitting session completed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfaction_outside_range_fails_validation() {
        let input = CompleteFittingInput {
            satisfaction_level: 6,
            comments: None,
        };
        assert!(input.validate().is_err());
        let input = CompleteFittingInput {
            satisfaction_level: 5,
            comments: Some("fits well".into()),
        };
        assert!(input.validate().is_ok());
    }
}
