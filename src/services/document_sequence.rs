use chrono::{NaiveDate, Utc};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};

use crate::{
    entities::document_sequence::{self, Entity as DocumentSequenceEntity},
    errors::ServiceError,
};

/// Document families that get a daily running number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPrefix {
    PurchaseOrder,
    Receiving,
    SalesOrder,
    ReturnOrder,
    InventoryCheck,
}

impl DocumentPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentPrefix::PurchaseOrder => "PO",
            DocumentPrefix::Receiving => "GR",
            DocumentPrefix::SalesOrder => "SO",
            DocumentPrefix::ReturnOrder => "RT",
            DocumentPrefix::InventoryCheck => "IC",
        }
    }
}

/// `{PREFIX}{YYYYMMDD}-{NNNN}`; the counter widens past four digits instead of wrapping.
pub fn format_document_number(prefix: DocumentPrefix, day: NaiveDate, value: i64) -> String {
    format!("{}{}-{:04}", prefix.as_str(), day.format("%Y%m%d"), value)
}

/// Allocates the next number for `prefix` on today's date.
///
/// Must run on the caller's transaction: the counter row is created if missing,
/// bumped with a single `UPDATE ... SET last_value = last_value + 1`, then read
/// back. The row stays locked until commit, so concurrent callers serialize on
/// it instead of both reading the same last value. A rollback also rolls the
/// counter back, which can leave gaps but never duplicates.
pub async fn next_document_number<C: ConnectionTrait>(
    conn: &C,
    prefix: DocumentPrefix,
) -> Result<String, ServiceError> {
    let today = Utc::now().date_naive();
    let day = today.format("%Y%m%d").to_string();

    DocumentSequenceEntity::insert(document_sequence::ActiveModel {
        prefix: Set(prefix.as_str().to_string()),
        day: Set(day.clone()),
        last_value: Set(0),
    })
    .on_conflict(
        OnConflict::columns([
            document_sequence::Column::Prefix,
            document_sequence::Column::Day,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await
    .map_err(ServiceError::db_error)?;

    DocumentSequenceEntity::update_many()
        .col_expr(
            document_sequence::Column::LastValue,
            Expr::col(document_sequence::Column::LastValue).add(1),
        )
        .filter(document_sequence::Column::Prefix.eq(prefix.as_str()))
        .filter(document_sequence::Column::Day.eq(day.as_str()))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let sequence = DocumentSequenceEntity::find_by_id((prefix.as_str().to_string(), day.clone()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "document sequence {}/{} missing after increment",
                prefix.as_str(),
                day
            ))
        })?;

    Ok(format_document_number(prefix, today, sequence.last_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(
            format_document_number(DocumentPrefix::PurchaseOrder, day(), 1),
            "PO20240101-0001"
        );
        assert_eq!(
            format_document_number(DocumentPrefix::Receiving, day(), 42),
            "GR20240101-0042"
        );
    }

    #[test]
    fn numbers_widen_past_four_digits() {
        assert_eq!(
            format_document_number(DocumentPrefix::SalesOrder, day(), 12345),
            "SO20240101-12345"
        );
    }

    #[test]
    fn every_family_has_a_distinct_prefix() {
        let prefixes = [
            DocumentPrefix::PurchaseOrder,
            DocumentPrefix::Receiving,
            DocumentPrefix::SalesOrder,
            DocumentPrefix::ReturnOrder,
            DocumentPrefix::InventoryCheck,
        ]
        .map(|p| p.as_str());
        let unique: std::collections::HashSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }
}
