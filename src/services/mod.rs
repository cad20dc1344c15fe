use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;

use crate::errors::ServiceError;

pub mod alerts;
pub mod document_sequence;
pub mod fitting;
pub mod inventory_checks;
pub mod inventory_ledger;
pub mod members;
pub mod products;
pub mod purchase_orders;
pub mod qr_code;
pub mod receiving;
pub mod returns;
pub mod sales;
pub mod stores;
pub mod suppliers;
pub mod users;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// One-based page selection shared by every list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page index as expected by sea-orm paginators.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `{ total, items }` list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T> {
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn new(total: u64, items: Vec<T>) -> Self {
        Self { total, items }
    }
}

/// Runs a paginated select and wraps it in a [`ListResult`].
pub(crate) async fn fetch_page<C, E>(
    conn: &C,
    select: Select<E>,
    page: PageRequest,
) -> Result<ListResult<E::Model>, ServiceError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync,
{
    let paginator = select.paginate(conn, page.page_size);
    let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
    let items = paginator
        .fetch_page(page.index())
        .await
        .map_err(ServiceError::db_error)?;
    Ok(ListResult::new(total, items))
}

pub(crate) fn amount_overflow(what: &str) -> ServiceError {
    ServiceError::ValidationError(format!("{} is out of range", what))
}

/// `quantity × price`, rejecting amounts a `Decimal` cannot hold.
pub(crate) fn line_amount(quantity: i32, price: Decimal) -> Result<Decimal, ServiceError> {
    Decimal::from(quantity)
        .checked_mul(price)
        .ok_or_else(|| amount_overflow("line amount"))
}

/// Sum of `amounts`, rejecting totals a `Decimal` cannot hold.
pub(crate) fn checked_total<I>(amounts: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Result<Decimal, ServiceError>>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount?)
            .ok_or_else(|| amount_overflow("total amount"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn page_request_defaults_to_first_page_of_ten() {
        let page = PageRequest::default();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.index(), 0);
    }

    #[test]
    fn page_request_clamps_bad_input() {
        let page = PageRequest::new(Some(0), Some(10_000));
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn line_amount_multiplies_quantity_and_price() {
        assert_eq!(
            line_amount(3, Decimal::new(1999, 2)).ok(),
            Some(Decimal::new(5997, 2))
        );
    }

    #[test]
    fn oversized_amounts_are_validation_errors() {
        assert_matches!(
            line_amount(10, Decimal::MAX),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            checked_total([Ok(Decimal::MAX), Ok(Decimal::ONE)]),
            Err(ServiceError::ValidationError(_))
        );
    }
}
