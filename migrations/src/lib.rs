pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_catalog_tables;
mod m20240101_000002_create_inventory_tables;
mod m20240101_000003_create_purchasing_tables;
mod m20240101_000004_create_member_tables;
mod m20240101_000005_create_sales_tables;
mod m20240101_000006_create_inventory_check_tables;
mod m20240101_000007_create_alert_tables;
mod m20240101_000008_create_fitting_tables;
mod m20240101_000009_create_users_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_inventory_tables::Migration),
            Box::new(m20240101_000003_create_purchasing_tables::Migration),
            Box::new(m20240101_000004_create_member_tables::Migration),
            Box::new(m20240101_000005_create_sales_tables::Migration),
            Box::new(m20240101_000006_create_inventory_check_tables::Migration),
            Box::new(m20240101_000007_create_alert_tables::Migration),
            Box::new(m20240101_000008_create_fitting_tables::Migration),
            Box::new(m20240101_000009_create_users_table::Migration),
        ]
    }
}
