use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Retail POS API",
        version = "1.0.0",
        description = r#"
# Retail POS & Inventory API

Back office and till API for apparel stores: catalog, purchasing and receiving, sales and
returns, stocktakes, stock alerts, members with a points ledger, and fitting rooms.

## Authentication

Log in at `POST /auth/login` and send the returned token on every `/api` call:

```
Authorization: Bearer <your-jwt-token>
```

Mutating endpoints are gated by role (`admin`, `manager`, `staff`, `cashier`). A missing or
invalid token is answered with 401, a role outside the allow-list with 403.

## Errors

Every error uses the same envelope:

```json
{
  "error": "Insufficient stock: product ... has 2, 5 requested",
  "request_id": "0b6c9f1e-...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `page_size` (default 10, max 100; `limit` is
accepted as an alias) and answer `{ "total": n, "items": [...] }`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, registration, tokens and profile"),
        (name = "products", description = "Catalog and product QR codes"),
        (name = "stores", description = "Stores"),
        (name = "suppliers", description = "Suppliers"),
        (name = "inventory", description = "Stock records and the inventory ledger"),
        (name = "purchases", description = "Purchase orders"),
        (name = "receiving", description = "Goods receipts against purchase orders"),
        (name = "sales", description = "Till sales"),
        (name = "returns", description = "Returns and exchanges"),
        (name = "inventory-checks", description = "Stocktakes and adjustments"),
        (name = "alerts", description = "Stock alerts and thresholds"),
        (name = "members", description = "Members and points"),
        (name = "fitting", description = "Fitting rooms and sessions"),
        (name = "health", description = "Health and status")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::register,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::get_profile,
        crate::handlers::auth::update_profile,
        crate::handlers::auth::change_password,

        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::generate_qr_code,
        crate::handlers::stores::list_stores,
        crate::handlers::stores::get_store,
        crate::handlers::stores::create_store,
        crate::handlers::stores::update_store,
        crate::handlers::stores::delete_store,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::set_opening_balance,
        crate::handlers::inventory::transfer_stock,
        crate::handlers::inventory::reconcile_inventory,
        crate::handlers::inventory::list_transactions,
        crate::handlers::inventory::get_transaction,
        crate::handlers::inventory::list_transactions_by_store,
        crate::handlers::inventory::list_transactions_by_product,
        crate::handlers::inventory::create_transaction,

        // Purchasing
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::delete_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,
        crate::handlers::receiving::list_receivings,
        crate::handlers::receiving::get_receiving,
        crate::handlers::receiving::create_receiving,
        crate::handlers::receiving::reverse_receiving,

        // Sales
        crate::handlers::sales::list_sales_orders,
        crate::handlers::sales::get_sales_order,
        crate::handlers::sales::create_sales_order,
        crate::handlers::sales::update_sales_order_status,
        crate::handlers::returns::list_return_orders,
        crate::handlers::returns::get_return_order,
        crate::handlers::returns::create_return_order,
        crate::handlers::returns::update_return_order_status,

        // Stocktakes
        crate::handlers::inventory_checks::list_checks,
        crate::handlers::inventory_checks::get_check,
        crate::handlers::inventory_checks::create_check,
        crate::handlers::inventory_checks::start_check,
        crate::handlers::inventory_checks::complete_check,
        crate::handlers::inventory_checks::cancel_check,
        crate::handlers::inventory_checks::update_check_item,
        crate::handlers::inventory_checks::create_adjustments,
        crate::handlers::inventory_checks::approve_adjustment,

        // Alerts
        crate::handlers::alerts::check_inventory_levels,
        crate::handlers::alerts::list_alerts,
        crate::handlers::alerts::get_alert,
        crate::handlers::alerts::update_alert_status,
        crate::handlers::alerts::list_thresholds,
        crate::handlers::alerts::get_threshold,
        crate::handlers::alerts::create_threshold,
        crate::handlers::alerts::update_threshold,
        crate::handlers::alerts::delete_threshold,

        // Members
        crate::handlers::members::list_members,
        crate::handlers::members::get_member,
        crate::handlers::members::create_member,
        crate::handlers::members::update_member,
        crate::handlers::members::delete_member,
        crate::handlers::members::get_points,
        crate::handlers::members::list_points_transactions,
        crate::handlers::members::add_points,
        crate::handlers::members::deduct_points,
        crate::handlers::members::calculate_level,

        // Fitting
        crate::handlers::fitting::list_rooms,
        crate::handlers::fitting::get_room,
        crate::handlers::fitting::create_room,
        crate::handlers::fitting::update_room,
        crate::handlers::fitting::delete_room,
        crate::handlers::fitting::list_records,
        crate::handlers::fitting::get_record,
        crate::handlers::fitting::create_record,
        crate::handlers::fitting::update_record,
        crate::handlers::fitting::complete_record,

        // Health
        crate::health_check,
        crate::api_status,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::common::MessageResponse,
            crate::HealthResponse,
            crate::StatusResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_routes_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Retail POS API"));
        assert!(json.contains("/api/purchase-receivings"));
        assert!(json.contains("/api/sales/orders"));
        assert!(json.contains("bearer_auth"));
    }
}
