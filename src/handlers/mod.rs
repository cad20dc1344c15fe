pub mod alerts;
pub mod auth;
pub mod common;
pub mod fitting;
pub mod inventory;
pub mod inventory_checks;
pub mod members;
pub mod products;
pub mod purchase_orders;
pub mod receiving;
pub mod returns;
pub mod sales;
pub mod stores;
pub mod suppliers;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    services::{
        alerts::AlertService, fitting::FittingService, inventory_checks::InventoryCheckService,
        inventory_ledger::InventoryLedgerService, members::MemberService,
        products::ProductService, purchase_orders::PurchaseOrderService,
        qr_code::{QrCodeService, QrCodeSigner},
        receiving::ReceivingService, returns::ReturnService, sales::SalesService,
        stores::StoreService, suppliers::SupplierService, users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub products: Arc<ProductService>,
    pub qr_codes: Arc<QrCodeService>,
    pub stores: Arc<StoreService>,
    pub suppliers: Arc<SupplierService>,
    pub inventory: Arc<InventoryLedgerService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub receiving: Arc<ReceivingService>,
    pub sales: Arc<SalesService>,
    pub returns: Arc<ReturnService>,
    pub inventory_checks: Arc<InventoryCheckService>,
    pub alerts: Arc<AlertService>,
    pub members: Arc<MemberService>,
    pub fitting: Arc<FittingService>,
}

impl AppServices {
    /// Wires every service against one pool and the settings in `config`.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig, auth_service: Arc<AuthService>) -> Self {
        let signer = QrCodeSigner::new(config.qr_code_secret());

        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                auth_service,
                config.login_policy(),
                config.token_lifetimes(),
            )),
            products: Arc::new(ProductService::new(db_pool.clone())),
            qr_codes: Arc::new(QrCodeService::new(db_pool.clone(), signer.clone())),
            stores: Arc::new(StoreService::new(db_pool.clone())),
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            inventory: Arc::new(InventoryLedgerService::new(db_pool.clone())),
            purchase_orders: Arc::new(PurchaseOrderService::new(db_pool.clone())),
            receiving: Arc::new(ReceivingService::new(db_pool.clone())),
            sales: Arc::new(SalesService::new(
                db_pool.clone(),
                signer.clone(),
                config.points_policy(),
            )),
            returns: Arc::new(ReturnService::new(db_pool.clone(), signer)),
            inventory_checks: Arc::new(InventoryCheckService::new(db_pool.clone())),
            alerts: Arc::new(AlertService::new(
                db_pool.clone(),
                config.threshold_defaults(),
            )),
            members: Arc::new(MemberService::new(db_pool.clone())),
            fitting: Arc::new(FittingService::new(db_pool)),
        }
    }
}
