// Catalog
pub mod product;
pub mod store;
pub mod supplier;

// Stock ledger
pub mod document_sequence;
pub mod inventory;
pub mod inventory_transaction;

// Purchasing
pub mod purchase_order;
pub mod purchase_order_item;
pub mod purchase_receiving;
pub mod purchase_receiving_item;

// Sales
pub mod negotiation_record;
pub mod return_order;
pub mod return_order_item;
pub mod sales_order;
pub mod sales_order_item;

// Stocktakes and alerts
pub mod inventory_alert;
pub mod inventory_check;
pub mod inventory_check_adjustment;
pub mod inventory_check_item;
pub mod inventory_threshold;

// Members and fitting
pub mod fitting_record;
pub mod fitting_room;
pub mod member;
pub mod points_transaction;
