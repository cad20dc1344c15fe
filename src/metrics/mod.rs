//! Prometheus counters for the business events worth alerting on.
//!
//! Every counter is registered on [`REGISTRY`] the first time it is touched and
//! exported as text by [`render`] at `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
}

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("retail_pos".into()), None)
        .expect("registry can be created");

    pub static ref PURCHASE_ORDERS_CREATED: IntCounter = counter(
        "purchase_orders_created_total",
        "Total number of purchase orders created"
    );
    pub static ref RECEIVINGS_CREATED: IntCounter = counter(
        "receivings_created_total",
        "Total number of purchase receivings recorded"
    );
    pub static ref RECEIVINGS_REVERSED: IntCounter = counter(
        "receivings_reversed_total",
        "Total number of purchase receivings reversed"
    );
    pub static ref SALES_ORDERS_CREATED: IntCounter = counter(
        "sales_orders_created_total",
        "Total number of sales orders created"
    );
    pub static ref SALES_ORDERS_REJECTED_FOR_STOCK: IntCounter = counter(
        "sales_orders_rejected_for_stock_total",
        "Total number of sales orders rejected because stock was insufficient"
    );
    pub static ref RETURN_ORDERS_CREATED: IntCounter = counter(
        "return_orders_created_total",
        "Total number of return and exchange orders created"
    );
    pub static ref ADJUSTMENTS_APPROVED: IntCounter = counter(
        "inventory_adjustments_approved_total",
        "Total number of stocktake adjustments approved and applied"
    );
    pub static ref ALERTS_RAISED: IntCounterVec = {
        let vec = IntCounterVec::new(
            Opts::new("inventory_alerts_raised_total", "Total number of inventory alerts raised"),
            &["alert_type"],
        )
        .expect("metric can be created");
        REGISTRY
            .register(Box::new(vec.clone()))
            .expect("metric can be registered");
        vec
    };
    pub static ref LOGIN_FAILURES: IntCounter = counter(
        "login_failures_total",
        "Total number of failed login attempts"
    );
    pub static ref ACCOUNT_LOCKOUTS: IntCounter = counter(
        "account_lockouts_total",
        "Total number of accounts locked after repeated failures"
    );
}

/// Forces registration so `/metrics` lists every counter from the first scrape.
pub fn init() {
    lazy_static::initialize(&PURCHASE_ORDERS_CREATED);
    lazy_static::initialize(&RECEIVINGS_CREATED);
    lazy_static::initialize(&RECEIVINGS_REVERSED);
    lazy_static::initialize(&SALES_ORDERS_CREATED);
    lazy_static::initialize(&SALES_ORDERS_REJECTED_FOR_STOCK);
    lazy_static::initialize(&RETURN_ORDERS_CREATED);
    lazy_static::initialize(&ADJUSTMENTS_APPROVED);
    lazy_static::initialize(&ALERTS_RAISED);
    lazy_static::initialize(&LOGIN_FAILURES);
    lazy_static::initialize(&ACCOUNT_LOCKOUTS);
}

/// Prometheus text exposition of [`REGISTRY`].
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_lists_registered_counters() {
        init();
        PURCHASE_ORDERS_CREATED.inc();
        ALERTS_RAISED.with_label_values(&["low_stock"]).inc();
        let text = render();
        assert!(text.contains("retail_pos_purchase_orders_created_total"));
        assert!(text.contains("retail_pos_inventory_alerts_raised_total"));
    }
}
