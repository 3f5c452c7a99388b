use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref WRITES_COUNTER: CounterVec = register_counter_vec!(
        "event_admin_writes_total",
        "Successful writes by entity and action",
        &["entity", "action"]
    ).unwrap();

    pub static ref DASHBOARD_VIEWS_COUNTER: CounterVec = register_counter_vec!(
        "event_admin_dashboard_views_total",
        "Dashboard renders by effective filter",
        &["filter"]
    ).unwrap();
}

pub fn record_write(entity: &str, action: &str) {
    WRITES_COUNTER.with_label_values(&[entity, action]).inc();
}

pub fn record_dashboard_view(filter: &str) {
    DASHBOARD_VIEWS_COUNTER.with_label_values(&[filter]).inc();
}
