pub mod categories;
pub mod dashboard;
pub mod events;
pub mod metrics;
pub mod participants;
