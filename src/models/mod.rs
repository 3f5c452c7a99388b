pub mod category;
pub mod event;
pub mod participant;

use serde::Serialize;

/// Page context for the "are you sure?" step of a delete.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmDelete<T> {
    pub model_name: &'static str,
    pub object: T,
}
