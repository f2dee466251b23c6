pub mod monitoring;
pub mod reconcile;
