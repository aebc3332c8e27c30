pub mod origination;
pub mod query;
pub mod reconciliation;
