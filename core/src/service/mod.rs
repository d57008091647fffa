pub mod aggregate;
pub mod backup;
pub mod report;
pub mod store;
