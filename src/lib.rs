//! Personal job-application tracker backed by a local SQLite file.

pub mod db;
pub mod models;
pub mod transfer;
pub mod views;

pub use db::{Database, StoreError, StoreResult};
pub use models::{Application, ApplicationFilter, ApplicationPatch, FieldMap, NewApplication};
