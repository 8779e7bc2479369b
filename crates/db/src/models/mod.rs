//! Row structs (`FromRow`) and create DTOs, one module per table group.

pub mod addon;
pub mod cleanup;
pub mod contractor;
pub mod dictionary;
pub mod file;
pub mod service_point;
pub mod suggestion;
pub mod user;
