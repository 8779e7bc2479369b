//! Domain logic for the contractor suggestion workflow.
//!
//! Nothing in this crate talks to the database or the network. Storage,
//! HTTP and transactions live in `fieldcrm-db` and `fieldcrm-api`.

pub mod acceptance;
pub mod changeset;
pub mod diff;
pub mod error;
pub mod fields;
pub mod files;
pub mod merge;
pub mod permissions;
pub mod snapshot;
pub mod storage;
pub mod suggestion;
pub mod types;
