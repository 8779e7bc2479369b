//! Repository structs, one per aggregate or table group.

mod addon_repo;
mod cleanup_queue_repo;
mod contractor_repo;
mod dictionary_repo;
mod file_repo;
mod merge_repo;
mod service_point_repo;
mod suggestion_repo;
mod user_repo;

pub use addon_repo::AddonRepo;
pub use cleanup_queue_repo::CleanupQueueRepo;
pub use contractor_repo::ContractorRepo;
pub use dictionary_repo::DictionaryRepo;
pub use file_repo::FileRepo;
pub use merge_repo::{DirectEditOutcome, MergeRepo, ReviewOutcome, ReviewRequest};
pub use service_point_repo::ServicePointRepo;
pub use suggestion_repo::SuggestionRepo;
pub use user_repo::UserRepo;

use fieldcrm_core::fields::FieldValue;
use sqlx::{Postgres, QueryBuilder};

/// Append `<column> = <bound value>` to a partial UPDATE.
pub(crate) fn push_assignment(
    qb: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    value: &FieldValue,
) {
    qb.push(column).push(" = ");
    match value {
        FieldValue::Text(text) => qb.push_bind(text.clone()),
        FieldValue::Integer(n) => qb.push_bind(*n),
        FieldValue::Boolean(b) => qb.push_bind(*b),
        FieldValue::Reference(id) => qb.push_bind(*id),
        FieldValue::Status(status) => qb.push_bind(status.as_str()),
    };
}
