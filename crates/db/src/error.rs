use fieldcrm_core::error::CoreError;

/// Error returned by repository operations that enforce domain rules inside a
/// transaction (review, merge, suggestion creation).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
