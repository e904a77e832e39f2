use mira_core::error::CoreError;

/// Error returned by repository operations that enforce domain rules inside
/// a transaction.
///
/// Domain failures roll the transaction back before any write is committed.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
