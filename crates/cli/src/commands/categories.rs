//! Category maintenance.

use shoply_server::db::CategoryRepository;

use super::{CommandError, connect};

/// Renumber every sibling group to `0, 10, 20, ...`, keeping the current
/// order.
pub async fn normalize() -> Result<(), CommandError> {
    let pool = connect().await?;

    let changed = CategoryRepository::new(&pool).normalize_all().await?;
    tracing::info!(changed, "Category order normalized");
    Ok(())
}
