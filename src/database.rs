use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, sqlx::PgPool};

pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = Database::connect(db_url).await?;
    Migrator::up(&db, None).await?;

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}
