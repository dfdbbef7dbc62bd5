pub use sea_orm_migration::prelude::*;

mod iden;
mod m20250301_000001_create_principal_tables;
mod m20250301_000002_create_token_tables;
mod m20250315_000001_create_event_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_principal_tables::Migration),
            Box::new(m20250301_000002_create_token_tables::Migration),
            Box::new(m20250315_000001_create_event_tables::Migration),
        ]
    }
}
