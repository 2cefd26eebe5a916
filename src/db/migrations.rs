pub mod api_cache;
pub mod bookmark;
pub mod sentiment;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(api_cache::Migration),
            Box::new(bookmark::Migration),
            Box::new(sentiment::Migration),
        ]
    }
}
