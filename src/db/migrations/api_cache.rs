use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "api_cache_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiCache::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ApiCache::CacheKey).string().not_null().primary_key())
                    .col(ColumnDef::new(ApiCache::Data).json().not_null())
                    .col(ColumnDef::new(ApiCache::CachedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiCache::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ApiCache {
    Table,
    CacheKey,
    Data,
    CachedAt,
}
