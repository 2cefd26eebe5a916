use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "bookmark_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookmarks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookmarks::UserId).integer().not_null())
                    .col(ColumnDef::new(Bookmarks::CoinId).string().not_null())
                    .primary_key(Index::create().col(Bookmarks::UserId).col(Bookmarks::CoinId))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookmarks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookmarks {
    Table,
    UserId,
    CoinId,
}
