use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "coin_sentiment_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CoinSentiment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CoinSentiment::UserId).integer().not_null())
                    .col(ColumnDef::new(CoinSentiment::CoinId).string().not_null())
                    .col(ColumnDef::new(CoinSentiment::Vote).small_integer().not_null())
                    .col(
                        ColumnDef::new(CoinSentiment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CoinSentiment::UserId)
                            .col(CoinSentiment::CoinId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-coin_sentiment-coin_id")
                    .table(CoinSentiment::Table)
                    .col(CoinSentiment::CoinId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CoinSentiment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CoinSentiment {
    Table,
    UserId,
    CoinId,
    Vote,
    CreatedAt,
}
