use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // News: index on category_id
        manager
            .create_index(
                Index::create()
                    .name("idx_news_category")
                    .table(News::Table)
                    .col(News::CategoryId)
                    .to_owned(),
            )
            .await?;

        // Comment: listing is always scoped to one news row
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_news")
                    .table(Comment::Table)
                    .col(Comment::NewsId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_user")
                    .table(Comment::Table)
                    .col(Comment::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_news_category").table(News::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_comment_news").table(Comment::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_comment_user").table(Comment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum News { Table, CategoryId }

#[derive(DeriveIden)]
enum Comment { Table, NewsId, UserId }
