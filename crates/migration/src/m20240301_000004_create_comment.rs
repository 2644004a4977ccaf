//! Create `comment` table with FKs to `news` and `user`.
//!
//! Both references cascade: comments vanish with their news or their author.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(pk_auto(Comment::Id))
                    .col(string_len(Comment::Text, 1000).not_null())
                    .col(
                        timestamp_with_time_zone(Comment::Created)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Comment::Updated)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(integer(Comment::NewsId).not_null())
                    .col(uuid(Comment::UserId).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_news")
                            .from(Comment::Table, Comment::NewsId)
                            .to(News::Table, News::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_user")
                            .from(Comment::Table, Comment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Comment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Comment { Table, Id, Text, Created, Updated, NewsId, UserId }

#[derive(DeriveIden)]
enum News { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
