//! Initial schema: users and books

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Username, 255).not_null())
                    // Case-insensitive uniqueness lives in the database, not in a lookup
                    .col(string_len(User::UsernameKey, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::Role, 32).not_null().default("User"))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Book::Table)
                    .if_not_exists()
                    .col(pk_auto(Book::Id))
                    .col(string_len(Book::Title, 255).not_null())
                    .col(string_len(Book::Author, 255).not_null())
                    .col(text(Book::Description).not_null().default(""))
                    .col(string_len(Book::Category, 100).not_null().default(""))
                    .col(
                        timestamp_with_time_zone(Book::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Book::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_books_category")
                    .table(Book::Table)
                    .col(Book::Category)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Book::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Username,
    UsernameKey,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Book {
    #[sea_orm(iden = "books")]
    Table,
    Id,
    Title,
    Author,
    Description,
    Category,
    CreatedAt,
    UpdatedAt,
}
