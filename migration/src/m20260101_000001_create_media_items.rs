use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create media_items table; url carries the unique business key,
        // id is the surrogate identity.
        manager
            .create_table(
                Table::create()
                    .table(MediaItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MediaItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MediaItems::Url)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MediaItems::Title).string().not_null())
                    .col(ColumnDef::new(MediaItems::PicPath).string())
                    .col(ColumnDef::new(MediaItems::VidPath).string())
                    .col(
                        ColumnDef::new(MediaItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MediaItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MediaItems {
    Table,
    Id,
    Url,
    Title,
    PicPath,
    VidPath,
    CreatedAt,
}
