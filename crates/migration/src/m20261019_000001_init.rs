//! Initial schema migration - creates all tables from scratch.
//!
//! - `principals`: every hierarchy participant, one row per principal, with
//!   `kind` as discriminator and the materialized `balance`
//! - `ledger_entries`: the khata book, append-only deposits, withdrawals and
//!   notes
//! - `transactions`: the audit twin of every deposit and withdrawal

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Principals {
    Table,
    Id,
    Kind,
    Username,
    LoginName,
    PasswordHash,
    ParentId,
    WinCommission,
    LossCommission,
    OpeningBalance,
    Balance,
    Blocked,
    CreatedAt,
    LastLoginAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    EventId,
    UserId,
    UserType,
    TransactionType,
    Amount,
    Date,
    Description,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    EventId,
    UserId,
    UserType,
    TransactionType,
    Amount,
    Description,
    CreatedBy,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Principals
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Principals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Principals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Principals::Kind).string().not_null())
                    .col(ColumnDef::new(Principals::Username).string().not_null())
                    .col(ColumnDef::new(Principals::LoginName).string().not_null())
                    .col(ColumnDef::new(Principals::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Principals::ParentId).string())
                    .col(
                        ColumnDef::new(Principals::WinCommission)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(
                                Expr::col(Principals::WinCommission)
                                    .between(0, 10_000),
                            ),
                    )
                    .col(
                        ColumnDef::new(Principals::LossCommission)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(
                                Expr::col(Principals::LossCommission)
                                    .between(0, 10_000),
                            ),
                    )
                    .col(
                        ColumnDef::new(Principals::OpeningBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Principals::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Principals::Blocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Principals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Principals::LastLoginAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-principals-kind-login_name-unique")
                    .table(Principals::Table)
                    .col(Principals::Kind)
                    .col(Principals::LoginName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-principals-parent_id")
                    .table(Principals::Table)
                    .col(Principals::ParentId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Ledger entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::EventId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::UserId).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::UserType).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(LedgerEntries::Amount).gte(0)),
                    )
                    .col(ColumnDef::new(LedgerEntries::Date).date().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(LedgerEntries::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-user_id-user_type")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::UserId)
                    .col(LedgerEntries::UserType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-date")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transaction records
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::EventId).string().not_null())
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::UserType).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Transactions::Amount).gt(0)),
                    )
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-event_id")
                    .table(Transactions::Table)
                    .col(Transactions::EventId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-user_type")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::UserType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Principals::Table).to_owned())
            .await?;
        Ok(())
    }
}
