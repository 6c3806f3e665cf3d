use std::{error::Error, io::Write};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    Actor, BcryptCredentials, Commission, CredentialVerifier, Engine, LedgerEntry, Money,
    NewPrincipal, Principal, PrincipalKind, Target, TransactionCmd, TransactionKind, format_minor,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "khata_admin")]
#[command(about = "Admin utilities for Khata (bootstrap the hierarchy, move money, audit)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./khata.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Principal(PrincipalArgs),
    /// Credit a principal.
    Deposit(MoneyArgs),
    /// Debit a principal. Balances may go negative.
    Withdraw(MoneyArgs),
    /// Print the khata of one principal, most recent first.
    Khata(KhataArgs),
    /// Delete ledger rows by id. Balances are not touched.
    Purge(PurgeArgs),
    /// Check a stored balance against the ledger and the transaction records.
    Reconcile(TargetArgs),
    /// Principals whose parent was deleted.
    Orphans,
    /// Print a bcrypt hash for the `admin.password_hash` setting.
    HashPassword(HashArgs),
}

#[derive(Args, Debug)]
struct PrincipalArgs {
    #[command(subcommand)]
    command: PrincipalCommand,
}

#[derive(Subcommand, Debug)]
enum PrincipalCommand {
    Create(PrincipalCreateArgs),
    List(PrincipalListArgs),
    Block(TargetArgs),
    Unblock(TargetArgs),
    Delete(TargetArgs),
}

#[derive(Args, Debug)]
struct PrincipalCreateArgs {
    #[arg(long, value_parser = parse_kind)]
    kind: PrincipalKind,
    #[arg(long)]
    username: String,
    #[arg(long)]
    login_name: String,
    /// Required for every kind except `superMaster`.
    #[arg(long)]
    parent_id: Option<Uuid>,
    /// Percentage, e.g. `10.5`.
    #[arg(long, default_value = "0")]
    win_commission: Commission,
    #[arg(long, default_value = "0")]
    loss_commission: Commission,
    #[arg(long, default_value = "0")]
    opening_balance: Money,
}

#[derive(Args, Debug)]
struct PrincipalListArgs {
    #[arg(long, value_parser = parse_kind)]
    kind: Option<PrincipalKind>,
}

#[derive(Args, Debug)]
struct TargetArgs {
    #[arg(long, value_parser = parse_kind)]
    kind: PrincipalKind,
    #[arg(long, required_unless_present = "login_name")]
    id: Option<Uuid>,
    #[arg(long, conflicts_with = "id")]
    login_name: Option<String>,
}

impl TargetArgs {
    fn target(&self) -> Result<Target, Box<dyn Error + Send + Sync>> {
        match (&self.id, &self.login_name) {
            (Some(id), _) => Ok(Target::id(self.kind, *id)),
            (None, Some(login_name)) => Ok(Target::login(self.kind, login_name.clone())),
            (None, None) => Err("--id or --login-name required".into()),
        }
    }
}

#[derive(Args, Debug)]
struct MoneyArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Amount in major units, e.g. `250` or `12.50`.
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    description: Option<String>,
    /// Ledger date (`YYYY-MM-DD`), defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct KhataArgs {
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct PurgeArgs {
    #[arg(required = true)]
    ids: Vec<i64>,
}

#[derive(Args, Debug)]
struct HashArgs {
    #[arg(long, default_value_t = 12)]
    cost: u32,
}

fn parse_kind(raw: &str) -> Result<PrincipalKind, String> {
    PrincipalKind::try_from(raw).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_principal(p: &Principal) {
    println!(
        "{}\t{}\t{}\t{}\tbalance={}\twin={}\tloss={}{}",
        p.kind,
        p.id,
        p.login_name,
        p.username,
        Money::new(p.balance),
        p.win_commission,
        p.loss_commission,
        if p.blocked { "\tblocked" } else { "" }
    );
}

fn print_entry(e: &LedgerEntry) {
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        e.id,
        e.date,
        e.kind.as_str(),
        Money::new(e.amount),
        e.created_by,
        e.description
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Command::HashPassword(args) = &cli.command {
        let password = prompt_password_twice()?;
        println!("{}", BcryptCredentials::new(args.cost).hash_password(&password)?);
        return Ok(());
    }

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    // Local database access carries the admin's authority.
    let admin = Actor::Admin;

    match cli.command {
        Command::Principal(PrincipalArgs { command }) => match command {
            PrincipalCommand::Create(args) => {
                let password = prompt_password_twice()?;
                let mut cmd = NewPrincipal::new(args.kind, args.username, args.login_name, password)
                    .commissions(args.win_commission, args.loss_commission)
                    .opening_balance(args.opening_balance.minor());
                if let Some(parent_id) = args.parent_id {
                    cmd = cmd.parent(parent_id);
                }
                let principal = engine.create_principal(&admin, cmd).await?;
                println!("created {}: {} ({})", principal.kind, principal.login_name, principal.id);
            }
            PrincipalCommand::List(args) => {
                for principal in engine.subordinates_of(&admin, args.kind).await? {
                    print_principal(&principal);
                }
            }
            PrincipalCommand::Block(args) => {
                let principal = engine.block_principal(&admin, &args.target()?).await?;
                println!("blocked {}", principal.reference());
            }
            PrincipalCommand::Unblock(args) => {
                let principal = engine.unblock_principal(&admin, &args.target()?).await?;
                println!("unblocked {}", principal.reference());
            }
            PrincipalCommand::Delete(args) => {
                let target = args.target()?;
                engine.delete_principal(&admin, &target).await?;
                println!("deleted {target}");
            }
        },
        Command::Deposit(args) => move_money(&engine, &admin, TransactionKind::Deposit, args).await?,
        Command::Withdraw(args) => {
            move_money(&engine, &admin, TransactionKind::Withdraw, args).await?
        }
        Command::Khata(args) => {
            let target = args.target.target()?;
            for entry in engine.list_khata(&admin, &target, args.from, args.to).await? {
                print_entry(&entry);
            }
        }
        Command::Purge(args) => {
            let deleted = engine.purge_ledger_entries(&admin, &args.ids).await?;
            println!("purged {deleted} of {} ledger entries", args.ids.len());
        }
        Command::Reconcile(args) => {
            let report = engine.reconcile(&admin, &args.target()?).await?;
            println!("principal:     {}", report.principal);
            println!("opening:       {}", Money::new(report.opening_balance));
            println!("stored:        {}", Money::new(report.balance));
            println!(
                "ledger:        {} (+{} -{}) {}",
                format_minor(report.expected_from_ledger()),
                format_minor(report.ledger_deposits),
                format_minor(report.ledger_withdrawals),
                if report.ledger_reconciles { "ok" } else { "MISMATCH" }
            );
            println!(
                "records:       {} (+{} -{}) {}",
                format_minor(report.expected_from_records()),
                format_minor(report.record_deposits),
                format_minor(report.record_withdrawals),
                if report.records_reconcile { "ok" } else { "MISMATCH" }
            );
        }
        Command::Orphans => {
            for principal in engine.orphaned_principals(&admin).await? {
                print_principal(&principal);
            }
        }
        Command::HashPassword(_) => {}
    }

    Ok(())
}

async fn move_money(
    engine: &Engine,
    admin: &Actor,
    kind: TransactionKind,
    args: MoneyArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cmd = TransactionCmd::new(args.target.target()?, kind, args.amount.minor());
    if let Some(description) = args.description {
        cmd = cmd.description(description);
    }
    if let Some(date) = args.date {
        cmd = cmd.date(date);
    }
    let receipt = engine.execute(admin, cmd).await?;
    println!(
        "{} {} -> balance {} (event {})",
        kind.as_str(),
        Money::new(receipt.entry.amount),
        Money::new(receipt.new_balance),
        receipt.event_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_backdated_withdrawal() {
        let cli = Cli::try_parse_from([
            "khata_admin",
            "withdraw",
            "--kind",
            "client",
            "--login-name",
            "c1",
            "--amount",
            "12,50",
            "--date",
            "2025-01-31",
        ])
        .unwrap();
        let Command::Withdraw(args) = cli.command else {
            panic!("expected withdraw");
        };
        assert_eq!(args.amount.minor(), 1250);
        assert_eq!(args.target.target().unwrap(), Target::login(PrincipalKind::Client, "c1"));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert!(parse_kind("admin").is_err());
        assert_eq!(parse_kind("superMaster").unwrap(), PrincipalKind::SuperMaster);
    }
}
