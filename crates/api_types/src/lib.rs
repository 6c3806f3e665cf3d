use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hierarchy level of a principal, as spelled on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrincipalKind {
    SuperMaster,
    Master,
    Agent,
    Client,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Deposit,
    Withdraw,
    Note,
}

pub mod principal {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PrincipalNew {
        pub kind: PrincipalKind,
        pub username: String,
        pub login_name: String,
        pub password: String,
        /// Required for every kind except `superMaster`.
        pub parent_id: Option<Uuid>,
        /// Percentage, 0 to 100.
        #[serde(default)]
        pub win_commission: f64,
        /// Percentage, 0 to 100.
        #[serde(default)]
        pub loss_commission: f64,
        /// Minor units.
        #[serde(default)]
        pub opening_balance: i64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct PrincipalView {
        pub id: Uuid,
        pub kind: PrincipalKind,
        pub username: String,
        pub login_name: String,
        pub parent_id: Option<Uuid>,
        pub win_commission: f64,
        pub loss_commission: f64,
        pub opening_balance: i64,
        pub balance: i64,
        pub blocked: bool,
        pub created_at: DateTime<Utc>,
        pub last_login_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PrincipalList {
        pub kind: Option<PrincipalKind>,
    }
}

pub mod ledger {
    use super::*;

    /// A khata book row. Field names and `date` format (`YYYY-MM-DD`) are
    /// shared with existing consumers and must stay stable.
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct LedgerEntryView {
        pub id: i64,
        pub user_id: Uuid,
        pub user_type: PrincipalKind,
        pub transaction_type: LedgerKind,
        pub amount: i64,
        pub date: NaiveDate,
        pub description: String,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DateRange {
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LedgerQuery {
        pub user_id: Option<Uuid>,
        pub user_type: Option<PrincipalKind>,
        pub transaction_type: Option<LedgerKind>,
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NoteNew {
        pub note: String,
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Purge {
        pub ids: Vec<i64>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct Purged {
        pub deleted: u64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionRecordView {
        pub id: i64,
        pub event_id: Uuid,
        pub user_id: Uuid,
        pub user_type: PrincipalKind,
        pub transaction_type: LedgerKind,
        pub amount: i64,
        pub description: String,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }
}

pub mod transaction {
    use super::*;

    /// Deposit or withdraw request. The target is named by `user_id` or
    /// `login_name` within `user_type`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub user_type: PrincipalKind,
        pub user_id: Option<Uuid>,
        pub login_name: Option<String>,
        /// Minor units, strictly positive.
        pub amount: i64,
        pub description: Option<String>,
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub event_id: Uuid,
        pub new_balance: i64,
        pub entry: super::ledger::LedgerEntryView,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct Dashboard {
        pub subordinate_count: u64,
        pub direct_subordinate_count: u64,
        pub super_master_count: u64,
        pub master_count: u64,
        pub agent_count: u64,
        pub client_count: u64,
        pub active_client_count: u64,
        pub total_balance: i128,
        pub own_balance: i64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct Reconciliation {
        pub user_id: Uuid,
        pub user_type: PrincipalKind,
        pub opening_balance: i64,
        pub balance: i64,
        pub ledger_deposits: i128,
        pub ledger_withdrawals: i128,
        pub record_deposits: i128,
        pub record_withdrawals: i128,
        pub expected_from_ledger: i128,
        pub expected_from_records: i128,
        pub ledger_reconciles: bool,
        pub records_reconcile: bool,
    }
}
