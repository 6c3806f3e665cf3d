//! Principals of the reseller hierarchy and their `principals` table.
//!
//! A principal is one of the four persisted kinds. The admin is not a
//! principal: it is an [`Actor`] with implicit root authority.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Commission, EngineError, util::parse_uuid};

/// Level of a principal in the hierarchy, root first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrincipalKind {
    SuperMaster,
    Master,
    Agent,
    Client,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 4] = [
        PrincipalKind::SuperMaster,
        PrincipalKind::Master,
        PrincipalKind::Agent,
        PrincipalKind::Client,
    ];

    /// Canonical string stored in the database and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperMaster => "superMaster",
            Self::Master => "master",
            Self::Agent => "agent",
            Self::Client => "client",
        }
    }

    /// Kind of the immediate superior. `None` for super-masters.
    #[must_use]
    pub const fn parent(self) -> Option<PrincipalKind> {
        match self {
            Self::SuperMaster => None,
            Self::Master => Some(Self::SuperMaster),
            Self::Agent => Some(Self::Master),
            Self::Client => Some(Self::Agent),
        }
    }

    /// Kind of the immediate subordinates. `None` for clients.
    #[must_use]
    pub const fn child(self) -> Option<PrincipalKind> {
        match self {
            Self::SuperMaster => Some(Self::Master),
            Self::Master => Some(Self::Agent),
            Self::Agent => Some(Self::Client),
            Self::Client => None,
        }
    }

    /// Distance from the root: 0 for super-masters, 3 for clients.
    #[must_use]
    pub const fn depth(self) -> u8 {
        match self {
            Self::SuperMaster => 0,
            Self::Master => 1,
            Self::Agent => 2,
            Self::Client => 3,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PrincipalKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "superMaster" => Ok(Self::SuperMaster),
            "master" => Ok(Self::Master),
            "agent" => Ok(Self::Agent),
            "client" => Ok(Self::Client),
            other => Err(EngineError::InvalidInput(format!(
                "invalid principal kind: {other}"
            ))),
        }
    }
}

/// Type-scoped identity of a principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub kind: PrincipalKind,
    pub id: Uuid,
}

impl PrincipalRef {
    #[must_use]
    pub const fn new(kind: PrincipalKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Who is calling into the engine.
///
/// Every core operation takes the actor explicitly; the engine keeps no
/// notion of a "current user".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    Admin,
    Principal(PrincipalRef),
}

impl Actor {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Identity recorded as `created_by` on ledger rows.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Admin => "admin".to_string(),
            Self::Principal(principal) => principal.to_string(),
        }
    }
}

impl From<PrincipalRef> for Actor {
    fn from(value: PrincipalRef) -> Self {
        Self::Principal(value)
    }
}

/// How a caller names a target principal within its kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    Id(Uuid),
    LoginName(String),
}

/// A kind-scoped lookup key for a target principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub kind: PrincipalKind,
    pub ident: Identifier,
}

impl Target {
    #[must_use]
    pub fn id(kind: PrincipalKind, id: Uuid) -> Self {
        Self {
            kind,
            ident: Identifier::Id(id),
        }
    }

    #[must_use]
    pub fn login(kind: PrincipalKind, login_name: impl Into<String>) -> Self {
        Self {
            kind,
            ident: Identifier::LoginName(login_name.into()),
        }
    }
}

impl From<PrincipalRef> for Target {
    fn from(value: PrincipalRef) -> Self {
        Self::id(value.kind, value.id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ident {
            Identifier::Id(id) => write!(f, "{}:{id}", self.kind),
            Identifier::LoginName(name) => write!(f, "{}:{name}", self.kind),
        }
    }
}

/// A hierarchy participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub username: String,
    pub login_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub parent_id: Option<Uuid>,
    pub win_commission: Commission,
    pub loss_commission: Commission,
    /// Balance the principal was created with. Only the transaction engine
    /// moves `balance` away from it.
    pub opening_balance: i64,
    pub balance: i64,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Principal {
    #[must_use]
    pub fn reference(&self) -> PrincipalRef {
        PrincipalRef::new(self.kind, self.id)
    }

    /// Reference to the immediate superior, as recorded at creation time.
    #[must_use]
    pub fn parent(&self) -> Option<PrincipalRef> {
        let kind = self.kind.parent()?;
        self.parent_id.map(|id| PrincipalRef::new(kind, id))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub username: String,
    pub login_name: String,
    pub password_hash: String,
    pub parent_id: Option<String>,
    pub win_commission: i32,
    pub loss_commission: i32,
    pub opening_balance: i64,
    pub balance: i64,
    pub blocked: bool,
    pub created_at: DateTimeUtc,
    pub last_login_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Principal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "principal")?,
            kind: PrincipalKind::try_from(model.kind.as_str())?,
            username: model.username,
            login_name: model.login_name,
            password_hash: model.password_hash,
            parent_id: model
                .parent_id
                .as_deref()
                .map(|id| parse_uuid(id, "parent"))
                .transpose()?,
            win_commission: Commission::try_from_bps(model.win_commission)?,
            loss_commission: Commission::try_from_bps(model.loss_commission)?,
            opening_balance: model.opening_balance,
            balance: model.balance,
            blocked: model.blocked,
            created_at: model.created_at,
            last_login_at: model.last_login_at,
        })
    }
}
