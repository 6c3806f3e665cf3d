use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Actor, EngineError, NewPrincipal, Principal, PrincipalKind, ResultEngine, Target, principals,
    util::{normalize_login_name, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    async fn hash_blocking(&self, password: String) -> ResultEngine<String> {
        let credentials = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || credentials.hash_password(&password))
            .await
            .map_err(|err| EngineError::PersistenceFailure(format!("credential worker: {err}")))?
    }

    async fn verify_blocking(&self, password: &str, password_hash: &str) -> ResultEngine<bool> {
        let credentials = Arc::clone(&self.credentials);
        let (password, password_hash) = (password.to_string(), password_hash.to_string());
        tokio::task::spawn_blocking(move || credentials.verify_password(&password, &password_hash))
            .await
            .map_err(|err| EngineError::PersistenceFailure(format!("credential worker: {err}")))?
    }

    /// Create a principal.
    ///
    /// Super-masters can only be created by the admin and have no parent.
    /// Every other kind needs a parent of the immediate superior kind that
    /// exists, is not blocked and on which `actor` may act.
    pub async fn create_principal(
        &self,
        actor: &Actor,
        cmd: NewPrincipal,
    ) -> ResultEngine<Principal> {
        let username = normalize_required_text(&cmd.username, "username")?;
        let login_name = normalize_login_name(&cmd.login_name)?;
        if cmd.opening_balance < 0 {
            return Err(EngineError::InvalidAmount(
                "opening balance must not be negative".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            self.require_actor(&db_tx, actor).await?;
            self.check_parent(&db_tx, actor, &cmd).await
        })?;
        let password_hash = self.hash_blocking(cmd.password.clone()).await?;

        // The parent may have been blocked while hashing; check again.
        let principal = with_tx!(self, |db_tx| {
            self.require_actor(&db_tx, actor).await?;
            let parent_id = self.check_parent(&db_tx, actor, &cmd).await?;

            let taken = principals::Entity::find()
                .filter(principals::Column::Kind.eq(cmd.kind.as_str()))
                .filter(principals::Column::LoginName.eq(login_name.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if taken {
                return Err(EngineError::DuplicateLoginName(login_name.clone()));
            }

            let model = principals::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                username: ActiveValue::Set(username.clone()),
                login_name: ActiveValue::Set(login_name.clone()),
                password_hash: ActiveValue::Set(password_hash),
                parent_id: ActiveValue::Set(parent_id.map(|id| id.to_string())),
                win_commission: ActiveValue::Set(cmd.win_commission.bps()),
                loss_commission: ActiveValue::Set(cmd.loss_commission.bps()),
                opening_balance: ActiveValue::Set(cmd.opening_balance),
                balance: ActiveValue::Set(cmd.opening_balance),
                blocked: ActiveValue::Set(false),
                created_at: ActiveValue::Set(Utc::now()),
                last_login_at: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| EngineError::from_insert(err, &login_name))?;
            Principal::try_from(model)
        })?;

        info!(
            principal = %principal.reference(),
            login_name = %principal.login_name,
            created_by = %actor.identity(),
            "principal created"
        );
        Ok(principal)
    }

    async fn check_parent<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        cmd: &NewPrincipal,
    ) -> ResultEngine<Option<Uuid>> {
        let Some(parent_kind) = cmd.kind.parent() else {
            if cmd.parent_id.is_some() {
                return Err(EngineError::InvalidParent(
                    "super-masters have no parent".to_string(),
                ));
            }
            if !actor.is_admin() {
                warn!(actor = %actor.identity(), "super-master creation denied");
                return Err(EngineError::Unauthorized(
                    "only the admin can create super-masters".to_string(),
                ));
            }
            return Ok(None);
        };
        let parent_id = cmd.parent_id.ok_or_else(|| {
            EngineError::InvalidParent(format!("a {} needs a {parent_kind} parent", cmd.kind))
        })?;
        let parent = match self
            .find_principal(db, &Target::id(parent_kind, parent_id))
            .await?
        {
            Some(parent) if !parent.blocked => parent,
            Some(_) => {
                return Err(EngineError::InvalidParent(format!(
                    "{parent_kind}:{parent_id} is blocked"
                )));
            }
            None => {
                return Err(EngineError::InvalidParent(format!(
                    "{parent_kind}:{parent_id} does not exist"
                )));
            }
        };
        self.require_act(db, actor, &parent).await?;
        Ok(Some(parent_id))
    }

    /// Check a principal's password.
    ///
    /// Unknown, blocked and wrong-password logins all fail with
    /// `TargetNotFound`. Success stamps `last_login_at`.
    pub async fn authenticate(
        &self,
        login_name: &str,
        password: &str,
        kind: PrincipalKind,
    ) -> ResultEngine<Principal> {
        let target = Target::login(kind, login_name);
        let not_found = || EngineError::TargetNotFound(target.to_string());

        let principal = with_tx!(self, |db_tx| {
            self.require_active_principal(&db_tx, &target).await
        })
        .map_err(|err| match err {
            EngineError::InvalidInput(_) => not_found(),
            other => other,
        })?;
        if !self
            .verify_blocking(password, &principal.password_hash)
            .await?
        {
            warn!(principal = %principal.reference(), "failed login");
            return Err(not_found());
        }

        let now = Utc::now();
        with_tx!(self, |db_tx| {
            principals::ActiveModel {
                id: ActiveValue::Unchanged(principal.id.to_string()),
                last_login_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            }
            .update(&db_tx)
            .await
            .map_err(EngineError::from)
        })?;
        info!(principal = %principal.reference(), "login");
        Ok(Principal {
            last_login_at: Some(now),
            ..principal
        })
    }

    /// Check the configured admin login and return the admin actor.
    pub async fn authenticate_admin(&self, login_name: &str, password: &str) -> ResultEngine<Actor> {
        let not_found = || EngineError::TargetNotFound(format!("admin:{login_name}"));
        let Some(admin) = &self.admin else {
            return Err(not_found());
        };
        let matches_login = normalize_login_name(login_name)
            .is_ok_and(|login| normalize_login_name(&admin.login_name).is_ok_and(|a| a == login));
        if !matches_login || !self.verify_blocking(password, &admin.password_hash).await? {
            warn!("failed admin login");
            return Err(not_found());
        }
        Ok(Actor::Admin)
    }

    async fn set_blocked(&self, actor: &Actor, target: &Target, blocked: bool) -> ResultEngine<Principal> {
        let principal = with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_act(&db_tx, actor, &principal).await?;
            let model = principals::ActiveModel {
                id: ActiveValue::Unchanged(principal.id.to_string()),
                blocked: ActiveValue::Set(blocked),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Principal::try_from(model)
        })?;
        info!(
            principal = %principal.reference(),
            blocked,
            by = %actor.identity(),
            "principal block state changed"
        );
        Ok(principal)
    }

    /// Blocked principals cannot log in, act, or be the target of money
    /// movements. Their subordinates are unaffected.
    pub async fn block_principal(&self, actor: &Actor, target: &Target) -> ResultEngine<Principal> {
        self.set_blocked(actor, target, true).await
    }

    pub async fn unblock_principal(&self, actor: &Actor, target: &Target) -> ResultEngine<Principal> {
        self.set_blocked(actor, target, false).await
    }

    /// Hard delete. Subordinates are neither deleted nor re-parented and the
    /// principal's ledger rows stay in place.
    pub async fn delete_principal(&self, actor: &Actor, target: &Target) -> ResultEngine<()> {
        let principal = with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_act(&db_tx, actor, &principal).await?;
            principals::Entity::delete_by_id(principal.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(principal)
        })?;
        info!(
            principal = %principal.reference(),
            by = %actor.identity(),
            "principal deleted"
        );
        Ok(())
    }

    /// A principal as seen by `actor`, blocked or not.
    pub async fn principal(&self, actor: &Actor, target: &Target) -> ResultEngine<Principal> {
        with_tx!(self, |db_tx| {
            let principal = self.require_principal(&db_tx, target).await?;
            self.require_view(&db_tx, actor, &principal).await?;
            Ok(principal)
        })
    }

    pub async fn balance(&self, actor: &Actor, target: &Target) -> ResultEngine<i64> {
        Ok(self.principal(actor, target).await?.balance)
    }

    /// Candidate parents for a new principal of `kind`: non-blocked
    /// principals of the superior kind that `actor` may act on, newest first.
    pub async fn available_parents(
        &self,
        actor: &Actor,
        kind: PrincipalKind,
    ) -> ResultEngine<Vec<Principal>> {
        let Some(parent_kind) = kind.parent() else {
            return Ok(Vec::new());
        };
        with_tx!(self, |db_tx| {
            self.require_actor(&db_tx, actor).await?;
            let visible = self.visible_ids_in(&db_tx, actor).await?;
            principals::Entity::find()
                .filter(principals::Column::Kind.eq(parent_kind.as_str()))
                .filter(principals::Column::Blocked.eq(false))
                .order_by_desc(principals::Column::CreatedAt)
                .order_by_desc(principals::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Principal::try_from)
                .filter(|p| match (&visible, p) {
                    (Some(ids), Ok(p)) => ids.contains(&p.id),
                    _ => true,
                })
                .collect()
        })
    }
}
