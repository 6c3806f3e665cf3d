//! Ancestor/descendant relation and the view/act permission built on it.
//!
//! The relation is computed by walking `parent_id` links upwards from the
//! descendant, at most three hops. Descendant listing expands one level at a
//! time so sibling subtrees are never included.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    Actor, EngineError, Identifier, Principal, PrincipalKind, PrincipalRef, ResultEngine, Target,
    principals, util::normalize_login_name,
};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn find_principal<C: ConnectionTrait>(
        &self,
        db: &C,
        target: &Target,
    ) -> ResultEngine<Option<Principal>> {
        let query = principals::Entity::find()
            .filter(principals::Column::Kind.eq(target.kind.as_str()));
        let query = match &target.ident {
            Identifier::Id(id) => query.filter(principals::Column::Id.eq(id.to_string())),
            Identifier::LoginName(login) => {
                let login = normalize_login_name(login)?;
                query.filter(principals::Column::LoginName.eq(login))
            }
        };
        query.one(db).await?.map(Principal::try_from).transpose()
    }

    /// Any principal matching `target`, blocked or not.
    pub(super) async fn require_principal<C: ConnectionTrait>(
        &self,
        db: &C,
        target: &Target,
    ) -> ResultEngine<Principal> {
        self.find_principal(db, target)
            .await?
            .ok_or_else(|| EngineError::TargetNotFound(target.to_string()))
    }

    /// A principal that may take part in a money movement.
    pub(super) async fn require_active_principal<C: ConnectionTrait>(
        &self,
        db: &C,
        target: &Target,
    ) -> ResultEngine<Principal> {
        match self.find_principal(db, target).await? {
            Some(principal) if !principal.blocked => Ok(principal),
            _ => Err(EngineError::TargetNotFound(target.to_string())),
        }
    }

    /// Rejects principal actors that no longer exist or are blocked.
    pub(super) async fn require_actor<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
    ) -> ResultEngine<Option<Principal>> {
        let Actor::Principal(reference) = actor else {
            return Ok(None);
        };
        match self.find_principal(db, &Target::from(*reference)).await? {
            Some(principal) if !principal.blocked => Ok(Some(principal)),
            _ => {
                warn!(actor = %reference, "rejected inactive actor");
                Err(EngineError::Unauthorized(format!(
                    "{reference} is not an active principal"
                )))
            }
        }
    }

    pub(super) async fn is_ancestor_in<C: ConnectionTrait>(
        &self,
        db: &C,
        ancestor: PrincipalRef,
        descendant: &Principal,
    ) -> ResultEngine<bool> {
        if ancestor.kind.depth() >= descendant.kind.depth() {
            return Ok(false);
        }
        let mut current = descendant.parent();
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            if parent.kind.depth() <= ancestor.kind.depth() {
                return Ok(false);
            }
            current = self
                .find_principal(db, &Target::from(parent))
                .await?
                .and_then(|p| p.parent());
        }
        Ok(false)
    }

    pub(super) async fn can_view_in<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        target: &Principal,
    ) -> ResultEngine<bool> {
        match actor {
            Actor::Admin => Ok(true),
            Actor::Principal(reference) if *reference == target.reference() => Ok(true),
            Actor::Principal(reference) => self.is_ancestor_in(db, *reference, target).await,
        }
    }

    /// Fails with `Unauthorized` unless `actor` may view `target`.
    pub(super) async fn require_view<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        target: &Principal,
    ) -> ResultEngine<()> {
        self.require_actor(db, actor).await?;
        if self.can_view_in(db, actor, target).await? {
            return Ok(());
        }
        warn!(actor = %actor.identity(), principal = %target.reference(), "view denied");
        Err(EngineError::Unauthorized(format!(
            "{} cannot access {}",
            actor.identity(),
            target.reference()
        )))
    }

    /// View and act permission are the same relation.
    pub(super) async fn require_act<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        target: &Principal,
    ) -> ResultEngine<()> {
        self.require_view(db, actor, target).await
    }

    pub(super) async fn descendants_in<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
    ) -> ResultEngine<Vec<Principal>> {
        match actor {
            Actor::Admin => {
                let roots: Vec<Principal> = principals::Entity::find()
                    .filter(principals::Column::Kind.eq(PrincipalKind::SuperMaster.as_str()))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(Principal::try_from)
                    .collect::<ResultEngine<_>>()?;
                let frontier = roots.iter().map(|p| p.id.to_string()).collect();
                let below = self
                    .expand(db, PrincipalKind::SuperMaster.child(), frontier)
                    .await?;
                Ok(roots.into_iter().chain(below).collect())
            }
            Actor::Principal(reference) => {
                self.expand(db, reference.kind.child(), vec![reference.id.to_string()])
                    .await
            }
        }
    }

    async fn expand<C: ConnectionTrait>(
        &self,
        db: &C,
        mut level: Option<PrincipalKind>,
        mut frontier: Vec<String>,
    ) -> ResultEngine<Vec<Principal>> {
        let mut out = Vec::new();
        while let Some(kind) = level {
            if frontier.is_empty() {
                break;
            }
            let children = self.children_of(db, kind, &frontier).await?;
            frontier = children.iter().map(|p| p.id.to_string()).collect();
            out.extend(children);
            level = kind.child();
        }
        Ok(out)
    }

    async fn children_of<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: PrincipalKind,
        parents: &[String],
    ) -> ResultEngine<Vec<Principal>> {
        principals::Entity::find()
            .filter(principals::Column::Kind.eq(kind.as_str()))
            .filter(principals::Column::ParentId.is_in(parents.iter().cloned()))
            .all(db)
            .await?
            .into_iter()
            .map(Principal::try_from)
            .collect()
    }

    /// Ids of every principal `actor` can view. `None` means unrestricted.
    pub(super) async fn visible_ids_in<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
    ) -> ResultEngine<Option<HashSet<Uuid>>> {
        let Actor::Principal(reference) = actor else {
            return Ok(None);
        };
        let mut ids: HashSet<Uuid> = self
            .descendants_in(db, actor)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        ids.insert(reference.id);
        Ok(Some(ids))
    }

    /// Whether `ancestor` sits above `descendant` in the hierarchy.
    ///
    /// A principal is not its own ancestor.
    pub async fn is_ancestor(
        &self,
        ancestor: PrincipalRef,
        descendant: PrincipalRef,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let Some(descendant) = self.find_principal(&db_tx, &Target::from(descendant)).await? else {
                return Ok(false);
            };
            self.is_ancestor_in(&db_tx, ancestor, &descendant).await
        })
    }

    /// Admin, self, or ancestor. Unknown targets are not viewable.
    pub async fn can_view(&self, actor: &Actor, target: PrincipalRef) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let Some(target) = self.find_principal(&db_tx, &Target::from(target)).await? else {
                return Ok(false);
            };
            self.can_view_in(&db_tx, actor, &target).await
        })
    }

    pub async fn can_act(&self, actor: &Actor, target: PrincipalRef) -> ResultEngine<bool> {
        self.can_view(actor, target).await
    }

    /// Every principal reachable below `actor`, blocked ones included.
    ///
    /// For the admin this is all super-masters and everything below them.
    pub async fn list_descendants(&self, actor: &Actor) -> ResultEngine<Vec<Principal>> {
        with_tx!(self, |db_tx| {
            let descendants = self.descendants_in(&db_tx, actor).await?;
            debug!(actor = %actor.identity(), count = descendants.len(), "listed descendants");
            Ok(descendants)
        })
    }
}
