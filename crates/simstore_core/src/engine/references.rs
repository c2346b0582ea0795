//! Reference operations.

use super::Engine;
use crate::error::CoreResult;
use crate::project::{namespace_of, qualify_reference};
use crate::reference::{
    ObjectRef, ReferenceHost, ReferenceResolver, ReferenceTarget, ReferenceValue,
};
use crate::store::{Record, RecordStore};
use crate::types::{ObjectKind, RecordId};
use tracing::debug;

impl Engine {
    fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.references, self.policy())
    }

    /// Qualifies the store of `object`, leaving project objects untouched.
    fn object_ref(&self, object: &ObjectRef) -> CoreResult<ObjectRef> {
        let store = match object.kind {
            ObjectKind::Project => object.store.clone(),
            ObjectKind::Data | ObjectKind::User => self.store_code(&object.store)?,
        };
        Ok(ObjectRef {
            kind: object.kind,
            store,
            id: object.id,
        })
    }

    fn reference_request(
        &self,
        acting: &ObjectRef,
        code: &str,
        candidates: &[ObjectRef],
    ) -> CoreResult<(ObjectRef, String, Vec<ObjectRef>)> {
        let acting = self.object_ref(acting)?;
        let code = qualify_reference(namespace_of(&acting.store), code);
        let candidates = candidates
            .iter()
            .map(|c| self.object_ref(c))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok((acting, code, candidates))
    }

    /// Links `acting` with every candidate under `code`.
    ///
    /// Both ends of every link are written. `1:1` and `1:M` definitions
    /// replace earlier links instead of accumulating them; a `1:1` partner
    /// already bound elsewhere is rejected. Nothing is written when the
    /// request is rejected.
    pub fn add_reference(
        &mut self,
        acting: &ObjectRef,
        code: &str,
        candidates: &[ObjectRef],
    ) -> CoreResult<()> {
        let (acting, code, candidates) = self.reference_request(acting, code, candidates)?;
        let plan = self
            .resolver()
            .plan_add(&code, &acting, &candidates, &self.stores)?;
        debug!(%acting, code = %code, writes = plan.writes().len(), "adding reference");
        plan.apply(&mut self.stores)
    }

    /// Removes the links between `acting` and every candidate under `code`.
    pub fn delete_reference(
        &mut self,
        acting: &ObjectRef,
        code: &str,
        candidates: &[ObjectRef],
    ) -> CoreResult<()> {
        let (acting, code, candidates) = self.reference_request(acting, code, candidates)?;
        let plan = self
            .resolver()
            .plan_delete(&code, &acting, &candidates, &self.stores)?;
        debug!(%acting, code = %code, writes = plan.writes().len(), "deleting reference");
        plan.apply(&mut self.stores)
    }

    /// Reads the records linked to `acting` under `code`.
    ///
    /// Returns `None` when nothing is linked, a single target for one link
    /// and a list otherwise. Without a definition the store of each linked
    /// record is found by the inverse link it holds.
    pub fn get_reference(&self, acting: &ObjectRef, code: &str) -> CoreResult<Option<ReferenceValue>> {
        let (acting, code, _) = self.reference_request(acting, code, &[])?;
        let definition = self.resolver().definition(&code)?;
        let ids = self.stores.linked(&acting, &code)?;
        if ids.is_empty() {
            return Ok(None);
        }

        let far_side = match definition {
            Some(def) => {
                let side = def.resolve_side(acting.kind, &acting.store)?;
                Some(def.opposite(side, &acting.store))
            }
            None => None,
        };

        let mut targets = Vec::with_capacity(ids.len());
        for id in &ids {
            let located = match &far_side {
                Some((kind, Some(store))) if self.stores.has_store(*kind, store) => {
                    Some((*kind, store.clone()))
                }
                Some((kind, _)) => self.stores.locate(*kind, id).map(|store| (*kind, store)),
                None => self.linking_back(&acting, &code, id),
            };
            match located.and_then(|(kind, store)| self.reference_target(kind, &store, id)) {
                Some(target) => targets.push(target),
                None => debug!(code = %code, id = %id, "linked record not found"),
            }
        }

        Ok(match targets.len() {
            0 => None,
            1 => targets.pop().map(ReferenceValue::Single),
            _ => Some(ReferenceValue::Many(targets)),
        })
    }

    /// Finds the store whose record `id` links back to `acting`.
    fn linking_back(&self, acting: &ObjectRef, code: &str, id: &RecordId) -> Option<(ObjectKind, String)> {
        let is_acting = |kind: ObjectKind, store: &str| {
            kind == acting.kind && store == acting.store && *id == acting.id
        };
        let data = self
            .stores
            .data_stores()
            .filter(|s| !is_acting(ObjectKind::Data, s.code()))
            .find(|s| s.get(id).is_some_and(|r| r.references().get(code).contains(&acting.id)))
            .map(|s| (ObjectKind::Data, s.code().to_string()));
        data.or_else(|| {
            self.stores
                .user_stores()
                .filter(|s| !is_acting(ObjectKind::User, s.code()))
                .find(|s| s.get(id).is_some_and(|r| r.references().get(code).contains(&acting.id)))
                .map(|s| (ObjectKind::User, s.code().to_string()))
        })
    }

    fn reference_target(&self, kind: ObjectKind, store: &str, id: &RecordId) -> Option<ReferenceTarget> {
        match kind {
            ObjectKind::Data => {
                let record = self.stores.data_store(store).ok()?.get(id)?;
                Some(ReferenceTarget {
                    kind,
                    store: store.to_string(),
                    id: *id,
                    type_tag: record.type_tag().to_string(),
                    username: None,
                    first_name: None,
                    last_name: None,
                })
            }
            ObjectKind::User => {
                let user = self.stores.user_store(store).ok()?.get(id)?;
                Some(ReferenceTarget {
                    kind,
                    store: store.to_string(),
                    id: *id,
                    type_tag: user.type_tag().to_string(),
                    username: Some(user.username().to_string()),
                    first_name: Some(user.first_name().to_string()),
                    last_name: Some(user.last_name().to_string()),
                })
            }
            ObjectKind::Project => None,
        }
    }
}
