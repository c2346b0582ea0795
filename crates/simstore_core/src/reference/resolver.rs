//! Reference validation and planning.
//!
//! ```text
//! request ──► resolve sides ──► check cardinality ──► plan writes ──► apply
//!                  │                   │                  │
//!                  └─── InvalidReference / CardinalityViolation / RecordNotFound
//! ```
//!
//! Planning is a pure function of the current state: it never mutates the
//! host, so a rejected request leaves every record untouched.

use crate::config::SchemaPolicy;
use crate::error::{CoreError, CoreResult};
use crate::reference::{
    Cardinality, ObjectRef, ReferenceDefinition, ReferenceRegistry, Side,
};
use crate::types::{ObjectKind, RecordId};
use tracing::debug;

/// One half of a link between two records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceWrite {
    /// Add `other` to the ids `owner` links under the code.
    Link {
        /// Record whose reference map changes.
        owner: ObjectRef,
        /// Linked record.
        other: RecordId,
    },
    /// Remove `other` from the ids `owner` links under the code.
    Unlink {
        /// Record whose reference map changes.
        owner: ObjectRef,
        /// Unlinked record.
        other: RecordId,
    },
}

/// Record state a resolver plans against and a plan is applied to.
pub trait ReferenceHost {
    /// Returns the ids linked to `owner` under `code`.
    ///
    /// Fails with `RecordNotFound` (or `StoreNotFound`) if `owner` does not exist.
    fn linked(&self, owner: &ObjectRef, code: &str) -> CoreResult<Vec<RecordId>>;

    /// Finds the store of `kind` holding `id`.
    fn locate(&self, kind: ObjectKind, id: &RecordId) -> Option<String>;

    /// Applies one write.
    fn write(&mut self, code: &str, write: &ReferenceWrite) -> CoreResult<()>;
}

/// Validated writes for one reference mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a plan does nothing until applied"]
pub struct ReferencePlan {
    code: String,
    writes: Vec<ReferenceWrite>,
}

impl ReferencePlan {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            writes: Vec::new(),
        }
    }

    fn link_pair(&mut self, a: &ObjectRef, b: &ObjectRef) {
        self.writes.push(ReferenceWrite::Link {
            owner: a.clone(),
            other: b.id,
        });
        self.writes.push(ReferenceWrite::Link {
            owner: b.clone(),
            other: a.id,
        });
    }

    fn unlink_pair(&mut self, a: &ObjectRef, b: Option<ObjectRef>, b_id: RecordId) {
        self.writes.push(ReferenceWrite::Unlink {
            owner: a.clone(),
            other: b_id,
        });
        if let Some(b) = b {
            self.writes.push(ReferenceWrite::Unlink {
                owner: b,
                other: a.id,
            });
        }
    }

    /// Returns the qualified reference code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the planned writes in application order.
    #[must_use]
    pub fn writes(&self) -> &[ReferenceWrite] {
        &self.writes
    }

    /// Applies every write to `host`.
    pub fn apply<H: ReferenceHost + ?Sized>(self, host: &mut H) -> CoreResult<()> {
        for write in &self.writes {
            host.write(&self.code, write)?;
        }
        debug!(code = %self.code, writes = self.writes.len(), "applied reference plan");
        Ok(())
    }
}

/// Validates reference mutations and plans their writes.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    registry: &'a ReferenceRegistry,
    policy: SchemaPolicy,
}

impl<'a> ReferenceResolver<'a> {
    /// Creates a resolver over `registry`.
    #[must_use]
    pub const fn new(registry: &'a ReferenceRegistry, policy: SchemaPolicy) -> Self {
        Self { registry, policy }
    }

    /// Looks up the definition of `code`.
    ///
    /// A missing definition is `None` under the permissive policy and
    /// `ReferenceNotFound` under the strict one.
    pub fn definition(&self, code: &str) -> CoreResult<Option<&'a ReferenceDefinition>> {
        match (self.registry.get(code), self.policy) {
            (Some(def), _) => Ok(Some(def)),
            (None, SchemaPolicy::Permissive) => Ok(None),
            (None, SchemaPolicy::Strict) => Err(CoreError::ReferenceNotFound {
                code: code.to_string(),
            }),
        }
    }

    /// Checks the side counts of a request and returns the acting side.
    ///
    /// Every candidate plus the acting record is classified by side. `1:1`
    /// needs exactly one of each; `1:M` exactly one source. No candidate may
    /// sit on the acting record's own side.
    pub fn validate(
        &self,
        def: &ReferenceDefinition,
        acting: &ObjectRef,
        candidates: &[ObjectRef],
    ) -> CoreResult<Side> {
        let acting_side = def.resolve_side(acting.kind, &acting.store)?;

        let mut sources = Vec::new();
        let mut targets = Vec::new();
        // Within a single store both sides match; candidates take the far side.
        for candidate in candidates {
            let side = if def.accepts(acting_side.opposite(), candidate.kind, &candidate.store) {
                acting_side.opposite()
            } else {
                def.resolve_side(candidate.kind, &candidate.store)?
            };
            match side {
                Side::Source => sources.push(candidate.id),
                Side::Target => targets.push(candidate.id),
            }
        }
        match acting_side {
            Side::Source => sources.push(acting.id),
            Side::Target => targets.push(acting.id),
        }

        let violation = |side: Side, ids: &[RecordId]| CoreError::CardinalityViolation {
            code: def.code.clone(),
            cardinality: def.cardinality,
            side,
            given: join_ids(ids),
        };
        match def.cardinality {
            Cardinality::OneToOne => {
                if sources.len() != 1 {
                    return Err(violation(Side::Source, &sources));
                }
                if targets.len() != 1 {
                    return Err(violation(Side::Target, &targets));
                }
            }
            Cardinality::OneToMany | Cardinality::ManyToOne => {
                if sources.len() != 1 {
                    return Err(violation(Side::Source, &sources));
                }
            }
            Cardinality::ManyToMany => {}
        }

        let own_side = match acting_side {
            Side::Source => &sources,
            Side::Target => &targets,
        };
        if own_side.len() > 1 {
            return Err(CoreError::invalid_reference(format!(
                "{acting} is the only {acting_side} allowed in a request on {}, but {} given",
                def.code,
                join_ids(own_side)
            )));
        }

        Ok(acting_side)
    }

    /// Validates an add request and plans its writes.
    pub fn plan_add<H: ReferenceHost + ?Sized>(
        &self,
        code: &str,
        acting: &ObjectRef,
        candidates: &[ObjectRef],
        host: &H,
    ) -> CoreResult<ReferencePlan> {
        let candidates = dedup(candidates);
        let current = host.linked(acting, code)?;
        for candidate in &candidates {
            host.linked(candidate, code)?;
        }

        let mut plan = ReferencePlan::new(code);
        let Some(def) = self.definition(code)? else {
            debug!(code, "no definition, linking unchecked");
            for candidate in &candidates {
                plan.link_pair(acting, candidate);
            }
            return Ok(plan);
        };

        let side = self.validate(def, acting, &candidates)?;
        match (def.cardinality, side) {
            (Cardinality::OneToOne, _) => {
                let partner = &candidates[0];
                let bound = host.linked(partner, code)?;
                if bound.iter().any(|id| *id != acting.id) {
                    let mut given = bound;
                    given.push(acting.id);
                    return Err(CoreError::CardinalityViolation {
                        code: code.to_string(),
                        cardinality: def.cardinality,
                        side,
                        given: join_ids(&given),
                    });
                }
                for old in current.iter().filter(|id| **id != partner.id) {
                    plan.unlink_pair(acting, counterpart(host, def, side, acting, old), *old);
                }
                plan.link_pair(acting, partner);
            }
            (Cardinality::OneToMany | Cardinality::ManyToOne, Side::Source) => {
                for target in &candidates {
                    for prev in host.linked(target, code)? {
                        if prev != acting.id {
                            let prev_ref = counterpart(host, def, Side::Target, target, &prev);
                            plan.unlink_pair(target, prev_ref, prev);
                        }
                    }
                    plan.link_pair(acting, target);
                }
            }
            (Cardinality::OneToMany | Cardinality::ManyToOne, Side::Target) => {
                let source = &candidates[0];
                for old in current.iter().filter(|id| **id != source.id) {
                    plan.unlink_pair(acting, counterpart(host, def, side, acting, old), *old);
                }
                plan.link_pair(acting, source);
            }
            (Cardinality::ManyToMany, _) => {
                for candidate in &candidates {
                    plan.link_pair(acting, candidate);
                }
            }
        }

        Ok(plan)
    }

    /// Plans the removal of links between `acting` and `candidates`.
    pub fn plan_delete<H: ReferenceHost + ?Sized>(
        &self,
        code: &str,
        acting: &ObjectRef,
        candidates: &[ObjectRef],
        host: &H,
    ) -> CoreResult<ReferencePlan> {
        self.definition(code)?;
        host.linked(acting, code)?;

        let mut plan = ReferencePlan::new(code);
        for candidate in dedup(candidates) {
            host.linked(&candidate, code)?;
            let id = candidate.id;
            plan.unlink_pair(acting, Some(candidate), id);
        }
        Ok(plan)
    }
}

/// Locates the record `id` linked to `owner`, which sits on `owner_side`.
fn counterpart<H: ReferenceHost + ?Sized>(
    host: &H,
    def: &ReferenceDefinition,
    owner_side: Side,
    owner: &ObjectRef,
    id: &RecordId,
) -> Option<ObjectRef> {
    let (kind, store) = def.opposite(owner_side, &owner.store);
    let store = store.or_else(|| host.locate(kind, id))?;
    Some(ObjectRef {
        kind,
        store,
        id: *id,
    })
}

fn dedup(objects: &[ObjectRef]) -> Vec<ObjectRef> {
    let mut unique: Vec<ObjectRef> = Vec::with_capacity(objects.len());
    for object in objects {
        if !unique.contains(object) {
            unique.push(object.clone());
        }
    }
    unique
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
