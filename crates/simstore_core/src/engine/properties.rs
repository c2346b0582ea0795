//! Property value operations.

use super::Engine;
use crate::error::{CoreError, CoreResult};
use crate::project::{namespace_of, namespace_path, qualify, unqualified};
use crate::property::asset::{default_asset_url, materialize};
use crate::property::{PropertyDefinition, PropertyType, UploadTarget, FIRST_NAME, LAST_NAME};
use crate::store::{self, Record, RecordStore};
use crate::types::{ObjectKind, RecordId};
use serde_json::Value;

/// Where a property value lives once its code is resolved.
struct Slot {
    kind: ObjectKind,
    /// Qualified store code, or the project prefix for project values.
    store: String,
    prefix: String,
    code: String,
    definition: PropertyDefinition,
}

enum NameField {
    First,
    Last,
}

impl Slot {
    fn name_field(&self) -> Option<NameField> {
        if self.kind != ObjectKind::User {
            return None;
        }
        match unqualified(&self.code) {
            FIRST_NAME => Some(NameField::First),
            LAST_NAME => Some(NameField::Last),
            _ => None,
        }
    }

    fn unique(&self) -> bool {
        self.definition.property_type == PropertyType::Unique
    }
}

impl Engine {
    fn slot(&self, kind: ObjectKind, store: &str, code: &str) -> CoreResult<Slot> {
        let (store, prefix, path) = match kind {
            ObjectKind::Project => {
                let project = self.projects.resolve(store)?;
                (project.prefix.clone(), project.prefix.clone(), project.path.clone())
            }
            ObjectKind::Data | ObjectKind::User => {
                let store = self.store_code(store)?;
                let path = namespace_of(&store).to_string();
                let prefix = path.replace('/', "-");
                (store, prefix, path)
            }
        };
        let code = qualify(&path, code);
        let definition = self
            .properties
            .get(&prefix, kind, &code)
            .cloned()
            .ok_or_else(|| CoreError::PropertyNotFound { code: code.clone() })?;
        Ok(Slot {
            kind,
            store,
            prefix,
            code,
            definition,
        })
    }

    fn asset_project_path(&self, prefix: &str) -> String {
        if self.config.project_path.is_empty() {
            namespace_path(prefix)
        } else {
            self.config.project_path.clone()
        }
    }

    fn default_value(&self, slot: &Slot) -> CoreResult<Value> {
        if slot.definition.property_type.is_asset() {
            let dir = self.projects.get(&slot.prefix).and_then(|p| p.dir.as_deref());
            if let Some(dir) = dir {
                let project_path = self.asset_project_path(&slot.prefix);
                if let Some(url) = default_asset_url(dir, slot.kind, &slot.code, &project_path)? {
                    return Ok(Value::String(url));
                }
            }
        }
        Ok(slot.definition.default.clone())
    }

    /// Returns a property value, or its default when none is stored.
    ///
    /// `store` is a store code for data and user properties and a project
    /// (namespace, prefix or path) for project properties, where `id` is
    /// ignored. The default of an image or file property is the URL of the
    /// asset shipped with the project, if any.
    pub fn get_property_value(
        &self,
        kind: ObjectKind,
        store: &str,
        id: &RecordId,
        code: &str,
    ) -> CoreResult<Value> {
        let slot = self.slot(kind, store, code)?;
        let stored = match kind {
            ObjectKind::Project => self.stores.project_value(&slot.store, &slot.code).cloned(),
            ObjectKind::Data => self
                .stores
                .data_store(&slot.store)?
                .require(id)?
                .properties()
                .get(&slot.code)
                .cloned(),
            ObjectKind::User => {
                let user = self.stores.user_store(&slot.store)?.require(id)?;
                match slot.name_field() {
                    Some(NameField::First) => Some(Value::from(user.first_name())),
                    Some(NameField::Last) => Some(Value::from(user.last_name())),
                    None => user.properties().get(&slot.code).cloned(),
                }
            }
        };
        match stored {
            Some(value) => Ok(value),
            None => self.default_value(&slot),
        }
    }

    /// Stores a property value.
    ///
    /// Null is rejected. A unique value already held by another record of
    /// the store is rejected with `DuplicateValue`. Image and file values
    /// must be an upload descriptor or a base64 data URI; the asset is
    /// written and its public path stored.
    pub fn set_property_value(
        &mut self,
        kind: ObjectKind,
        store: &str,
        id: &RecordId,
        code: &str,
        value: Value,
    ) -> CoreResult<()> {
        let slot = self.slot(kind, store, code)?;
        if value.is_null() {
            return Err(CoreError::NotNull { code: slot.code });
        }
        match kind {
            ObjectKind::Data => {
                self.stores.data_store(&slot.store)?.require(id)?;
            }
            ObjectKind::User => {
                self.stores.user_store(&slot.store)?.require(id)?;
            }
            ObjectKind::Project => {}
        }

        let value = if slot.definition.property_type.is_asset() {
            let project_path = self.asset_project_path(&slot.prefix);
            let target = UploadTarget {
                kind,
                code: &slot.code,
                storage_dir: self.config.storage_dir.as_deref(),
                write_enabled: self.config.write_enabled,
                project_path: &project_path,
            };
            Value::String(materialize(&value, &target)?)
        } else {
            value
        };

        match kind {
            ObjectKind::Project => {
                self.stores.set_project_value(&slot.prefix, &slot.code, value);
                Ok(())
            }
            ObjectKind::Data => {
                let target = self.stores.data_store_mut(&slot.store)?;
                store::set_property(target, id, &slot.code, value, slot.unique())
            }
            ObjectKind::User => {
                let target = self.stores.user_store_mut(&slot.store)?;
                match slot.name_field() {
                    Some(NameField::First) => target.set_first_name(id, &display_text(&value)),
                    Some(NameField::Last) => target.set_last_name(id, &display_text(&value)),
                    None => store::set_property(target, id, &slot.code, value, slot.unique()),
                }
            }
        }
    }

    /// Removes a stored property value; the default applies again.
    ///
    /// No-op if nothing is stored. Deleting a user's first or last name
    /// clears it.
    pub fn delete_property_value(
        &mut self,
        kind: ObjectKind,
        store: &str,
        id: &RecordId,
        code: &str,
    ) -> CoreResult<()> {
        let slot = self.slot(kind, store, code)?;
        match kind {
            ObjectKind::Project => {
                self.stores.delete_project_value(&slot.prefix, &slot.code);
                Ok(())
            }
            ObjectKind::Data => {
                let target = self.stores.data_store_mut(&slot.store)?;
                store::delete_property(target, id, &slot.code, slot.unique())
            }
            ObjectKind::User => {
                let target = self.stores.user_store_mut(&slot.store)?;
                match slot.name_field() {
                    Some(NameField::First) => target.set_first_name(id, ""),
                    Some(NameField::Last) => target.set_last_name(id, ""),
                    None => store::delete_property(target, id, &slot.code, slot.unique()),
                }
            }
        }
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
