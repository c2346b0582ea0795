//! Asset handling for `image` and `file` properties.
//!
//! A set value is materialized to `<storage>/properties/<Kind>/<code>.<ext>`
//! and the record stores the public path
//! `/property/<project path>/<Kind>/<code>.<ext>`, where `<code>` is the
//! qualified property code with `/` flattened to `-`.
//!
//! Defaults are served from the project's own `Properties/<Kind>/`
//! directory: the asset whose file name starts with the unqualified code.

use crate::error::{CoreError, CoreResult};
use crate::project::{prefix_of, sorted_entries, unqualified};
use crate::types::ObjectKind;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;
use simstore_storage::{FileBackend, SnapshotBackend};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fields an upload descriptor must carry.
const UPLOAD_FIELDS: [&str; 5] = ["name", "type", "tmp_name", "error", "size"];

/// Extension used when an upload name has none.
const FALLBACK_EXTENSION: &str = "bin";

/// A form-upload descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadDescriptor {
    /// Original client file name.
    pub name: String,
    /// MIME type reported by the client.
    #[serde(rename = "type")]
    pub mime: String,
    /// Path of the uploaded temporary file.
    pub tmp_name: PathBuf,
    /// Upload error code; zero means success.
    pub error: i64,
    /// Size in bytes.
    pub size: u64,
}

/// Where an uploaded asset is materialized.
#[derive(Debug, Clone, Copy)]
pub struct UploadTarget<'a> {
    /// Object kind owning the property.
    pub kind: ObjectKind,
    /// Qualified property code.
    pub code: &'a str,
    /// Storage directory, if any.
    pub storage_dir: Option<&'a Path>,
    /// Whether the asset may be written.
    pub write_enabled: bool,
    /// Public project path segment.
    pub project_path: &'a str,
}

impl UploadTarget<'_> {
    fn flat_code(&self) -> String {
        self.code.replace('/', "-")
    }

    fn public_path(&self, ext: &str) -> String {
        format!(
            "/property/{}/{}/{}.{ext}",
            self.project_path,
            self.kind.dir_name(),
            self.flat_code()
        )
    }

    fn write(&self, ext: &str, bytes: &[u8]) -> CoreResult<()> {
        let Some(dir) = self.storage_dir.filter(|_| self.write_enabled) else {
            debug!(code = self.code, "asset writes disabled, keeping path only");
            return Ok(());
        };
        let path = dir
            .join("properties")
            .join(self.kind.dir_name())
            .join(format!("{}.{ext}", self.flat_code()));
        FileBackend::new(&path).write(bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "materialized asset");
        Ok(())
    }
}

/// Validates an upload value, writes its asset and returns the public path.
///
/// Accepts an upload descriptor object or a `data:<type>/<subtype>;base64,`
/// URI string.
pub fn materialize(value: &Value, target: &UploadTarget<'_>) -> CoreResult<String> {
    match value {
        Value::Object(fields) => {
            if let Some(missing) = UPLOAD_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
                return Err(CoreError::invalid_upload(format!(
                    "expecting '{missing}' field but not found in the value"
                )));
            }
            let upload: UploadDescriptor = serde_json::from_value(value.clone())
                .map_err(|e| CoreError::invalid_upload(e.to_string()))?;
            if upload.error != 0 {
                return Err(CoreError::invalid_upload(format!(
                    "upload failed with error code {}",
                    upload.error
                )));
            }

            let ext = Path::new(&upload.name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
            if target.write_enabled && target.storage_dir.is_some() {
                let bytes = fs::read(&upload.tmp_name).map_err(|e| {
                    CoreError::invalid_upload(format!(
                        "failed to get the upload file {}: {e}",
                        upload.tmp_name.display()
                    ))
                })?;
                target.write(&ext, &bytes)?;
            }
            Ok(target.public_path(&ext))
        }
        Value::String(uri) => {
            let (subtype, bytes) = decode_data_uri(uri)?;
            target.write(&subtype, &bytes)?;
            Ok(target.public_path(&subtype))
        }
        _ => Err(CoreError::invalid_upload(
            "expecting an upload descriptor or a base64 data URI",
        )),
    }
}

/// Splits a `data:<type>/<subtype>;base64,<payload>` URI into its subtype
/// and decoded payload.
fn decode_data_uri(uri: &str) -> CoreResult<(String, Vec<u8>)> {
    let invalid = || {
        CoreError::invalid_upload(
            "the string value for a file/image property should be a valid base64 data URI",
        )
    };

    let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let (major, subtype) = mime.split_once('/').ok_or_else(invalid)?;
    let lower_alpha = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase());
    if !lower_alpha(major) || !lower_alpha(subtype) || payload.is_empty() {
        return Err(invalid());
    }

    let bytes = STANDARD.decode(payload).map_err(|_| invalid())?;
    Ok((subtype.to_string(), bytes))
}

/// Finds the default asset of an image/file property and returns its URL.
///
/// Scans `<project dir>/Properties/<Kind>/` for a non-definition file whose
/// name starts with the unqualified code; the last match in name order wins.
pub fn default_asset_url(
    project_dir: &Path,
    kind: ObjectKind,
    code: &str,
    project_path: &str,
) -> CoreResult<Option<String>> {
    let dir = project_dir.join("Properties").join(kind.dir_name());
    let wanted = unqualified(code);

    let found = sorted_entries(&dir)?
        .into_iter()
        .filter_map(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .filter(|name| {
            !name.starts_with('.')
                && !name.ends_with(".json")
                && name.to_lowercase().starts_with(wanted)
        })
        .last();

    Ok(found.map(|file| {
        format!(
            "/property/{project_path}/{}/{}-{file}",
            kind.dir_name(),
            prefix_of(code)
        )
    }))
}
