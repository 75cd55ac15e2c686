//! Checklist definition file loading.
//!
//! Reads a JSON document from disk and deserializes it into a
//! `ChecklistDefinition`. Missing top-level keys are tolerated by
//! `serde(default)` on every field — equivalent to the original loader's
//! defensive `.get(key, {})` chains, just expressed as Rust defaulting
//! instead of dict lookups.

use crate::cache::TtlCache;
use crate::domain::ChecklistDefinition;
use crate::error::{PipelineError, Result};
use std::path::Path;

pub async fn load_checklist_definition(path: &Path) -> Result<ChecklistDefinition> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::NotFound(format!("{}: {e}", path.display())))?;

    let def: ChecklistDefinition = serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::InvalidInput(format!("malformed checklist definition {}: {e}", path.display())))?;

    Ok(def.coerce_flat_shape())
}

/// Read-through cached load: a cache hit skips the file read entirely.
/// Cache failures (poison recovery aside, there are none by construction)
/// never block the request — a miss just falls through to the file read
/// and the write-through is best-effort.
pub async fn load_checklist_definition_cached(
    cache: &TtlCache<ChecklistDefinition>,
    path: &Path,
) -> Result<ChecklistDefinition> {
    let key = path.to_string_lossy().to_string();
    if let Some(cached) = cache.get(&key) {
        return Ok(cached);
    }

    let def = load_checklist_definition(path).await?;
    cache.set(key, def.clone());
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn missing_top_level_keys_are_tolerated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"house_types": {{"kitchen": {{"items": []}}}}}}"#).unwrap();

        let def = load_checklist_definition(file.path()).await.unwrap();
        assert!(def.default.items.is_empty());
        assert!(def.room_types.is_empty());
        assert!(def.house_types.contains_key("kitchen"));
    }

    #[tokio::test]
    async fn flat_items_document_is_coerced_into_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"items": [{{"id": "fridge", "kind": "boolean"}}]}}"#).unwrap();

        let def = load_checklist_definition(file.path()).await.unwrap();
        assert_eq!(def.default.items.len(), 1);
        assert_eq!(def.default.items[0].id, "fridge");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let result = load_checklist_definition(Path::new("/nonexistent/path.json")).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }
}
