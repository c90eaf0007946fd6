// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact validation: which expected outputs exist after the primary stage.

use pj_core::OutputManifest;
use std::path::Path;

/// Check each expected path under `root`.
///
/// Pure check; a missing artifact is data, never an error. Order follows
/// `expected`.
pub fn validate_artifacts(root: &Path, expected: &[String]) -> OutputManifest {
    expected
        .iter()
        .map(|path| {
            let present = root.join(path).exists();
            if !present {
                tracing::debug!(artifact = %path, "expected artifact missing");
            }
            (path.clone(), present)
        })
        .collect()
}

/// Presence of the model artifact, when one is configured.
pub fn model_saved(manifest: &OutputManifest, model: Option<&str>) -> Option<bool> {
    model.map(|model| manifest.get(model).copied().unwrap_or(false))
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
