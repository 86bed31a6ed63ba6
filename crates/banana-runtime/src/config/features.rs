//! `BananaFeatures.yml` handling.
//!
//! The document is dynamic (one section per feature, keyed by name), so it is
//! read as a raw [`Mapping`] and handed to
//! [`FeatureCollection::hydrate`], which decides what to write back.

use std::path::Path;

use banana_core::{ConversionRegistry, Value};
use banana_framework::{FeatureCollection, HydrateOutcome};
use serde_yaml::Mapping;
use tracing::{debug, warn};

use super::loader::{read_yaml, write_yaml};

/// Reads the persisted features document.
///
/// A missing or empty file yields `None`. So does a malformed one, with a
/// warning; the caller then rebuilds the document from live values.
pub fn read_features_document(path: &Path) -> Option<Mapping> {
    if !path.exists() {
        return None;
    }
    match read_yaml::<Value>(path) {
        Ok(Value::Mapping(document)) => Some(document),
        Ok(Value::Null) => None,
        Ok(other) => {
            warn!(path = %path.display(), found = ?other, "Features file is not a mapping; ignoring it");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read features file; using defaults");
            None
        }
    }
}

/// Applies the features file at `path` to `features` and writes the
/// resulting document back when it changed.
pub fn load_feature_configs(
    path: &Path,
    features: &mut FeatureCollection,
    converters: &ConversionRegistry,
) -> HydrateOutcome {
    let persisted = read_features_document(path);
    let outcome = features.hydrate(persisted.as_ref(), converters);
    if outcome.changed {
        match write_yaml(path, &outcome.document) {
            Ok(()) => debug!(path = %path.display(), "Features file updated"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not write features file"),
        }
    }
    outcome
}
