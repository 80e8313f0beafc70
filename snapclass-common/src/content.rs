//! Content registry: curated texts, images and videos per label
//!
//! The registry is built once at startup from a TOML document and never
//! mutated afterwards; it is shared read-only across all sessions.
//!
//! ```toml
//! [labels."taco"]
//! texts = ["Tacos are a Mexican dish."]
//! images = ["https://example.com/taco.jpg"]
//! videos = ["https://youtu.be/jFabzMoMERM"]
//! ```
//!
//! Lookups are exact: labels are case- and whitespace-sensitive. A label with
//! no entry resolves to an empty [`ContentSet`], which is a valid state.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Maximum number of items shown per content kind
pub const MAX_ITEMS_PER_KIND: usize = 3;

/// Sample registry compiled into the binary
const EMBEDDED_REGISTRY: &str = include_str!("../config/default_content.toml");

/// Content for one label, as authored
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentEntry {
    #[serde(default)]
    pub texts: Vec<String>,
    /// Image references: http(s) URLs or `data:image/...` URIs
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}

/// Resolved content for display: at most three non-blank items per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentSet {
    pub texts: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl ContentSet {
    /// True when nothing is configured for the label
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.images.is_empty() && self.videos.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    #[serde(default)]
    labels: BTreeMap<String, ContentEntry>,
}

/// Immutable label → content mapping
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    entries: HashMap<String, ContentEntry>,
}

impl ContentRegistry {
    /// Build a registry from already-validated entries
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ContentEntry)>,
    {
        let mut map = HashMap::new();
        for (label, entry) in entries {
            validate_entry(&label, &entry)?;
            if map.insert(label.clone(), entry).is_some() {
                return Err(Error::Config(format!(
                    "Duplicate content registry label: {:?}",
                    label
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// Parse and validate a registry TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let document: RegistryDocument = toml::from_str(content)?;
        Self::from_entries(document.labels)
    }

    /// Load and validate a registry file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read content registry {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry = Self::from_toml_str(&content)?;
        info!(
            "Loaded content registry from {} ({} labels)",
            path.display(),
            registry.len()
        );
        Ok(registry)
    }

    /// The sample registry shipped with the binary
    pub fn embedded_default() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_REGISTRY)
    }

    pub fn get(&self, label: &str) -> Option<&ContentEntry> {
        self.entries.get(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured labels, sorted
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Resolve display content for `label`
    pub fn resolve(&self, label: &str) -> ContentSet {
        resolve(label, self)
    }

    /// Registry labels that the model vocabulary does not contain
    ///
    /// Such entries can never be shown for a prediction, so each one is logged.
    pub fn labels_missing_from(&self, vocab: &[String]) -> Vec<String> {
        let missing: Vec<String> = self
            .labels()
            .into_iter()
            .filter(|label| !vocab.iter().any(|v| v == label))
            .map(str::to_string)
            .collect();
        for label in &missing {
            warn!(
                "Content registry label {:?} is not in the model vocabulary",
                label
            );
        }
        missing
    }
}

/// Look up `label` and keep the first three non-blank items of each kind
///
/// Total over all inputs: unknown labels yield an empty set.
pub fn resolve(label: &str, registry: &ContentRegistry) -> ContentSet {
    match registry.get(label) {
        Some(entry) => ContentSet {
            texts: first_non_blank(&entry.texts),
            images: first_non_blank(&entry.images),
            videos: first_non_blank(&entry.videos),
        },
        None => ContentSet::default(),
    }
}

fn first_non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .take(MAX_ITEMS_PER_KIND)
        .cloned()
        .collect()
}

fn validate_entry(label: &str, entry: &ContentEntry) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::Config(
            "Content registry label must not be empty".to_string(),
        ));
    }

    for image in entry.images.iter().filter(|i| !i.trim().is_empty()) {
        if !is_image_reference(image) {
            return Err(Error::Config(format!(
                "Label {:?}: unsupported image reference {:?} (expected http(s) URL or data:image URI)",
                label,
                truncate_for_log(image)
            )));
        }
    }

    for (kind, values) in [
        ("texts", &entry.texts),
        ("images", &entry.images),
        ("videos", &entry.videos),
    ] {
        let blank = values.iter().filter(|v| v.trim().is_empty()).count();
        if blank > 0 {
            warn!("Label {:?}: {} blank {} will be skipped", label, blank, kind);
        }
        let usable = values.len() - blank;
        if usable > MAX_ITEMS_PER_KIND {
            warn!(
                "Label {:?}: {} {} configured, only the first {} are shown",
                label, usable, kind, MAX_ITEMS_PER_KIND
            );
        }
    }

    Ok(())
}

fn is_image_reference(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("https://") || value.starts_with("http://") || value.starts_with("data:image/")
}

fn truncate_for_log(value: &str) -> String {
    value.chars().take(64).collect()
}
