//! Writing selected Gherkin features to disk.
//!
//! Two producers feed one [FeatureWriter]:
//!
//! - [fetch_features] walks a [LearningPath] served by a [ContentSource] and keeps the resources
//!   that pass the [crate::selection] rules.
//! - [graph_features] takes the feature nodes of a built [DocumentGraph].
//!
//! Output layout:
//!
//! ```text
//! <out>/<category>/<slug(id)>.feature
//! <out>/manifest.json   {fetchedAt, featureCount, features: [{id, title, category}]}
//! ```
//!
//! The output directory is cleared before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    docgraph::DocumentGraph,
    error::LamadError,
    paths::{to_anchor, DEFAULT_CATEGORY, FEATURE_EXTENSION},
    properties::{DocumentNode, NodeType},
    selection::{categorize_feature, is_gherkin_feature, matches_tags, ContentRecord},
};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub resource_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathModule {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<PathStep>,
    #[serde(default)]
    pub sections: Vec<PathSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathChapter {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<PathStep>,
    #[serde(default)]
    pub modules: Vec<PathModule>,
}

/// An ordered walk over content resources, optionally grouped into chapters, modules and
/// sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<PathStep>,
    #[serde(default)]
    pub chapters: Vec<PathChapter>,
}

impl LearningPath {
    /// Every resource id in reading order, each reported once.
    pub fn resource_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut visit = |steps: &[PathStep]| {
            for step in steps {
                if !step.resource_id.is_empty() && seen.insert(step.resource_id.clone()) {
                    ids.push(step.resource_id.clone());
                }
            }
        };
        visit(&self.steps);
        for chapter in self.chapters.iter() {
            visit(&chapter.steps);
            for module in chapter.modules.iter() {
                visit(&module.steps);
                for section in module.sections.iter() {
                    visit(&section.steps);
                }
            }
        }
        ids
    }
}

/// Where learning paths and content records come from.
pub trait ContentSource {
    fn fetch_path(&self, id: &str) -> Result<LearningPath, LamadError>;
    fn fetch_content(&self, id: &str) -> Result<ContentRecord, LamadError>;
}

/// A directory holding `paths/<id>.json` and `content/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonContentSource {
    root: PathBuf,
}

impl JsonContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonContentSource { root: root.into() }
    }

    fn file_for(&self, kind: &str, id: &str) -> Result<PathBuf, LamadError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(LamadError::NotFound(format!("invalid {kind} id {id:?}")));
        }
        Ok(self.root.join(kind).join(format!("{id}.json")))
    }

    fn read<T: serde::de::DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T, LamadError> {
        let file = self.file_for(kind, id)?;
        let text = fs::read_to_string(&file).map_err(|e| match LamadError::from(e) {
            LamadError::NotFound(_) => LamadError::NotFound(format!("{kind}/{id}")),
            other => other,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl ContentSource for JsonContentSource {
    fn fetch_path(&self, id: &str) -> Result<LearningPath, LamadError> {
        self.read("paths", id)
    }

    fn fetch_content(&self, id: &str) -> Result<ContentRecord, LamadError> {
        self.read("content", id)
    }
}

/// A feature ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFeature {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub fetched_at: DateTime<Utc>,
    pub feature_count: usize,
    pub features: Vec<ManifestEntry>,
}

/// A resource the fetch walk did not export, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedResource {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub features: Vec<ExportedFeature>,
    pub skipped: Vec<SkippedResource>,
}

/// Resolve the learning path `path_id` and select its Gherkin resources.
///
/// Failing to fetch the path itself is an error. A resource that fails to fetch, is not
/// Gherkin, does not match `filter_tags`, or has no content is skipped and reported.
#[tracing::instrument(skip(source, filter_tags))]
pub fn fetch_features<C, S>(
    source: &C,
    path_id: &str,
    filter_tags: &[S],
) -> Result<FetchReport, LamadError>
where
    C: ContentSource + ?Sized,
    S: AsRef<str>,
{
    let path = source.fetch_path(path_id)?;
    let resource_ids = path.resource_ids();
    tracing::info!(
        "[fetch] path '{}' lists {} resources",
        path.id,
        resource_ids.len()
    );

    let mut report = FetchReport::default();
    let mut skip = |id: &str, reason: String| {
        tracing::debug!("[fetch] skipping {id}: {reason}");
        report.skipped.push(SkippedResource {
            id: id.to_string(),
            reason,
        });
    };
    let mut features = Vec::new();
    for id in resource_ids {
        let record = match source.fetch_content(&id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[fetch] could not fetch {id}: {e}");
                skip(&id, format!("fetch failed: {e}"));
                continue;
            }
        };
        if !is_gherkin_feature(&record) {
            skip(&id, "not gherkin content".to_string());
            continue;
        }
        if !matches_tags(&record, filter_tags) {
            skip(&id, "no matching tag".to_string());
            continue;
        }
        if record.content.trim().is_empty() {
            skip(&id, "empty content".to_string());
            continue;
        }
        features.push(ExportedFeature {
            category: categorize_feature(&record),
            title: if record.title.is_empty() {
                record.id.clone()
            } else {
                record.title.clone()
            },
            id: record.id,
            content: record.content,
        });
    }
    report.features = features;
    Ok(report)
}

/// The feature nodes of `graph`, in build order, that match `filter_tags`. A feature without a
/// category or epic tag keeps the category of its source directory.
pub fn graph_features<S: AsRef<str>>(
    graph: &DocumentGraph,
    filter_tags: &[S],
) -> Vec<ExportedFeature> {
    let mut features = Vec::new();
    for node in graph.nodes_of_type(NodeType::Feature) {
        let node: &DocumentNode = node;
        if !is_gherkin_feature(node) || !matches_tags(node, filter_tags) {
            continue;
        }
        let Some(feature) = node.as_feature() else {
            continue;
        };
        let mut category = categorize_feature(node);
        if category == DEFAULT_CATEGORY && !feature.category.is_empty() {
            category = feature.category.clone();
        }
        features.push(ExportedFeature {
            id: feature.base.id.clone(),
            title: feature.base.title.clone(),
            category,
            content: feature.gherkin_content.clone(),
        });
    }
    features
}

/// Writes exported features under one output directory.
#[derive(Debug, Clone)]
pub struct FeatureWriter {
    out_dir: PathBuf,
}

impl FeatureWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        FeatureWriter {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn clear(&self) -> Result<(), LamadError> {
        if self.out_dir.exists() {
            fs::remove_dir_all(&self.out_dir)?;
        }
        fs::create_dir_all(&self.out_dir)?;
        Ok(())
    }

    /// Replace the output directory's contents with `features` and a manifest.
    pub fn write(&self, features: &[ExportedFeature]) -> Result<ExportManifest, LamadError> {
        self.clear()?;
        let mut used: HashSet<PathBuf> = HashSet::new();
        let mut entries = Vec::with_capacity(features.len());
        for feature in features {
            let category = match to_anchor(&feature.category) {
                slug if slug.is_empty() => DEFAULT_CATEGORY.to_string(),
                slug => slug,
            };
            let stem = match to_anchor(&feature.id) {
                slug if slug.is_empty() => "feature".to_string(),
                slug => slug,
            };
            let dir = self.out_dir.join(&category);
            let mut file = dir.join(format!("{stem}.{FEATURE_EXTENSION}"));
            let mut suffix = 1;
            while used.contains(&file) {
                suffix += 1;
                file = dir.join(format!("{stem}-{suffix}.{FEATURE_EXTENSION}"));
            }
            fs::create_dir_all(&dir)?;
            fs::write(&file, &feature.content)?;
            tracing::debug!("[export] wrote {:?}", file);
            used.insert(file);
            entries.push(ManifestEntry {
                id: feature.id.clone(),
                title: feature.title.clone(),
                category,
            });
        }

        let manifest = ExportManifest {
            fetched_at: Utc::now(),
            feature_count: entries.len(),
            features: entries,
        };
        fs::write(
            self.out_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        tracing::info!(
            "[export] wrote {} features to {:?}",
            manifest.feature_count,
            self.out_dir
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn step(id: &str) -> PathStep {
        PathStep {
            resource_id: id.to_string(),
        }
    }

    #[test]
    fn test_resource_ids_flatten_in_reading_order() {
        let path = LearningPath {
            id: "p".to_string(),
            steps: vec![step("a")],
            chapters: vec![PathChapter {
                steps: vec![step("b")],
                modules: vec![PathModule {
                    steps: vec![step("c"), step("a")],
                    sections: vec![PathSection {
                        steps: vec![step("d"), step("")],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(path.resource_ids(), vec!["a", "b", "c", "d"]);
    }

    #[test_log::test]
    fn test_writer_clears_previous_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("stale")).unwrap();
        fs::write(out.join("stale/old.feature"), "Feature: Old\n").unwrap();

        let writer = FeatureWriter::new(&out);
        let manifest = writer
            .write(&[
                ExportedFeature {
                    id: "Feature Auth Login".to_string(),
                    title: "Login".to_string(),
                    category: "auth".to_string(),
                    content: "Feature: Login\n".to_string(),
                },
                ExportedFeature {
                    id: "feature-auth-login".to_string(),
                    title: "Login again".to_string(),
                    category: "auth".to_string(),
                    content: "Feature: Login again\n".to_string(),
                },
            ])
            .unwrap();

        assert!(!out.join("stale").exists());
        assert_eq!(
            fs::read_to_string(out.join("auth/feature-auth-login.feature")).unwrap(),
            "Feature: Login\n"
        );
        assert!(out.join("auth/feature-auth-login-2.feature").exists());
        assert_eq!(manifest.feature_count, 2);

        let on_disk: ExportManifest =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(on_disk, manifest);
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert!(raw.get("fetchedAt").is_some());
        assert_eq!(raw["featureCount"], 2);
    }

    #[test_log::test]
    fn test_missing_root_path_is_fatal() {
        let dir = TempDir::new().unwrap();
        let source = JsonContentSource::new(dir.path());
        let result = fetch_features(&source, "missing", &[] as &[&str]);
        assert!(matches!(result, Err(LamadError::NotFound(_))));
        assert!(matches!(
            source.fetch_path("../escape"),
            Err(LamadError::NotFound(_))
        ));
    }
}
