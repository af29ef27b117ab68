//! Document parsing into [DocumentNode]s.
//!
//! ## Key Components
//!
//! - [`DocCodec`] trait - one parser per source format
//! - [`CodecMap`] - registry of available codecs keyed by file extension (accessible via
//!   [`CODECS`])
//! - [`gherkin`] - `.feature` files into a feature node plus its scenarios
//! - [`md`] - Markdown epics with YAML front matter and ordered sections
//! - [`DocumentCompiler`] - drives a batch of [SourceArtifact]s through the codecs
//! - [`ParseDiagnostic`] - non-fatal problems found while parsing and assembling
//!
//! ## Built-in Codecs
//!
//! - **Gherkin** (`.feature`) - via [`gherkin::GherkinCodec`]
//! - **Markdown** (`.md`) - via [`md::MdCodec`]
//!
//! Register custom codecs via [`CodecMap::insert`]:
//!
//! ```rust
//! use lamad_core::{
//!     codec::{CodecContext, CodecOutput, DocCodec, SourceArtifact, CODECS},
//!     LamadError,
//! };
//!
//! #[derive(Default)]
//! struct PlainTextCodec;
//!
//! impl DocCodec for PlainTextCodec {
//!     fn parse(
//!         &self,
//!         _artifact: &SourceArtifact,
//!         _content: &str,
//!         _ctx: &mut CodecContext<'_>,
//!     ) -> Result<CodecOutput, LamadError> {
//!         Ok(CodecOutput::default())
//!     }
//! }
//!
//! CODECS.insert::<PlainTextCodec>("txt");
//! assert!(CODECS.get("txt").is_some());
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    error::LamadError,
    ids::IdAllocator,
    paths::{extension, infer_category, normalize_source_path},
    properties::DocumentNode,
};

pub mod compiler;
pub mod diagnostic;
pub mod gherkin;
pub mod md;

pub use compiler::{
    ArtifactSource, CompileOutput, DirectorySource, DocumentCompiler, MemorySource, ParseResult,
};
pub use diagnostic::{ParseDiagnostic, UnresolvedReference};
pub use gherkin::{parse_feature, parse_feature_with, GherkinCodec, ParseOptions, ParsedFeature};
pub use md::{extract_epic, extract_sections, FrontMatter, MdCodec};

/// Global codec map with the builtin codecs (feature, md)
pub static CODECS: Lazy<CodecMap> = Lazy::new(CodecMap::create);

/// One entry of the input contract: a document path relative to the documentation root, and
/// the category it is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceArtifact {
    pub path: String,
    pub category: String,
}

impl SourceArtifact {
    pub fn new(path: impl AsRef<str>, category: impl Into<String>) -> Self {
        SourceArtifact {
            path: normalize_source_path(path.as_ref()),
            category: category.into(),
        }
    }

    /// Build an artifact whose category is inferred from its path.
    pub fn from_path(path: impl AsRef<str>) -> Self {
        let path = normalize_source_path(path.as_ref());
        let category = infer_category(&path);
        SourceArtifact { path, category }
    }

    pub fn extension(&self) -> Option<String> {
        extension(&self.path)
    }
}

/// Per-build state handed to every codec invocation.
pub struct CodecContext<'a> {
    /// Shared across the whole build so generated ids never collide.
    pub ids: &'a mut IdAllocator,
    pub options: ParseOptions,
    /// Markdown file names that are treated as epics without front matter saying so.
    pub epic_file_names: &'a [String],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecOutput {
    pub nodes: Vec<DocumentNode>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

pub trait DocCodec: Send + Sync {
    /// Parse one artifact. Errors are fatal to this artifact only.
    fn parse(
        &self,
        artifact: &SourceArtifact,
        content: &str,
        ctx: &mut CodecContext<'_>,
    ) -> Result<CodecOutput, LamadError>;
}

#[derive(Clone)]
pub struct CodecMap(Arc<RwLock<Vec<(String, Arc<dyn DocCodec>)>>>);

impl CodecMap {
    pub fn create() -> Self {
        CodecMap(Arc::new(RwLock::new(vec![
            (
                crate::paths::FEATURE_EXTENSION.to_string(),
                Arc::new(GherkinCodec) as Arc<dyn DocCodec>,
            ),
            (
                crate::paths::MARKDOWN_EXTENSION.to_string(),
                Arc::new(MdCodec) as Arc<dyn DocCodec>,
            ),
        ])))
    }

    /// Register `T` for `extension`, replacing any codec already registered for it.
    pub fn insert<T: DocCodec + Default + 'static>(&self, extension: &str) {
        let extension = extension.to_lowercase();
        let mut writer = self.0.write();
        if let Some(entry) = writer.iter_mut().find(|(ext, _)| *ext == extension) {
            entry.1 = Arc::new(T::default());
        } else {
            writer.push((extension, Arc::new(T::default())));
        }
    }

    pub fn get(&self, ext: &str) -> Option<Arc<dyn DocCodec>> {
        let ext = ext.to_lowercase();
        self.0
            .read()
            .iter()
            .find(|(codec_ext, _)| *codec_ext == ext)
            .map(|(_, codec)| codec.clone())
    }

    pub fn extensions(&self) -> Vec<String> {
        self.0.read().iter().map(|(ext, _)| ext.clone()).collect()
    }
}

impl std::fmt::Debug for CodecMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CodecMap").field(&self.extensions()).finish()
    }
}

/// SHA-256 hex digest of `text`.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_codecs() {
        let codecs = CodecMap::create();
        assert_eq!(codecs.extensions(), vec!["feature", "md"]);
        assert!(codecs.get("FEATURE").is_some());
        assert!(codecs.get("toml").is_none());
    }

    #[test]
    fn test_source_artifact_infers_category() {
        let artifact = SourceArtifact::from_path("./value_scanner/caregiver.feature");
        assert_eq!(artifact.path, "value_scanner/caregiver.feature");
        assert_eq!(artifact.category, "value-scanner");
        assert_eq!(artifact.extension().as_deref(), Some("feature"));
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
