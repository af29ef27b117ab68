use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use crate::{
    codec::{CodecContext, CodecMap, ParseDiagnostic, ParseOptions, SourceArtifact, CODECS},
    config::LamadConfig,
    error::LamadError,
    ids::IdAllocator,
    paths::normalize_source_path,
    properties::{DocumentNode, EpicNode, FeatureNode, ScenarioNode},
};

/// The input side of a build: something that can enumerate documentation artifacts and hand
/// back their text.
pub trait ArtifactSource {
    fn list_source_artifacts(&self) -> Result<Vec<SourceArtifact>, LamadError>;
    fn read_artifact(&self, path: &str) -> Result<String, LamadError>;
}

/// Lists every file under `root` whose extension has a registered codec.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource {
            root: root.into(),
            extensions: CODECS.extensions(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

impl ArtifactSource for DirectorySource {
    fn list_source_artifacts(&self) -> Result<Vec<SourceArtifact>, LamadError> {
        if !self.root.is_dir() {
            return Err(LamadError::NotFound(format!(
                "documentation root {:?} is not a directory",
                self.root
            )));
        }
        let mut artifacts = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root)?;
            let artifact = SourceArtifact::from_path(relative.to_string_lossy());
            if artifact
                .extension()
                .map(|ext| self.extensions.contains(&ext))
                .unwrap_or(false)
            {
                artifacts.push(artifact);
            }
        }
        tracing::debug!(
            "[DirectorySource] {} artifacts under {:?}",
            artifacts.len(),
            self.root
        );
        Ok(artifacts)
    }

    fn read_artifact(&self, path: &str) -> Result<String, LamadError> {
        Ok(read_to_string(self.root.join(normalize_source_path(path)))?)
    }
}

/// Artifacts held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    artifacts: BTreeMap<String, (SourceArtifact, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact whose category is inferred from its path.
    pub fn insert(&mut self, path: &str, content: impl Into<String>) -> &mut Self {
        self.insert_artifact(SourceArtifact::from_path(path), content)
    }

    pub fn insert_artifact(
        &mut self,
        artifact: SourceArtifact,
        content: impl Into<String>,
    ) -> &mut Self {
        self.artifacts
            .insert(artifact.path.clone(), (artifact, content.into()));
        self
    }
}

impl ArtifactSource for MemorySource {
    fn list_source_artifacts(&self) -> Result<Vec<SourceArtifact>, LamadError> {
        Ok(self.artifacts.values().map(|(a, _)| a.clone()).collect())
    }

    fn read_artifact(&self, path: &str) -> Result<String, LamadError> {
        self.artifacts
            .get(&normalize_source_path(path))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| LamadError::NotFound(path.to_string()))
    }
}

/// Outcome of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub artifact: SourceArtifact,
    /// Ids of the nodes this artifact contributed, in emission order
    pub node_ids: Vec<String>,
    pub diagnostics: Vec<ParseDiagnostic>,
    /// Set when the artifact could not be read or parsed; it then contributes no nodes.
    pub error: Option<LamadError>,
}

impl ParseResult {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything a compile pass produced, ready for [crate::docgraph::build_graph].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOutput {
    pub epics: Vec<EpicNode>,
    pub features: Vec<FeatureNode>,
    pub scenarios: Vec<ScenarioNode>,
    /// One entry per listed artifact, in compile order
    pub results: Vec<ParseResult>,
}

impl CompileOutput {
    pub fn node_count(&self) -> usize {
        self.epics.len() + self.features.len() + self.scenarios.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ParseResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&SourceArtifact, &ParseDiagnostic)> {
        self.results
            .iter()
            .flat_map(|r| r.diagnostics.iter().map(move |d| (&r.artifact, d)))
    }

    fn push(&mut self, node: DocumentNode) {
        match node {
            DocumentNode::Epic(epic) => self.epics.push(epic),
            DocumentNode::Feature(feature) => self.features.push(feature),
            DocumentNode::Scenario(scenario) => self.scenarios.push(scenario),
        }
    }
}

/// Drives every artifact of an [ArtifactSource] through the codec registered for its
/// extension.
///
/// Artifacts are compiled in path order with one [IdAllocator] shared across the batch, so the
/// same input tree always yields the same ids. A file that fails to read or parse is recorded
/// in its [ParseResult] and left out; it never aborts the batch.
#[derive(Debug, Clone)]
pub struct DocumentCompiler {
    codecs: CodecMap,
    options: ParseOptions,
    epic_file_names: Vec<String>,
}

impl Default for DocumentCompiler {
    fn default() -> Self {
        Self::from_config(&LamadConfig::default())
    }
}

impl DocumentCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LamadConfig) -> Self {
        DocumentCompiler {
            codecs: CODECS.clone(),
            options: config.parse_options(),
            epic_file_names: config.epic_file_names.clone(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_codecs(mut self, codecs: CodecMap) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_epic_file_names(mut self, names: Vec<String>) -> Self {
        self.epic_file_names = names;
        self
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Compile every artifact the source lists. Only a failure to list the source is an error.
    #[tracing::instrument(skip_all)]
    pub fn compile<S: ArtifactSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<CompileOutput, LamadError> {
        let mut artifacts = source.list_source_artifacts()?;
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        artifacts.dedup_by(|a, b| a.path == b.path);

        let mut ids = IdAllocator::new();
        let mut output = CompileOutput::default();
        for artifact in artifacts {
            let result = match source.read_artifact(&artifact.path) {
                Ok(content) => self.compile_artifact(&artifact, &content, &mut ids, &mut output),
                Err(e) => {
                    tracing::warn!("[Compiler] Failed to read {:?}: {}", artifact.path, e);
                    ParseResult {
                        artifact,
                        node_ids: Vec::new(),
                        diagnostics: Vec::new(),
                        error: Some(e),
                    }
                }
            };
            output.results.push(result);
        }

        tracing::info!(
            "[Compiler] compiled {} artifacts: {} epics, {} features, {} scenarios, {} failures",
            output.results.len(),
            output.epics.len(),
            output.features.len(),
            output.scenarios.len(),
            output.failures().count()
        );
        Ok(output)
    }

    fn compile_artifact(
        &self,
        artifact: &SourceArtifact,
        content: &str,
        ids: &mut IdAllocator,
        output: &mut CompileOutput,
    ) -> ParseResult {
        let mut result = ParseResult {
            artifact: artifact.clone(),
            node_ids: Vec::new(),
            diagnostics: Vec::new(),
            error: None,
        };
        let Some(codec) = artifact
            .extension()
            .and_then(|ext| self.codecs.get(&ext))
        else {
            result.diagnostics.push(ParseDiagnostic::info(format!(
                "{}: no codec registered for this file type",
                artifact.path
            )));
            return result;
        };

        let mut ctx = CodecContext {
            ids,
            options: self.options,
            epic_file_names: &self.epic_file_names,
        };
        match codec.parse(artifact, content, &mut ctx) {
            Ok(parsed) => {
                for diagnostic in parsed.diagnostics.iter().filter(|d| d.is_warning()) {
                    tracing::warn!("[Compiler] {}: {}", artifact.path, diagnostic);
                }
                result.diagnostics = parsed.diagnostics;
                for node in parsed.nodes {
                    result.node_ids.push(node.id().to_string());
                    output.push(node);
                }
                tracing::debug!(
                    "[Compiler] {} -> {} nodes",
                    artifact.path,
                    result.node_ids.len()
                );
            }
            Err(e) => {
                tracing::warn!("[Compiler] Failed to parse {:?}: {}", artifact.path, e);
                result.error = Some(e);
            }
        }
        result
    }
}
