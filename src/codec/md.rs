use pulldown_cmark::{
    Event as MdEvent, HeadingLevel, MetadataBlockKind, Options, Parser as MdParser, Tag as MdTag,
    TagEnd as MdTagEnd,
};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};

use crate::{
    codec::{
        content_hash, diagnostic::ParseDiagnostic, CodecContext, CodecOutput, DocCodec,
        SourceArtifact,
    },
    error::LamadError,
    ids::IdAllocator,
    paths::{file_name, to_anchor},
    properties::{
        EpicNode, NodeBase, NodeType, Section, META_CATEGORY, META_CONTENT_HASH, META_EPIC_ALIAS,
    },
};

pub use pulldown_cmark;

pub const UNTITLED_EPIC: &str = "Untitled";
pub const NO_DESCRIPTION: &str = "No description available";
/// Upper bound, in characters, on a description taken from the document body.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const META_RELATED_USERS: &str = "relatedUsers";

pub fn lamad_md_options() -> Options {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_GFM);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    md_options
}

/// Recognised YAML front-matter keys. Anything else is kept in `extra` and copied into the
/// epic's metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FrontMatter {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
    #[serde(rename = "type", alias = "contentType")]
    pub node_type: Option<String>,
    /// Alias that `epic:<alias>` tags may use to name this epic.
    pub epic: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub related_epics: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub related_users: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FrontMatter {
    pub fn declares_epic(&self) -> bool {
        self.node_type
            .as_deref()
            .map(|t| t.trim().eq_ignore_ascii_case(NodeType::Epic.as_str()))
            .unwrap_or(false)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Heading {
    level: u8,
    title: String,
    start: usize,
    end: usize,
}

/// Everything a single pass over the Markdown event stream yields.
#[derive(Debug, Default)]
struct Outline {
    front_matter: Option<String>,
    headings: Vec<Heading>,
    first_h1: Option<String>,
    first_paragraph: Option<String>,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn outline(content: &str) -> Outline {
    let mut out = Outline::default();
    let mut metadata: Option<String> = None;
    let mut heading: Option<(u8, String, usize)> = None;
    let mut paragraph: Option<String> = None;
    let mut nesting = 0usize;

    for (event, range) in MdParser::new_ext(content, lamad_md_options()).into_offset_iter() {
        match event {
            MdEvent::Start(MdTag::BlockQuote(_) | MdTag::List(_)) => nesting += 1,
            MdEvent::End(MdTagEnd::BlockQuote(_) | MdTagEnd::List(_)) => {
                nesting = nesting.saturating_sub(1);
            }
            MdEvent::Start(MdTag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                metadata = Some(String::new());
            }
            MdEvent::End(MdTagEnd::MetadataBlock(_)) => {
                if let Some(yaml) = metadata.take() {
                    out.front_matter.get_or_insert(yaml);
                }
            }
            MdEvent::Start(MdTag::Heading { level, .. })
                if nesting == 0 && is_atx_line(content, range.start) =>
            {
                heading = Some((heading_level(level), String::new(), range.start));
            }
            MdEvent::End(MdTagEnd::Heading(_)) => {
                if let Some((level, title, start)) = heading.take() {
                    let title = title.trim().to_string();
                    if level == 1 && out.first_h1.is_none() && !title.is_empty() {
                        out.first_h1 = Some(title.clone());
                    }
                    out.headings.push(Heading {
                        level,
                        title,
                        start,
                        end: range.end,
                    });
                }
            }
            MdEvent::Start(MdTag::Paragraph)
                if !out.headings.is_empty() && out.first_paragraph.is_none() =>
            {
                paragraph = Some(String::new());
            }
            MdEvent::End(MdTagEnd::Paragraph) => {
                if let Some(text) = paragraph.take() {
                    let text = text.trim();
                    if !text.is_empty() {
                        out.first_paragraph = Some(text.to_string());
                    }
                }
            }
            MdEvent::Text(text) | MdEvent::Code(text) => {
                if let Some(yaml) = metadata.as_mut() {
                    yaml.push_str(&text);
                } else if let Some((_, title, _)) = heading.as_mut() {
                    title.push_str(&text);
                } else if let Some(para) = paragraph.as_mut() {
                    para.push_str(&text);
                }
            }
            MdEvent::SoftBreak | MdEvent::HardBreak => {
                if let Some((_, title, _)) = heading.as_mut() {
                    title.push(' ');
                } else if let Some(para) = paragraph.as_mut() {
                    para.push(' ');
                }
            }
            _ => {}
        }
    }
    out
}

/// Whether the line holding `offset` opens with an ATX marker (`#` to `######`) at column 0.
fn is_atx_line(content: &str, offset: usize) -> bool {
    let line_start = content
        .get(..offset)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |nl| nl + 1);
    let line = content.get(line_start..).unwrap_or_default();
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    (1..=6).contains(&hashes)
        && line[hashes..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
}

fn sections_from(content: &str, headings: &[Heading]) -> Vec<Section> {
    let mut used: HashSet<String> = HashSet::new();
    let mut sections = Vec::with_capacity(headings.len());
    for (idx, heading) in headings.iter().enumerate() {
        let body_end = headings
            .get(idx + 1)
            .map(|next| next.start)
            .unwrap_or(content.len());
        let body = content
            .get(heading.end..body_end)
            .unwrap_or_default()
            .trim()
            .to_string();
        sections.push(Section {
            title: heading.title.clone(),
            anchor: unique_anchor(&heading.title, &mut used),
            level: heading.level,
            content: body,
        });
    }
    sections
}

/// Slug `title`, appending `-1`, `-2`, ... until it is not in `used`.
fn unique_anchor(title: &str, used: &mut HashSet<String>) -> String {
    let mut base = to_anchor(title);
    if base.is_empty() {
        base = "section".to_string();
    }
    let mut anchor = base.clone();
    let mut suffix = 0;
    while used.contains(&anchor) {
        suffix += 1;
        anchor = format!("{base}-{suffix}");
    }
    used.insert(anchor.clone());
    anchor
}

/// The ordered heading sections of a Markdown document. Only ATX headings at column 0 outside
/// block quotes and lists count; headings inside code blocks and the front-matter block are not
/// sections.
pub fn extract_sections(markdown: &str) -> Vec<Section> {
    sections_from(markdown, &outline(markdown).headings)
}

/// Parse the leading YAML front matter, if there is one.
pub fn parse_front_matter(markdown: &str) -> Result<Option<FrontMatter>, LamadError> {
    match outline(markdown).front_matter {
        Some(yaml) if !yaml.trim().is_empty() => Ok(Some(serde_yaml::from_str(&yaml)?)),
        _ => Ok(None),
    }
}

/// Whether a Markdown artifact should be compiled into an epic.
pub fn is_epic_document(
    source_path: &str,
    front_matter: Option<&FrontMatter>,
    epic_file_names: &[String],
) -> bool {
    if front_matter.map(FrontMatter::declares_epic).unwrap_or(false) {
        return true;
    }
    let name = file_name(source_path);
    epic_file_names
        .iter()
        .any(|epic_name| epic_name.eq_ignore_ascii_case(&name))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEpic {
    pub epic: EpicNode,
    pub diagnostics: Vec<ParseDiagnostic>,
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Compile a Markdown document into an [EpicNode].
///
/// Malformed front matter is reported as a warning and otherwise ignored.
pub fn extract_epic(
    content: &str,
    artifact: &SourceArtifact,
    ids: &mut IdAllocator,
) -> ExtractedEpic {
    let mut diagnostics = Vec::new();
    let outline = outline(content);
    let front_matter = lenient_front_matter(&outline, &artifact.path, &mut diagnostics);
    let epic = epic_from_outline(content, artifact, ids, &outline, front_matter);
    ExtractedEpic { epic, diagnostics }
}

/// The document's front matter, or the default when it is missing or malformed. A malformed
/// block is reported as a warning.
fn lenient_front_matter(
    outline: &Outline,
    source_path: &str,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> FrontMatter {
    match outline.front_matter.as_deref() {
        Some(yaml) if !yaml.trim().is_empty() => {
            match serde_yaml::from_str::<FrontMatter>(yaml) {
                Ok(front_matter) => front_matter,
                Err(e) => {
                    tracing::warn!("[md] {source_path}: ignoring front matter: {e}");
                    diagnostics.push(ParseDiagnostic::warning(format!(
                        "{source_path}: front matter could not be parsed: {e}"
                    )));
                    FrontMatter::default()
                }
            }
        }
        _ => FrontMatter::default(),
    }
}

fn epic_from_outline(
    content: &str,
    artifact: &SourceArtifact,
    ids: &mut IdAllocator,
    outline: &Outline,
    front_matter: FrontMatter,
) -> EpicNode {
    let id = match front_matter.id.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => ids.reserve(explicit),
        _ => ids.generate(&artifact.path, NodeType::Epic, None),
    };

    let mut base = NodeBase::new(id, &artifact.path);
    base.title = front_matter
        .title
        .clone()
        .or(outline.first_h1.clone())
        .unwrap_or_else(|| UNTITLED_EPIC.to_string());
    base.description = front_matter
        .description
        .clone()
        .or_else(|| {
            outline
                .first_paragraph
                .as_deref()
                .map(|p| truncate_chars(p, MAX_DESCRIPTION_CHARS))
        })
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
    base.tags = front_matter
        .tags
        .iter()
        .map(|t| t.trim().trim_start_matches('@').to_string())
        .filter(|t| !t.is_empty())
        .collect();
    base.content = content.to_string();
    for related in front_matter
        .features
        .iter()
        .chain(front_matter.related_epics.iter())
    {
        base.push_related(related.trim());
    }

    for (key, value) in front_matter.extra.iter() {
        base.metadata.insert(key.clone(), value.clone());
    }
    base.set_meta(META_CATEGORY, artifact.category.as_str());
    base.set_meta(META_CONTENT_HASH, content_hash(content));
    if let Some(alias) = front_matter.epic.as_deref().map(str::trim) {
        if !alias.is_empty() {
            base.set_meta(META_EPIC_ALIAS, alias);
        }
    }
    if !front_matter.related_users.is_empty() {
        base.set_meta(META_RELATED_USERS, front_matter.related_users.clone());
    }

    tracing::debug!(
        "[md] {}: epic '{}' with {} sections",
        artifact.path,
        base.title,
        outline.headings.len()
    );

    EpicNode {
        base,
        markdown_content: content.to_string(),
        sections: sections_from(content, &outline.headings),
        feature_ids: front_matter
            .features
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
    }
}

/// [DocCodec] for `.md` artifacts. Non-epic Markdown produces no nodes.
#[derive(Debug, Clone, Default)]
pub struct MdCodec;

impl DocCodec for MdCodec {
    fn parse(
        &self,
        artifact: &SourceArtifact,
        content: &str,
        ctx: &mut CodecContext<'_>,
    ) -> Result<CodecOutput, LamadError> {
        let mut diagnostics = Vec::new();
        let outline = outline(content);
        let front_matter = lenient_front_matter(&outline, &artifact.path, &mut diagnostics);
        if !is_epic_document(&artifact.path, Some(&front_matter), ctx.epic_file_names) {
            diagnostics.push(ParseDiagnostic::info(format!(
                "{}: not an epic document, skipped",
                artifact.path
            )));
            return Ok(CodecOutput {
                nodes: Vec::new(),
                diagnostics,
            });
        }
        let epic = epic_from_outline(content, artifact, ctx.ids, &outline, front_matter);
        Ok(CodecOutput {
            nodes: vec![epic.into()],
            diagnostics,
        })
    }
}
