//! Slug and source-path helpers shared by the codecs, the id generator and the exporter.
//!
//! Source paths are always handled as `/`-separated strings relative to the documentation root,
//! regardless of platform, so that ids derived from them are stable everywhere.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub const FEATURE_EXTENSION: &str = "feature";
pub const MARKDOWN_EXTENSION: &str = "md";
pub const DEFAULT_CATEGORY: &str = "general";

/// Lowercase `text`, fold accents away, and collapse every run of non-alphanumeric characters
/// into a single `sep`. Leading and trailing separators never appear in the output.
pub fn slugify(text: &str, sep: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(sep);
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Turn a heading title into its deep-link anchor.
pub fn to_anchor(title: &str) -> String {
    slugify(title, '-')
}

/// Turn a title into the `_`-joined form used inside node ids.
pub fn to_id_slug(title: &str) -> String {
    slugify(title, '_')
}

/// Normalize a source path to `/` separators with no leading `./` or `/`.
pub fn normalize_source_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// The last `n` non-empty segments of a source path.
pub fn path_tail(path: &str, n: usize) -> Vec<String> {
    let normalized = normalize_source_path(path);
    let segments = normalized.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    let start = segments.len().saturating_sub(n);
    segments[start..].iter().map(|s| s.to_string()).collect()
}

/// Strip a trailing `.feature` or `.md` extension.
pub fn strip_doc_extension(name: &str) -> &str {
    name.strip_suffix(".feature")
        .or_else(|| name.strip_suffix(".md"))
        .unwrap_or(name)
}

/// The final path segment.
pub fn file_name(path: &str) -> String {
    path_tail(path, 1).pop().unwrap_or_default()
}

/// The file extension of the final path segment, without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    name.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_lowercase())
}

/// The name of the directory directly containing the file, if any.
pub fn parent_dir_name(path: &str) -> Option<String> {
    let mut tail = path_tail(path, 2);
    if tail.len() < 2 {
        return None;
    }
    tail.truncate(1);
    tail.pop()
}

/// Infer a category from a source path: its first segment with `_` turned into `-`, or
/// [DEFAULT_CATEGORY] for files at the root.
pub fn infer_category(source_path: &str) -> String {
    let normalized = normalize_source_path(source_path);
    let parts = normalized.split('/').collect::<Vec<_>>();
    if parts.len() > 1 {
        parts[0].replace('_', "-")
    } else {
        DEFAULT_CATEGORY.to_string()
    }
}
