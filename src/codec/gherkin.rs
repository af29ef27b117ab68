//! Gherkin `.feature` parsing.
//!
//! A single forward scan over the lines of a feature file. The only hard failure is a file
//! whose first meaningful line is not `Feature:`; everything else the scanner does not
//! understand is stepped over so that one odd line never costs the rest of the file.
//!
//! Recognised layout:
//!
//! ```gherkin
//! @epic:auth @smoke
//! Feature: Login
//!   Free-form description lines.
//!
//!   Background:
//!     Given a clean database
//!
//!   @happy
//!   Scenario: Valid credentials
//!     Given a registered user
//!     When they submit correct credentials
//!     Then they are logged in
//!
//!   Scenario Outline: Lockout
//!     When they fail <n> times
//!     Examples:
//!       | n | locked |
//!       | 3 | yes    |
//! ```
//!
//! Lines starting with `#` are comments. Table cells are split on every `|`; there is no escape
//! syntax.

use crate::{
    codec::{
        content_hash, diagnostic::ParseDiagnostic, md::MAX_DESCRIPTION_CHARS, CodecContext,
        CodecOutput, DocCodec, SourceArtifact,
    },
    error::LamadError,
    ids::IdAllocator,
    properties::{
        ExamplesTable, FeatureNode, GherkinStep, NodeBase, NodeType, ScenarioNode, ScenarioType,
        StepKeyword, META_CATEGORY, META_CONTENT_HASH, META_FEATURE_ID, META_SCENARIO_COUNT,
    },
};

/// Tags with this prefix name the epic a feature or scenario belongs to.
pub const EPIC_TAG_PREFIX: &str = "epic:";

const UNTITLED_FEATURE: &str = "Untitled Feature";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Report every skipped line as a [ParseDiagnostic::SkippedLine].
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        ParseOptions { strict: true }
    }
}

/// Output of one feature file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeature {
    pub feature: FeatureNode,
    /// In source order.
    pub scenarios: Vec<ScenarioNode>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse one feature file with a fresh [IdAllocator] and lenient options.
pub fn parse_feature(
    content: &str,
    source_path: &str,
    category: &str,
) -> Result<ParsedFeature, LamadError> {
    let mut ids = IdAllocator::new();
    parse_feature_with(content, source_path, category, &mut ids, ParseOptions::default())
}

/// Parse one feature file, drawing ids from a shared allocator.
pub fn parse_feature_with(
    content: &str,
    source_path: &str,
    category: &str,
    ids: &mut IdAllocator,
    options: ParseOptions,
) -> Result<ParsedFeature, LamadError> {
    let parsed = FeatureScanner::new(content, source_path, options).scan()?;
    Ok(parsed.into_nodes(content, source_path, category, ids))
}

/// Extract the epic ids named by `epic:` tags, first occurrence order, deduplicated.
pub fn epic_ids_from_tags<'a, I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut epics: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(epic) = tag.strip_prefix(EPIC_TAG_PREFIX).map(str::trim) {
            if !epic.is_empty() && !epics.iter().any(|e| e == epic) {
                epics.push(epic.to_string());
            }
        }
    }
    epics
}

/// Split a `|`-delimited table row into trimmed cells.
pub fn split_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    Blank,
    Comment,
    Tags(Vec<String>),
    Feature(&'a str),
    Background,
    Scenario { outline: bool, title: &'a str },
    Examples,
    Step(StepKeyword, &'a str),
    TableRow,
    Other(&'a str),
}

impl<'a> Line<'a> {
    fn classify(raw: &'a str) -> Line<'a> {
        let line = raw.trim();
        if line.is_empty() {
            return Line::Blank;
        }
        if line.starts_with('#') {
            return Line::Comment;
        }
        if line.starts_with('@') {
            let tags = line
                .split_whitespace()
                .filter(|t| t.starts_with('@'))
                .map(|t| t.trim_start_matches('@').to_string())
                .filter(|t| !t.is_empty())
                .collect();
            return Line::Tags(tags);
        }
        if line.starts_with('|') {
            return Line::TableRow;
        }
        if let Some(title) = line.strip_prefix("Feature:") {
            return Line::Feature(title.trim());
        }
        if line.starts_with("Background:") {
            return Line::Background;
        }
        if let Some(title) = line.strip_prefix("Scenario Outline:") {
            return Line::Scenario {
                outline: true,
                title: title.trim(),
            };
        }
        if let Some(title) = line.strip_prefix("Scenario:") {
            return Line::Scenario {
                outline: false,
                title: title.trim(),
            };
        }
        if line.starts_with("Examples:") {
            return Line::Examples;
        }
        if let Some((word, rest)) = line.split_once(char::is_whitespace) {
            if let Ok(keyword) = word.parse::<StepKeyword>() {
                let text = rest.trim();
                if !text.is_empty() {
                    return Line::Step(keyword, text);
                }
            }
        }
        Line::Other(line)
    }

    /// Lines that end a description, background, or scenario body.
    fn starts_block(&self) -> bool {
        matches!(self, Line::Tags(_) | Line::Scenario { .. })
    }
}

#[derive(Debug, Default)]
struct RawScenario {
    title: String,
    outline: bool,
    tags: Vec<String>,
    steps: Vec<GherkinStep>,
    examples: Vec<ExamplesTable>,
    /// Half-open line range of the scenario block
    span: (usize, usize),
}

#[derive(Debug, Default)]
struct RawFeature {
    title: String,
    tags: Vec<String>,
    description: Vec<String>,
    background: Option<Vec<GherkinStep>>,
    scenarios: Vec<RawScenario>,
    diagnostics: Vec<ParseDiagnostic>,
    lines: Vec<String>,
}

struct FeatureScanner<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
    source_path: &'a str,
    options: ParseOptions,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'a> FeatureScanner<'a> {
    fn new(content: &'a str, source_path: &'a str, options: ParseOptions) -> Self {
        FeatureScanner {
            lines: content.lines().collect(),
            cursor: 0,
            source_path,
            options,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.cursor).map(|raw| Line::classify(raw))
    }

    fn skip(&mut self, text: &str) {
        if self.options.strict {
            self.diagnostics
                .push(ParseDiagnostic::skipped_line(self.cursor + 1, text));
        }
        tracing::trace!(
            "[gherkin] {}: skipping line {}: {:?}",
            self.source_path,
            self.cursor + 1,
            text
        );
        self.cursor += 1;
    }

    fn scan(mut self) -> Result<RawFeature, LamadError> {
        let mut feature = RawFeature::default();
        self.scan_header(&mut feature)?;
        self.scan_description(&mut feature);
        if let Some(Line::Background) = self.peek() {
            self.cursor += 1;
            feature.background = Some(self.scan_steps(None));
        }
        self.scan_scenarios(&mut feature);
        feature.diagnostics = self.diagnostics;
        feature.lines = self.lines.iter().map(|l| l.to_string()).collect();
        Ok(feature)
    }

    fn scan_header(&mut self, feature: &mut RawFeature) -> Result<(), LamadError> {
        while let Some(line) = self.peek() {
            match line {
                Line::Blank | Line::Comment => self.cursor += 1,
                Line::Tags(tags) => {
                    feature.tags.extend(tags);
                    self.cursor += 1;
                }
                Line::Feature(title) => {
                    feature.title = title.to_string();
                    self.cursor += 1;
                    return Ok(());
                }
                _ => {
                    return Err(LamadError::malformed_feature(
                        self.source_path,
                        format!(
                            "expected 'Feature:' at line {}, found {:?}",
                            self.cursor + 1,
                            self.lines[self.cursor].trim()
                        ),
                    ));
                }
            }
        }
        Err(LamadError::malformed_feature(
            self.source_path,
            "no 'Feature:' line found",
        ))
    }

    fn scan_description(&mut self, feature: &mut RawFeature) {
        while let Some(line) = self.peek() {
            match line {
                Line::Background => return,
                l if l.starts_block() => return,
                Line::Blank | Line::Comment => {}
                _ => feature
                    .description
                    .push(self.lines[self.cursor].trim().to_string()),
            }
            self.cursor += 1;
        }
    }

    /// Consume step lines until the next tag or scenario line. When `outline` is given,
    /// `Examples:` blocks are collected into it; otherwise they are skipped.
    fn scan_steps(
        &mut self,
        mut outline: Option<&mut Vec<ExamplesTable>>,
    ) -> Vec<GherkinStep> {
        let mut steps = Vec::new();
        while let Some(line) = self.peek() {
            if line.starts_block() {
                break;
            }
            match line {
                Line::Blank | Line::Comment => self.cursor += 1,
                Line::Step(keyword, text) => {
                    steps.push(GherkinStep::new(keyword, text));
                    self.cursor += 1;
                }
                Line::Examples if outline.is_some() => {
                    self.cursor += 1;
                    if let Some(table) = self.scan_examples() {
                        if let Some(examples) = outline.as_deref_mut() {
                            examples.push(table);
                        }
                    }
                }
                _ => {
                    let text = self.lines[self.cursor].to_string();
                    self.skip(&text);
                }
            }
        }
        steps
    }

    /// Header row, then data rows, ending at the first line that is neither a row nor blank.
    fn scan_examples(&mut self) -> Option<ExamplesTable> {
        let examples_line = self.cursor;
        let mut table: Option<ExamplesTable> = None;
        while let Some(line) = self.peek() {
            match line {
                Line::Blank | Line::Comment => {}
                Line::TableRow => {
                    let cells = split_table_row(self.lines[self.cursor]);
                    match table.as_mut() {
                        None => table = Some(ExamplesTable::new(cells)),
                        Some(t) => {
                            if !t.push_row(cells.clone()) {
                                self.diagnostics.push(ParseDiagnostic::warning(format!(
                                    "{}: dropped example row at line {} ({} cells, expected {})",
                                    self.source_path,
                                    self.cursor + 1,
                                    cells.len(),
                                    t.headers().len()
                                )));
                            }
                        }
                    }
                }
                _ => break,
            }
            self.cursor += 1;
        }
        if table.is_none() {
            self.diagnostics.push(ParseDiagnostic::warning(format!(
                "{}: 'Examples:' at line {} has no header row",
                self.source_path, examples_line
            )));
        }
        table
    }

    fn scan_scenarios(&mut self, feature: &mut RawFeature) {
        let mut pending_tags: Vec<String> = Vec::new();
        let mut pending_tags_line = 0;
        while let Some(line) = self.peek() {
            match line {
                Line::Blank | Line::Comment => self.cursor += 1,
                Line::Tags(tags) => {
                    if pending_tags.is_empty() {
                        pending_tags_line = self.cursor + 1;
                    }
                    pending_tags.extend(tags);
                    self.cursor += 1;
                }
                Line::Scenario { outline, title } => {
                    let start = self.cursor;
                    self.cursor += 1;
                    let mut examples = Vec::new();
                    let steps = if outline {
                        self.scan_steps(Some(&mut examples))
                    } else {
                        self.scan_steps(None)
                    };
                    feature.scenarios.push(RawScenario {
                        title: title.to_string(),
                        outline,
                        tags: std::mem::take(&mut pending_tags),
                        steps,
                        examples,
                        span: (start, self.cursor),
                    });
                }
                _ => {
                    // Tags only apply to a scenario on the next meaningful line.
                    if !pending_tags.is_empty() {
                        self.drop_tags(&mut pending_tags, pending_tags_line);
                    }
                    let text = self.lines[self.cursor].to_string();
                    self.skip(&text);
                }
            }
        }
        if !pending_tags.is_empty() {
            self.drop_tags(&mut pending_tags, pending_tags_line);
        }
    }

    fn drop_tags(&mut self, tags: &mut Vec<String>, line: usize) {
        tracing::debug!(
            "[gherkin] {}: dropping tags {:?} from line {line}",
            self.source_path,
            tags
        );
        if self.options.strict {
            self.diagnostics.push(ParseDiagnostic::info(format!(
                "{}: tags at line {} are not followed by a scenario",
                self.source_path, line
            )));
        }
        tags.clear();
    }
}

impl RawFeature {
    fn into_nodes(
        self,
        content: &str,
        source_path: &str,
        category: &str,
        ids: &mut IdAllocator,
    ) -> ParsedFeature {
        let feature_id = ids.generate(source_path, NodeType::Feature, None);
        let feature_epics = epic_ids_from_tags(&self.tags);
        let title = if self.title.is_empty() {
            UNTITLED_FEATURE.to_string()
        } else {
            self.title.clone()
        };

        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        for raw in self.scenarios {
            let id = ids.generate(source_path, NodeType::Scenario, Some(&raw.title));
            let epic_ids = epic_ids_from_tags(raw.tags.iter().chain(self.tags.iter()));
            let block = trimmed_block(&self.lines[raw.span.0..raw.span.1]);

            let mut base = NodeBase::new(id, source_path);
            base.title = raw.title.clone();
            base.description = raw.title;
            base.tags = raw.tags.into_iter().chain(self.tags.iter().cloned()).collect();
            base.push_related(feature_id.clone());
            for epic in epic_ids.iter() {
                base.push_related(epic.clone());
            }
            base.set_meta(META_CATEGORY, category);
            base.set_meta(META_FEATURE_ID, feature_id.clone());
            base.set_meta(META_CONTENT_HASH, content_hash(&block));
            base.content = block;

            scenarios.push(ScenarioNode {
                base,
                feature_id: feature_id.clone(),
                epic_ids,
                scenario_type: if raw.outline {
                    ScenarioType::ScenarioOutline
                } else {
                    ScenarioType::Scenario
                },
                steps: raw.steps,
                examples: if raw.examples.is_empty() {
                    None
                } else {
                    Some(raw.examples)
                },
            });
        }

        let scenario_ids: Vec<String> = scenarios.iter().map(|s| s.base.id.clone()).collect();
        let mut base = NodeBase::new(feature_id, source_path);
        base.description = if self.description.is_empty() {
            title.clone()
        } else {
            self.description
                .join(" ")
                .chars()
                .take(MAX_DESCRIPTION_CHARS)
                .collect()
        };
        base.title = title;
        base.tags = self.tags;
        base.content = content.to_string();
        for id in scenario_ids.iter().chain(feature_epics.iter()) {
            base.push_related(id.clone());
        }
        base.set_meta(META_CATEGORY, category);
        base.set_meta(META_SCENARIO_COUNT, scenario_ids.len());
        base.set_meta(META_CONTENT_HASH, content_hash(content));

        tracing::debug!(
            "[gherkin] {source_path}: feature '{}' with {} scenarios",
            base.title,
            scenario_ids.len()
        );

        ParsedFeature {
            feature: FeatureNode {
                base,
                category: category.to_string(),
                epic_ids: feature_epics,
                scenario_ids,
                feature_description: self.description.join("\n"),
                background: self.background,
                gherkin_content: content.to_string(),
            },
            scenarios,
            diagnostics: self.diagnostics,
        }
    }
}

fn trimmed_block(lines: &[String]) -> String {
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    lines[..end].join("\n")
}

/// [DocCodec] for `.feature` artifacts.
#[derive(Debug, Clone, Default)]
pub struct GherkinCodec;

impl DocCodec for GherkinCodec {
    fn parse(
        &self,
        artifact: &SourceArtifact,
        content: &str,
        ctx: &mut CodecContext<'_>,
    ) -> Result<CodecOutput, LamadError> {
        let parsed = parse_feature_with(
            content,
            &artifact.path,
            &artifact.category,
            ctx.ids,
            ctx.options,
        )?;
        let mut nodes = Vec::with_capacity(parsed.scenarios.len() + 1);
        nodes.push(parsed.feature.into());
        nodes.extend(parsed.scenarios.into_iter().map(Into::into));
        Ok(CodecOutput {
            nodes,
            diagnostics: parsed.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = "@epic:auth
Feature: Login
Users can log in.

Scenario: Valid credentials
  Given a registered user
  When they submit correct credentials
  Then they are logged in
";

    #[test]
    fn test_parse_login_feature() {
        let parsed = parse_feature(LOGIN, "auth/login.feature", "auth").unwrap();
        let feature = &parsed.feature;
        assert_eq!(feature.base.id, "feature_auth_login");
        assert_eq!(feature.base.title, "Login");
        assert_eq!(feature.base.description, "Users can log in.");
        assert_eq!(feature.epic_ids, vec!["auth"]);
        assert_eq!(feature.scenario_ids.len(), 1);
        assert_eq!(feature.category, "auth");
        assert!(feature.background.is_none());

        let scenario = &parsed.scenarios[0];
        assert_eq!(scenario.base.id, feature.scenario_ids[0]);
        assert_eq!(scenario.base.id, "scenario_auth_login_valid_credentials");
        assert_eq!(scenario.feature_id, feature.base.id);
        assert_eq!(scenario.scenario_type, ScenarioType::Scenario);
        assert_eq!(
            scenario.steps,
            vec![
                GherkinStep::new(StepKeyword::Given, "a registered user"),
                GherkinStep::new(StepKeyword::When, "they submit correct credentials"),
                GherkinStep::new(StepKeyword::Then, "they are logged in"),
            ]
        );
        assert_eq!(
            scenario.base.related_node_ids,
            vec!["feature_auth_login", "auth"]
        );
        assert_eq!(
            feature.base.related_node_ids,
            vec!["scenario_auth_login_valid_credentials", "auth"]
        );
    }

    #[test]
    fn test_gherkin_content_round_trips_byte_for_byte() {
        let with_crlf = LOGIN.replace('\n', "\r\n");
        for input in [LOGIN.to_string(), with_crlf] {
            let parsed = parse_feature(&input, "auth/login.feature", "auth").unwrap();
            assert_eq!(parsed.feature.gherkin_content, input);
            assert_eq!(parsed.feature.base.content, input);
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_feature(LOGIN, "auth/login.feature", "auth").unwrap();
        let second = parse_feature(LOGIN, "auth/login.feature", "auth").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_feature_line_is_malformed() {
        let err = parse_feature("Scenario: nope\n  Given x\n", "bad/nope.feature", "bad")
            .unwrap_err();
        assert_eq!(err.source_path(), Some("bad/nope.feature"));
        assert!(matches!(err, LamadError::MalformedFeatureFile { .. }));

        let empty = parse_feature("\n@tag\n\n", "bad/empty.feature", "bad").unwrap_err();
        assert!(matches!(empty, LamadError::MalformedFeatureFile { .. }));
    }

    #[test]
    fn test_zero_scenarios_is_legal() {
        let parsed = parse_feature(
            "# language: en\nFeature: Empty\n  Nothing yet.\n",
            "misc/empty.feature",
            "misc",
        )
        .unwrap();
        assert!(parsed.scenarios.is_empty());
        assert!(parsed.feature.scenario_ids.is_empty());
        assert_eq!(parsed.feature.feature_description, "Nothing yet.");
    }

    #[test]
    fn test_outline_drops_misaligned_rows() {
        let src = "Feature: Math
  Scenario Outline: Add
    Given <a> and <b>
    Examples:
      | a | b |
      | 1 | 2 |
      | x |
";
        let parsed = parse_feature(src, "math/add.feature", "math").unwrap();
        let scenario = &parsed.scenarios[0];
        assert_eq!(scenario.scenario_type, ScenarioType::ScenarioOutline);
        let examples = scenario.examples.as_ref().unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].headers(), &["a".to_string(), "b".to_string()]);
        assert_eq!(examples[0].rows(), &[vec!["1".to_string(), "2".to_string()]]);
        assert_eq!(
            parsed.diagnostics.iter().filter(|d| d.is_warning()).count(),
            1
        );
    }

    #[test]
    fn test_outline_without_examples_and_multiple_tables() {
        let src = "Feature: Tables
  Scenario Outline: No examples
    Given <x>

  Scenario Outline: Two tables
    Given <x>
    Examples:
      | x |
      | 1 |
    Examples:
      | x |
      | 2 |
      | 3 |
";
        let parsed = parse_feature(src, "t/tables.feature", "t").unwrap();
        assert_eq!(parsed.scenarios.len(), 2);
        assert!(parsed.scenarios[0].examples.is_none());
        let tables = parsed.scenarios[1].examples.as_ref().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].rows().len(), 2);
    }

    #[test]
    fn test_background_tags_and_epic_union() {
        let src = "@epic:auth @smoke
Feature: Sessions

  Background:
    Given a clean database
    this line is noise
    And a registered user

  @epic:security @slow
  Scenario: Expiry
    Given an old session
    Then it expires

  Scenario: Renewal
    Given a fresh session
";
        let parsed = parse_feature(src, "auth/sessions.feature", "auth").unwrap();
        let background = parsed.feature.background.as_ref().unwrap();
        assert_eq!(background.len(), 2);
        assert_eq!(background[1].keyword, StepKeyword::And);

        let expiry = &parsed.scenarios[0];
        assert_eq!(expiry.epic_ids, vec!["security", "auth"]);
        assert_eq!(expiry.base.tags, vec!["epic:security", "slow", "epic:auth", "smoke"]);
        let renewal = &parsed.scenarios[1];
        assert_eq!(renewal.epic_ids, vec!["auth"]);
        assert_eq!(renewal.base.tags, vec!["epic:auth", "smoke"]);
        assert_eq!(
            renewal.base.content,
            "  Scenario: Renewal\n    Given a fresh session"
        );
    }

    #[test]
    fn test_strict_mode_reports_skipped_lines() {
        let src = "Feature: Noisy
  random preamble
  Background:
    Given something
    not a step
  stray text before scenario
  Scenario: One
    Given a step
    | a | table |
";
        let lenient = parse_feature(src, "n/noisy.feature", "n").unwrap();
        assert!(lenient.diagnostics.is_empty());

        let mut ids = IdAllocator::new();
        let strict =
            parse_feature_with(src, "n/noisy.feature", "n", &mut ids, ParseOptions::strict())
                .unwrap();
        let skipped: Vec<usize> = strict
            .diagnostics
            .iter()
            .filter_map(|d| match d {
                ParseDiagnostic::SkippedLine { line, .. } => Some(*line),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, vec![5, 6, 9]);
        assert_eq!(lenient.scenarios, strict.scenarios);
        assert_eq!(strict.feature.base.description, "random preamble");
    }

    #[test]
    fn test_duplicate_scenario_titles_are_disambiguated() {
        let src = "Feature: Dups
  Scenario: Same
    Given a
  Scenario: Same
    Given b
";
        let parsed = parse_feature(src, "d/dups.feature", "d").unwrap();
        assert_eq!(
            parsed.feature.scenario_ids,
            vec!["scenario_d_dups_same", "scenario_d_dups_same_2"]
        );
    }

    #[test]
    fn test_steps_keep_source_order_and_known_keywords() {
        let src = "Feature: Order
  Scenario: Many
    Given one
    And two
    When three
    But four
    Then five
    Given
";
        let parsed = parse_feature(src, "o/order.feature", "o").unwrap();
        let steps = &parsed.scenarios[0].steps;
        let texts: Vec<&str> = steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three", "four", "five"]);
        assert!(steps.iter().all(|s| StepKeyword::ALL.contains(&s.keyword)));
    }

    #[test]
    fn test_tags_before_a_skipped_line_are_dropped() {
        let src = "Feature: Billing

@epic:billing
This line is not a scenario

Scenario: Charge
  Given a card

@slow
# comment lines keep tags pending

Scenario: Refund
  Given a charge
";
        let parsed = parse_feature(src, "auth/billing.feature", "auth").unwrap();
        let charge = &parsed.scenarios[0];
        assert!(charge.base.tags.is_empty());
        assert!(charge.epic_ids.is_empty());
        assert_eq!(charge.base.related_node_ids, vec!["feature_auth_billing"]);
        assert_eq!(parsed.scenarios[1].base.tags, vec!["slow"]);

        let mut ids = IdAllocator::new();
        let strict = parse_feature_with(
            src,
            "auth/billing.feature",
            "auth",
            &mut ids,
            ParseOptions::strict(),
        )
        .unwrap();
        assert!(strict.scenarios[0].base.tags.is_empty());
        assert!(strict
            .diagnostics
            .iter()
            .any(|d| matches!(d, ParseDiagnostic::Info(m) if m.contains("line 3"))));
        assert!(strict
            .diagnostics
            .iter()
            .any(|d| matches!(d, ParseDiagnostic::SkippedLine { line: 4, .. })));
    }

    #[test]
    fn test_feature_description_is_capped() {
        let long = "word ".repeat(200);
        let src = format!("Feature: Long\n  {long}\n  Scenario: One\n    Given a step\n");
        let parsed = parse_feature(&src, "l/long.feature", "l").unwrap();
        assert_eq!(
            parsed.feature.base.description.chars().count(),
            MAX_DESCRIPTION_CHARS
        );
        assert_eq!(parsed.feature.gherkin_content, src);
    }

    #[test]
    fn test_split_table_row() {
        assert_eq!(split_table_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_table_row("  |a|| c  |  "), vec!["a", "", "c"]);
        assert_eq!(split_table_row("| a \\| b |"), vec!["a \\", "b"]);
    }
}
