//! HTML to Markdown rendering
//!
//! Rendering is delegated to `htmd`, configured from [`MarkdownOptions`].
//! Emphasis and strikethrough get their own handlers so the delimiter is
//! configurable. Output always passes through [`normalize_markdown`].

use htmd::options::{BulletListMarker, CodeBlockFence, Options};
use htmd::{Element, HtmlToMarkdown};
use serde::Deserialize;

/// Heading syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// `# Title`
    #[default]
    Atx,
    /// Underlined `h1`/`h2`; deeper levels fall back to ATX
    Setext,
}

/// Code block syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    #[default]
    Fenced,
    Indented,
}

/// Markdown output options
///
/// Only the fence character is significant; fences are always three long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub heading_style: HeadingStyle,
    pub bullet: char,
    pub code_block_style: CodeBlockStyle,
    pub fence: String,
    pub em_delimiter: char,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            bullet: '-',
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: '_',
        }
    }
}

impl MarkdownOptions {
    fn htmd_options(&self) -> Options {
        Options {
            heading_style: match self.heading_style {
                HeadingStyle::Atx => htmd::options::HeadingStyle::Atx,
                HeadingStyle::Setext => htmd::options::HeadingStyle::Setex,
            },
            bullet_list_marker: match self.bullet {
                '*' => BulletListMarker::Asterisk,
                _ => BulletListMarker::Dash,
            },
            code_block_style: match self.code_block_style {
                CodeBlockStyle::Fenced => htmd::options::CodeBlockStyle::Fenced,
                CodeBlockStyle::Indented => htmd::options::CodeBlockStyle::Indented,
            },
            code_block_fence: if self.fence.starts_with('~') {
                CodeBlockFence::Tildes
            } else {
                CodeBlockFence::Backticks
            },
            ..Options::default()
        }
    }
}

/// Renders HTML fragments as Markdown
pub struct MarkdownRenderer {
    converter: HtmlToMarkdown,
}

impl MarkdownRenderer {
    pub fn new(options: &MarkdownOptions) -> Self {
        let em = options.em_delimiter.to_string();
        let converter = HtmlToMarkdown::builder()
            .options(options.htmd_options())
            .skip_tags(vec!["head", "script", "style", "template", "noscript"])
            .add_handler(vec!["em", "i"], move |element: Element| {
                Some(wrap_inline(element.content, &em))
            })
            .add_handler(vec!["del", "s", "strike"], |element: Element| {
                Some(wrap_inline(element.content, "~~"))
            })
            .build();

        Self { converter }
    }

    /// Renders one HTML string to normalized Markdown
    ///
    /// A conversion failure renders as empty output.
    pub fn render(&self, html: &str) -> String {
        match self.converter.convert(html) {
            Ok(markdown) => normalize_markdown(&markdown),
            Err(e) => {
                tracing::debug!("Markdown conversion failed: {}", e);
                String::new()
            }
        }
    }

    /// Renders several fragments in order, separated by blank lines
    pub fn render_all<S: AsRef<str>>(&self, fragments: impl IntoIterator<Item = S>) -> String {
        let joined = fragments
            .into_iter()
            .map(|fragment| self.render(fragment.as_ref()))
            .filter(|markdown| !markdown.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        normalize_markdown(&joined)
    }
}

/// Wraps inline content in a delimiter, keeping surrounding whitespace outside it
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let inner = content.trim();
    if inner.is_empty() {
        return content.to_string();
    }

    let leading = &content[..content.len() - content.trim_start().len()];
    let trailing = &content[content.trim_end().len()..];
    format!("{}{}{}{}{}", leading, delimiter, inner, delimiter, trailing)
}

/// Trims a rendered block
///
/// Leading whitespace that follows a line break is kept so an indented code
/// block at the start of the block survives.
fn trim_block(content: &str) -> &str {
    let end = content.trim_end();
    let text_start = end.len() - end.trim_start().len();
    let start = match end[..text_start].rfind('\n') {
        Some(newline) => newline + 1,
        None => text_start,
    };
    &end[start..]
}

/// Opening fence on an already left-trimmed line: fence char and run length
fn fence_open(line: &str) -> Option<(char, usize)> {
    let first = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = line.chars().take_while(|c| *c == first).count();
    (run >= 3).then_some((first, run))
}

fn closes_fence(line: &str, fence: (char, usize)) -> bool {
    let (fence_char, length) = fence;
    let run = line.chars().take_while(|c| *c == fence_char).count();
    run >= length && line[run * fence_char.len_utf8()..].trim().is_empty()
}

/// Normalizes rendered Markdown
///
/// Outside code fences, whitespace-only lines count as blank and runs of
/// blank lines collapse to one. Fenced content is copied verbatim. The
/// result is trimmed and ends with a single newline unless empty.
pub fn normalize_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<(char, usize)> = None;
    let mut previous_blank = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            out.push_str(line);
            out.push('\n');
            if closes_fence(trimmed, open) {
                fence = None;
            }
            continue;
        }

        if let Some(open) = fence_open(trimmed) {
            fence = Some(open);
            previous_blank = false;
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if trimmed.is_empty() {
            if !previous_blank {
                out.push('\n');
            }
            previous_blank = true;
            continue;
        }

        previous_blank = false;
        out.push_str(line);
        out.push('\n');
    }

    let trimmed = trim_block(&out);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}
