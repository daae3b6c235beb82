//! Renders the small subset of Markdown that the model is asked to use.
//!
//! Supported: `#` to `###` headings, `-`/`*` and numbered list items,
//! `**bold**` and blank-line separated paragraphs. Everything else is shown
//! as text. All text is escaped by maud.

use maud::{Markup, html};

#[derive(Debug, PartialEq)]
enum Block<'a> {
    Heading(u8, &'a str),
    List { ordered: bool, items: Vec<&'a str> },
    Paragraph(Vec<&'a str>),
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    let text = line[level..].strip_prefix(' ')?;

    (1..=6)
        .contains(&level)
        .then(|| ((level as u8).min(3), text.trim()))
}

fn unordered_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .map(str::trim)
}

fn ordered_item(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    line[digits..].strip_prefix(". ").map(str::trim)
}

fn parse_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            blocks.push(Block::Paragraph(Vec::new()));
            continue;
        }

        if let Some((level, text)) = heading(line) {
            blocks.push(Block::Heading(level, text));
            continue;
        }

        let item = unordered_item(line)
            .map(|item| (false, item))
            .or_else(|| ordered_item(line).map(|item| (true, item)));

        if let Some((ordered, item)) = item {
            match blocks.last_mut() {
                Some(Block::List {
                    ordered: current,
                    items,
                }) if *current == ordered => items.push(item),
                _ => blocks.push(Block::List {
                    ordered,
                    items: vec![item],
                }),
            }
            continue;
        }

        if let Some(Block::Paragraph(lines)) = blocks.last_mut() {
            lines.push(line);
        } else {
            blocks.push(Block::Paragraph(vec![line]));
        }
    }

    blocks.retain(|block| !matches!(block, Block::Paragraph(lines) if lines.is_empty()));
    blocks
}

/// Render `**bold**` spans. An unmatched `**` is kept as text.
fn inline(text: &str) -> Markup {
    let parts: Vec<&str> = text.split("**").collect();
    let last = parts.len() - 1;
    let balanced = parts.len() % 2 == 1;

    html! {
        @for (index, part) in parts.iter().enumerate() {
            @if index % 2 == 1 && (balanced || index < last) {
                strong { (part) }
            } @else {
                @if index % 2 == 1 { "**" }
                (part)
            }
        }
    }
}

/// Render the model's reply as HTML.
pub fn render_reply(text: &str) -> Markup {
    html! {
        @for block in parse_blocks(text) {
            @match block {
                Block::Heading(1, text) => {
                    h3 class="mt-2 text-lg font-bold" { (inline(text)) }
                }
                Block::Heading(2, text) => {
                    h4 class="mt-2 text-base font-bold" { (inline(text)) }
                }
                Block::Heading(_, text) => {
                    h5 class="mt-2 text-sm font-bold" { (inline(text)) }
                }
                Block::List { ordered: true, items } => {
                    ol class="ml-5 list-decimal" {
                        @for item in items { li { (inline(item)) } }
                    }
                }
                Block::List { ordered: false, items } => {
                    ul class="ml-5 list-disc" {
                        @for item in items { li { (inline(item)) } }
                    }
                }
                Block::Paragraph(lines) => {
                    p class="my-1" {
                        @for (index, line) in lines.iter().enumerate() {
                            @if index > 0 { br; }
                            (inline(line))
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::chat::markup::{Block, parse_blocks, render_reply};

    #[test]
    fn parses_headings_lists_and_paragraphs() {
        let text = "## Summary\n\nThere are **12** leads.\nMost from Google.\n\n- google: 8\n- meta: 4\n1. first\n2. second";

        assert_eq!(
            parse_blocks(text),
            vec![
                Block::Heading(2, "Summary"),
                Block::Paragraph(vec!["There are **12** leads.", "Most from Google."]),
                Block::List {
                    ordered: false,
                    items: vec!["google: 8", "meta: 4"]
                },
                Block::List {
                    ordered: true,
                    items: vec!["first", "second"]
                },
            ]
        );
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        assert_eq!(
            parse_blocks("#hashtag"),
            vec![Block::Paragraph(vec!["#hashtag"])]
        );
    }

    #[test]
    fn renders_bold_and_escapes_html() {
        let got = render_reply("**Top** source is <script>alert(1)</script>").into_string();

        assert_eq!(
            got,
            "<p class=\"my-1\"><strong>Top</strong> source is &lt;script&gt;alert(1)&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn unmatched_bold_marker_is_kept() {
        let got = render_reply("5 ** 2").into_string();

        assert_eq!(got, "<p class=\"my-1\">5 ** 2</p>");
    }

    #[test]
    fn deep_headings_render_as_smallest_heading() {
        let got = render_reply("#### Detail").into_string();

        assert_eq!(got, "<h5 class=\"mt-2 text-sm font-bold\">Detail</h5>");
    }
}
