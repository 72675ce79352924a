// src/wiki/wikitext.rs
//! Just enough wikitext parsing for the card and set templates.
//!
//! This is not a general wikitext engine. The importers need three
//! things: find a template by name, read its named arguments, and strip
//! inline markup from argument values. Template bodies nest (`{{...}}`
//! inside values) and links carry pipes (`[[target|display]]`), so the
//! splitter tracks brace and bracket depth instead of splitting blindly.

use lazy_static::lazy_static;
use regex::Regex;

/// One `{{...}}` template occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    args: Vec<TemplateArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TemplateArg {
    name: Option<String>,
    value: String,
}

impl Template {
    /// The value of a named argument, raw (caller trims/strips).
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.name.as_deref().map(str::trim) == Some(name))
            .map(|a| a.value.as_str())
    }

    /// The trimmed value of a named argument, `None` when absent or
    /// blank.
    pub fn arg_trimmed(&self, name: &str) -> Option<&str> {
        self.arg(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Positional argument by index (0-based).
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.args
            .iter()
            .filter(|a| a.name.is_none())
            .nth(index)
            .map(|a| a.value.as_str())
    }

    /// Named arguments as (name, value) pairs, in order.
    pub fn named_args(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args
            .iter()
            .filter_map(|a| a.name.as_deref().map(|n| (n.trim(), a.value.as_str())))
    }
}

/// Collects every template in the text, outermost first, including
/// templates nested inside other templates' arguments.
pub fn parse_templates(text: &str) -> Vec<Template> {
    let mut templates = Vec::new();
    for (start, end) in template_spans(text) {
        let body = &text[start + 2..end - 2];
        templates.push(parse_template_body(body));
        // Nested templates live inside the body with the outer braces
        // already stripped, so a recursive scan finds exactly them.
        templates.extend(parse_templates(body));
    }
    templates
}

/// Finds the first template with the given name, case-insensitively.
pub fn find_template<'a>(templates: &'a [Template], name: &str) -> Option<&'a Template> {
    templates
        .iter()
        .find(|t| t.name.trim().eq_ignore_ascii_case(name))
}

/// Byte spans of the outermost `{{...}}` occurrences.
fn template_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if &bytes[i..i + 2] != b"{{" {
            i += 1;
            continue;
        }
        let mut depth = 1usize;
        let mut j = i + 2;
        while j + 2 <= bytes.len() {
            if &bytes[j..j + 2] == b"{{" {
                depth += 1;
                j += 2;
            } else if &bytes[j..j + 2] == b"}}" {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    break;
                }
            } else {
                j += 1;
            }
        }
        if depth == 0 {
            spans.push((i, j));
            i = j;
        } else {
            // Unclosed template; stop scanning.
            break;
        }
    }
    spans
}

fn parse_template_body(body: &str) -> Template {
    let parts = split_top_level(body, '|');
    let name = parts.first().map(|p| p.trim().to_string()).unwrap_or_default();
    let args = parts[1..]
        .iter()
        .map(|part| match top_level_eq(part) {
            Some(eq) => TemplateArg {
                name: Some(part[..eq].to_string()),
                value: part[eq + 1..].to_string(),
            },
            None => TemplateArg {
                name: None,
                value: part.to_string(),
            },
        })
        .collect();
    Template { name, args }
}

/// Splits on a separator at brace/bracket depth zero.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut brace_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if i + 1 < bytes.len() {
            match &bytes[i..i + 2] {
                b"{{" => {
                    brace_depth += 1;
                    i += 2;
                    continue;
                }
                b"}}" => {
                    brace_depth = brace_depth.saturating_sub(1);
                    i += 2;
                    continue;
                }
                b"[[" => {
                    bracket_depth += 1;
                    i += 2;
                    continue;
                }
                b"]]" => {
                    bracket_depth = bracket_depth.saturating_sub(1);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        if bytes[i] == separator as u8 && brace_depth == 0 && bracket_depth == 0 {
            parts.push(&text[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Position of the first `=` at depth zero, if any.
fn top_level_eq(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut brace_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if i + 1 < bytes.len() {
            match &bytes[i..i + 2] {
                b"{{" => {
                    brace_depth += 1;
                    i += 2;
                    continue;
                }
                b"}}" => {
                    brace_depth = brace_depth.saturating_sub(1);
                    i += 2;
                    continue;
                }
                b"[[" => {
                    bracket_depth += 1;
                    i += 2;
                    continue;
                }
                b"]]" => {
                    bracket_depth = bracket_depth.saturating_sub(1);
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        if bytes[i] == b'=' && brace_depth == 0 && bracket_depth == 0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

lazy_static! {
    static ref RUBY: Regex =
        Regex::new(r"\{\{[Rr]uby\|([^\|]*)\|(?:[^\}]*)?\}\}").expect("ruby regex");
    static ref HTML_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("comment regex");
    static ref BREAK_TAG: Regex = Regex::new(r"(?i)<br\s*/?>").expect("br regex");
    static ref WIKILINK: Regex =
        Regex::new(r"\[\[(?:[^\[\]\|]*\|)?([^\[\]\|]*)\]\]").expect("link regex");
    static ref INNER_TEMPLATE: Regex = Regex::new(r"\{\{[^\{\}]*\}\}").expect("template regex");
}

/// Strips inline wiki markup from a text value: ruby annotations keep
/// their base text, links keep their display text, remaining templates
/// and HTML comments vanish, quote markers drop, break tags become
/// newlines.
pub fn strip_markup(text: &str) -> String {
    let mut result = RUBY.replace_all(text, "$1").into_owned();
    result = HTML_COMMENT.replace_all(&result, "").into_owned();
    result = BREAK_TAG.replace_all(&result, "\n").into_owned();
    result = WIKILINK.replace_all(&result, "$1").into_owned();
    // Templates nest; peel innermost until none remain.
    loop {
        let next = INNER_TEMPLATE.replace_all(&result, "").into_owned();
        if next == result {
            break;
        }
        result = next;
    }
    result = result.replace("'''", "").replace("''", "");
    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = concat!(
        "Intro text\n",
        "{{CardTable2\n",
        "| name = Dark Magician\n",
        "| ja_name = {{Ruby|ブラック・マジシャン|Burakku Majishan}}\n",
        "| card_type = Monster\n",
        "| types = Spellcaster / Normal\n",
        "| lore = ''The ultimate wizard'' in terms of [[attack]] and [[defense|defence]].\n",
        "| atk = 2500\n",
        "| def = 2100\n",
        "| password = 46986414\n",
        "}}\n",
        "{{Unofficial name|English}}\n",
    );

    #[test]
    fn finds_template_by_name_case_insensitively() {
        let templates = parse_templates(CARD);
        assert!(find_template(&templates, "cardtable2").is_some());
        assert!(find_template(&templates, "Unofficial name").is_some());
        assert!(find_template(&templates, "SetTable").is_none());
    }

    #[test]
    fn reads_named_arguments() {
        let templates = parse_templates(CARD);
        let table = find_template(&templates, "cardtable2").unwrap();
        assert_eq!(table.arg_trimmed("name"), Some("Dark Magician"));
        assert_eq!(table.arg_trimmed("atk"), Some("2500"));
        assert_eq!(table.arg_trimmed("missing"), None);
    }

    #[test]
    fn nested_template_in_value_does_not_split_args() {
        let templates = parse_templates(CARD);
        let table = find_template(&templates, "cardtable2").unwrap();
        let ja_name = table.arg_trimmed("ja_name").unwrap();
        assert!(ja_name.starts_with("{{Ruby|"));
        assert_eq!(strip_markup(ja_name), "ブラック・マジシャン");
    }

    #[test]
    fn pipe_inside_link_does_not_split_args() {
        let templates = parse_templates("{{T|a=[[x|y]] z|b=2}}");
        let t = find_template(&templates, "T").unwrap();
        assert_eq!(t.arg_trimmed("a"), Some("[[x|y]] z"));
        assert_eq!(t.arg_trimmed("b"), Some("2"));
    }

    #[test]
    fn strip_markup_resolves_links_and_quotes() {
        let templates = parse_templates(CARD);
        let table = find_template(&templates, "cardtable2").unwrap();
        assert_eq!(
            strip_markup(table.arg("lore").unwrap()),
            "The ultimate wizard in terms of attack and defence."
        );
    }

    #[test]
    fn strip_markup_drops_comments_and_breaks() {
        assert_eq!(
            strip_markup("first<!-- hidden -->\u{20}line<br/>second line"),
            "first line\nsecond line"
        );
    }

    #[test]
    fn positional_arguments() {
        let templates = parse_templates("{{Unofficial name|English}}");
        let t = find_template(&templates, "Unofficial name").unwrap();
        assert_eq!(t.positional(0), Some("English"));
    }

    #[test]
    fn unclosed_template_is_ignored() {
        assert!(parse_templates("{{Broken|name=x").is_empty());
    }
}
