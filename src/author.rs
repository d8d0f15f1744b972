//! Personal-name extraction from free text and text blocks.

use crate::model::{PersonName, TextBlock};
use crate::text::{self, Patterns};

/// Person names found in a text, in order of appearance.
///
/// Parenthesized spans are ignored. Returns `None` when nothing shaped like
/// a name occurs at all.
pub fn extract(text: &str, patterns: &Patterns) -> Option<Vec<String>> {
    let text = text::remove_parenthesis(text);
    let names = text::find_names(&text);
    if names.is_empty() {
        return None;
    }

    let joined = names.join(", ");
    let mut authors: Vec<String> = Vec::new();
    for name in patterns.split_on_binding_words(&joined) {
        let name = name.trim();
        if name.is_empty() || text::has_double_capital(name) {
            continue;
        }
        if !authors.iter().any(|a| a == name) {
            authors.push(name.to_string());
        }
    }
    Some(authors)
}

/// Whether the whole block, minus punctuation and binding words, is a
/// sequence of names.
pub fn is_name_block(text: &str, patterns: &Patterns) -> bool {
    let text = text::remove_parenthesis(text);
    let text = patterns.strip_special_chars_and_binding_words(&text);
    if text.is_empty() {
        return false;
    }
    let covered: usize = text::find_names(&text).iter().map(|n| n.len()).sum();
    covered == text.len()
}

/// Split a full name: the last token is the last name.
pub fn split_name(full: &str) -> Option<PersonName> {
    let mut tokens: Vec<&str> = full.split_whitespace().collect();
    let lastname = tokens.pop()?;
    Some(PersonName::new(tokens.join(" "), lastname))
}

/// Spaced-out capitals such as `R A P P O R T`.
pub fn is_all_caps_spaced(text: &str) -> bool {
    text.split_whitespace().all(|token| {
        let mut chars = token.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
    })
}

/// Whether the name occurs in the title, ignoring punctuation and case.
pub fn name_in_title(title: &str, name: &str) -> bool {
    let title = text::substitute_non_alphanumeric(title).to_lowercase();
    let name = text::substitute_non_alphanumeric(name).to_lowercase();
    title.contains(&name)
}

/// Texts of the name blocks of a page without photo credits, joined by `", "`.
pub fn concat_name_blocks(blocks: &[TextBlock], patterns: &Patterns) -> String {
    blocks
        .iter()
        .filter(|b| is_name_block(&b.text, patterns) && !patterns.has_photo_label(&b.text))
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
