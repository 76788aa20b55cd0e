//! Anchor resolution: maps an [`AnchorPosition`] to an insertion index.
//!
//! Resolution is a pure lookup over the tags currently present in the
//! sequence. Fallback chain per position:
//!
//! | Position | Resolves to |
//! |----------|-------------|
//! | `InChat` | `len - 1` |
//! | `BeforeCharDefs` | description/personality, else `1` |
//! | `AfterCharDefs` | after scenario, else after description/personality, else `block + 1` |
//! | `BeforeExampleMessages` | first example, else first greeting, else `AfterCharDefs` |
//! | `AfterExampleMessages` | after last example, else `block - 1` |
//! | `Default` | `1` |
//!
//! `block` is the length of the rendered persona block. Every result is
//! clamped to `0..=len`, so a malformed sequence can never yield an
//! out-of-range splice.

use loreweave_core::document::AnchorPosition;
use loreweave_core::message::{AnchorTag, Message};

/// Index of the first message carrying `tag`.
pub fn find_tag(sequence: &[Message], tag: AnchorTag) -> Option<usize> {
    sequence.iter().position(|m| m.has_tag(tag))
}

/// Resolve `position` against `sequence`.
pub fn resolve(sequence: &[Message], position: AnchorPosition, system_block_len: usize) -> usize {
    let index = match position {
        AnchorPosition::InChat => sequence.len().saturating_sub(1),
        AnchorPosition::BeforeCharDefs => before_char_defs(sequence),
        AnchorPosition::AfterCharDefs => after_char_defs(sequence, system_block_len),
        AnchorPosition::BeforeExampleMessages => find_tag(sequence, AnchorTag::ExampleFirst)
            .or_else(|| find_tag(sequence, AnchorTag::FirstMessage))
            .unwrap_or_else(|| after_char_defs(sequence, system_block_len)),
        AnchorPosition::AfterExampleMessages => find_tag(sequence, AnchorTag::ExampleLast)
            .map(|i| i + 1)
            .unwrap_or_else(|| system_block_len.saturating_sub(1)),
        AnchorPosition::Default => 1,
    };
    index.min(sequence.len())
}

fn before_char_defs(sequence: &[Message]) -> usize {
    let description = find_tag(sequence, AnchorTag::Description);
    let personality = find_tag(sequence, AnchorTag::Personality);
    match (description, personality) {
        (Some(d), Some(p)) => d.min(p),
        (Some(i), None) | (None, Some(i)) => i,
        (None, None) => 1,
    }
}

fn after_char_defs(sequence: &[Message], system_block_len: usize) -> usize {
    if let Some(scenario) = find_tag(sequence, AnchorTag::Scenario) {
        return scenario + 1;
    }
    let description = find_tag(sequence, AnchorTag::Description);
    let personality = find_tag(sequence, AnchorTag::Personality);
    match (description, personality) {
        (Some(d), Some(p)) => d.max(p) + 1,
        (Some(i), None) | (None, Some(i)) => i + 1,
        (None, None) => system_block_len + 1,
    }
}
