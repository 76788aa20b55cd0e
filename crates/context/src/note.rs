//! Author's-note injection.
//!
//! The note is rendered and counted early so its cost can be charged
//! alongside the input, but it is spliced only after the input message is
//! in the sequence. `InChat` depth therefore counts back from the input.

use loreweave_core::document::{AnchorPosition, AuthorsNote};
use loreweave_core::message::Message;
use loreweave_core::{CollaboratorError, TemplateRenderer, TokenCounter, Variables};

use crate::position;
use crate::token;

/// A note rendered and counted, waiting to be spliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    pub message: Message,
    pub tokens: usize,
    pub position: AnchorPosition,
    pub depth: usize,
}

/// Render and count `note`. Returns `None` for an empty note.
pub async fn prepare(
    note: &AuthorsNote,
    variables: &Variables,
    counter: &dyn TokenCounter,
    renderer: &dyn TemplateRenderer,
) -> Result<Option<RenderedNote>, CollaboratorError> {
    if note.content.is_empty() {
        return Ok(None);
    }
    let text = renderer.render(&note.content, variables).await?;
    let message = Message::system(text);
    let tokens = token::message_tokens(counter, &message).await?;
    Ok(Some(RenderedNote {
        message,
        tokens,
        position: note.insert_position,
        depth: note.insert_depth,
    }))
}

/// Splice a prepared note into `sequence` and return the tokens it carries.
///
/// The cost was charged when the note was prepared, so nothing is charged here.
pub fn inject(note: RenderedNote, sequence: &mut Vec<Message>, system_block_len: usize) -> usize {
    let resolved = position::resolve(sequence, note.position, system_block_len);
    let index = match note.position {
        AnchorPosition::InChat => resolved.saturating_sub(note.depth),
        _ => resolved,
    };
    sequence.insert(index.min(sequence.len()), note.message);
    note.tokens
}
