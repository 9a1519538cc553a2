//! History repair
//!
//! Model APIs reject a tool result that does not directly follow the
//! assistant turn that asked for it. Truncation and cancelled turns can leave
//! such orphans behind, so every history is passed through [`sanitize`]
//! before it reaches a model.
//!
//! The rule is positional: a tool message survives only when the message kept
//! right before it is an assistant message with a non-empty `tool_calls`
//! list. Ids are not correlated.

use super::message::{Message, Role};

/// Drop every tool message that is not directly preceded by a tool-requesting
/// assistant message. Everything else is kept in order.
///
/// Pure and idempotent: `sanitize(&sanitize(h)) == sanitize(h)`.
pub fn sanitize(raw: &[Message]) -> Vec<Message> {
    let mut clean: Vec<Message> = Vec::with_capacity(raw.len());

    for message in raw {
        if message.role == Role::Tool {
            let anchored = clean.last().map(Message::requests_tools).unwrap_or(false);
            if !anchored {
                continue;
            }
        }
        clean.push(message.clone());
    }

    clean
}
