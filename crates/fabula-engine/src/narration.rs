//! The narration returned to the host for each resolved entry point.

use fabula_core::SideEffectRequest;

/// What one command or turn produced: text for the player plus the
/// side-effect requests the host must apply.
///
/// `ShowMessage` effects are folded into `lines`; everything else
/// (sounds, conversation, map refresh, save/load requests) is surfaced
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Narration {
    /// Text lines, in order.
    pub lines: Vec<String>,
    /// Non-message side effects for the host.
    pub effects: Vec<SideEffectRequest>,
}

impl Narration {
    /// An empty narration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A narration holding one line.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            effects: Vec::new(),
        }
    }

    /// Append a line.
    pub fn push(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Fold a side effect in: messages become lines, the rest is kept
    /// for the host.
    pub fn absorb(&mut self, effect: SideEffectRequest) {
        match effect {
            SideEffectRequest::ShowMessage { text } => self.lines.push(text),
            other => self.effects.push(other),
        }
    }

    /// Append everything from another narration.
    pub fn merge(&mut self, other: Self) {
        self.lines.extend(other.lines);
        self.effects.extend(other.effects);
    }

    /// Whether nothing was narrated or requested.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.effects.is_empty()
    }

    /// All lines joined with newlines, for simple hosts.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_splits_messages_from_requests() {
        let mut n = Narration::new();
        n.absorb(SideEffectRequest::ShowMessage {
            text: "hello".to_string(),
        });
        n.absorb(SideEffectRequest::PlaySound {
            cue: "thunder".to_string(),
        });
        assert_eq!(n.lines, vec!["hello".to_string()]);
        assert_eq!(
            n.effects,
            vec![SideEffectRequest::PlaySound {
                cue: "thunder".to_string()
            }]
        );
    }

    #[test]
    fn text_joins_lines() {
        let mut n = Narration::line("one");
        n.push("two");
        assert_eq!(n.text(), "one\ntwo");
    }
}
