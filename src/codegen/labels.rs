//! Jump label allocation

use std::fmt;

/// What a label marks; selects the mnemonic prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    IfFalse,
    IfEnd,
    WhileStart,
    WhileEnd,
    ForStart,
    ForEnd,
}

impl LabelKind {
    pub fn prefix(self) -> &'static str {
        match self {
            LabelKind::IfFalse => "ifFalse",
            LabelKind::IfEnd => "ifEnd",
            LabelKind::WhileStart => "whileStart",
            LabelKind::WhileEnd => "whileEnd",
            LabelKind::ForStart => "forStart",
            LabelKind::ForEnd => "forEnd",
        }
    }
}

/// A jump target, unique within one compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    kind: LabelKind,
    id: u32,
}

impl Label {
    pub fn kind(&self) -> LabelKind {
        self.kind
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.id)
    }
}

/// Hands out labels from a single counter shared by all prefixes, so
/// `ifFalse1` and `whileStart1` can never both exist.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    counter: u32,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh label
    pub fn next(&mut self, kind: LabelKind) -> Label {
        self.counter += 1;
        Label {
            kind,
            id: self.counter,
        }
    }

    /// Number of labels handed out so far
    pub fn count(&self) -> u32 {
        self.counter
    }
}
