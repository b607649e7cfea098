//! Consumable rights as persisted per license.

/// A consumable right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RightKind {
    /// Pages printed.
    Print,
    /// Characters copied to the clipboard.
    Copy,
}

impl RightKind {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Print => "print_remaining",
            Self::Copy => "copy_remaining",
        }
    }
}

impl std::fmt::Display for RightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Print => f.write_str("print"),
            Self::Copy => f.write_str("copy"),
        }
    }
}

/// Remaining rights for one license. `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RightsState {
    pub license_id: String,
    pub print_remaining: Option<u32>,
    pub copy_remaining: Option<u32>,
    pub registered: bool,
}

impl RightsState {
    #[must_use]
    pub fn remaining(&self, kind: RightKind) -> Option<u32> {
        match kind {
            RightKind::Print => self.print_remaining,
            RightKind::Copy => self.copy_remaining,
        }
    }
}
