use std::fmt::{Display, Formatter, Result as FormatResult};

/// Host-initiated broadcast channels.
///
/// Both are stateful: a view that attaches late must also pull the current
/// value instead of waiting for the next broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastChannel {
    /// Payload: the normalised locale code.
    LocaleChanged,
    /// Payload: the effective theme mode (`light` or `dark`).
    ThemeChanged,
}

impl BroadcastChannel {
    pub const ALL: [BroadcastChannel; 2] =
        [BroadcastChannel::LocaleChanged, BroadcastChannel::ThemeChanged];

    pub const fn name(self) -> &'static str {
        match self {
            BroadcastChannel::LocaleChanged => "locale.changed",
            BroadcastChannel::ThemeChanged => "theme.changed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

impl Display for BroadcastChannel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.name())
    }
}
