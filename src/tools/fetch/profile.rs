/// Header profiles used by the HTTP strategies.
///
/// Each profile keeps User-Agent and client hints consistent:
/// - `Minimal` → Accept headers only, rotated desktop User-Agent
/// - `Desktop` → Chrome-style browser headers, rotated desktop User-Agent
/// - `Android` → Chrome on Android with a fixed mobile User-Agent
/// - `Extended` → Desktop plus the full Sec-Fetch / client hint suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchProfile {
    Minimal,
    #[default]
    Desktop,
    Android,
    Extended,
}

impl FetchProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Desktop => "Desktop (Chrome)",
            Self::Android => "Android (Chrome)",
            Self::Extended => "Extended (Chrome)",
        }
    }

    /// Whether the rotated User-Agent may be used with this profile.
    pub fn rotates_user_agent(&self) -> bool {
        !matches!(self, Self::Android)
    }
}
