use std::fmt;

/// An API credential. Formatting never shows the value; `expose` is the only way out.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap `value` with surrounding whitespace stripped. Blank input yields `None`.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// First non-blank value among `vars`, in order, with the variable it came from.
    #[must_use]
    pub fn from_env(vars: &[&'static str]) -> Option<(Self, &'static str)> {
        vars.iter().find_map(|&var| {
            std::env::var(var)
                .ok()
                .and_then(Self::new)
                .map(|secret| (secret, var))
        })
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} chars>)", self.0.chars().count())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
