use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported national grading systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingSystem {
    /// United Kingdom: letter grades A*-U or GCSE numeric 1-9.
    Uk,
    /// United States: letter grades, percentage, GPA on a 4.0 scale.
    Us,
    /// Germany: 1.0-6.0 scale, inverted (1.0 is best).
    De,
    /// Argentina: 1-10 scale, 4 is the passing mark.
    Ar,
}

impl GradingSystem {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GradingSystem::Uk => "uk",
            GradingSystem::Us => "us",
            GradingSystem::De => "de",
            GradingSystem::Ar => "ar",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            GradingSystem::Uk => "United Kingdom",
            GradingSystem::Us => "United States",
            GradingSystem::De => "Germany",
            GradingSystem::Ar => "Argentina",
        }
    }

    /// Parse a system code, accepting a few common aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uk" | "gb" => Some(GradingSystem::Uk),
            "us" | "usa" => Some(GradingSystem::Us),
            "de" | "ger" => Some(GradingSystem::De),
            "ar" | "arg" => Some(GradingSystem::Ar),
            _ => None,
        }
    }

    /// All supported systems.
    #[must_use]
    pub fn all() -> &'static [GradingSystem] {
        &[
            GradingSystem::Uk,
            GradingSystem::Us,
            GradingSystem::De,
            GradingSystem::Ar,
        ]
    }
}

impl fmt::Display for GradingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(GradingSystem::parse("uk"), Some(GradingSystem::Uk));
        assert_eq!(GradingSystem::parse("GB"), Some(GradingSystem::Uk));
        assert_eq!(GradingSystem::parse("usa"), Some(GradingSystem::Us));
        assert_eq!(GradingSystem::parse(" de "), Some(GradingSystem::De));
        assert_eq!(GradingSystem::parse("arg"), Some(GradingSystem::Ar));
        assert_eq!(GradingSystem::parse("fr"), None);
    }

    #[test]
    fn all_lists_four_systems() {
        assert_eq!(GradingSystem::all().len(), 4);
    }

    #[test]
    fn serializes_as_lowercase_code() {
        let json = serde_json::to_string(&GradingSystem::De).unwrap();
        assert_eq!(json, "\"de\"");
    }
}
