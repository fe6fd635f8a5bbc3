//! Language detection and tree-sitter grammar loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::Language;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedLanguage {
    Php,
}

impl SupportedLanguage {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "php" | "php3" | "php4" | "php5" | "php7" | "phtml" | "inc" => {
                Some(SupportedLanguage::Php)
            }
            _ => None,
        }
    }

    /// Get the tree-sitter Language for this language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SupportedLanguage::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            SupportedLanguage::Php => "PHP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            SupportedLanguage::from_path(Path::new("src/Foo.php")),
            Some(SupportedLanguage::Php)
        );
        assert_eq!(
            SupportedLanguage::from_path(Path::new("legacy/header.inc")),
            Some(SupportedLanguage::Php)
        );
        assert_eq!(SupportedLanguage::from_path(Path::new("main.lua")), None);
        assert_eq!(SupportedLanguage::from_path(Path::new("Makefile")), None);
    }
}
