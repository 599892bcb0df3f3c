use serde::{Deserialize, Serialize};
use std::fmt;

/// Document categories shown in the organizer. Every catalog view and icon
/// lookup goes through [`DocumentCategory::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Pdf,
    Word,
    Hangul,
    Excel,
    PowerPoint,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 5] = [
        DocumentCategory::Pdf,
        DocumentCategory::Word,
        DocumentCategory::Hangul,
        DocumentCategory::Excel,
        DocumentCategory::PowerPoint,
    ];

    /// Map a file extension to its category, case-insensitively.
    ///
    /// Unrecognized extensions fall back to [`DocumentCategory::Pdf`], which is
    /// what the organizer has always shown for them.
    pub fn classify(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => DocumentCategory::Pdf,
            "doc" | "docx" => DocumentCategory::Word,
            "hwp" | "hwpx" => DocumentCategory::Hangul,
            "xls" | "xlsx" => DocumentCategory::Excel,
            "ppt" | "pptx" => DocumentCategory::PowerPoint,
            _ => DocumentCategory::Pdf,
        }
    }

    /// Extensions accepted for import under this category
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DocumentCategory::Pdf => &["pdf"],
            DocumentCategory::Word => &["doc", "docx"],
            DocumentCategory::Hangul => &["hwp", "hwpx"],
            DocumentCategory::Excel => &["xls", "xlsx"],
            DocumentCategory::PowerPoint => &["ppt", "pptx"],
        }
    }

    /// Asset name of the icon drawn next to files of this category
    pub fn icon_name(&self) -> &'static str {
        match self {
            DocumentCategory::Pdf => "PDF",
            DocumentCategory::Word => "Word",
            DocumentCategory::Hangul => "HWP",
            DocumentCategory::Excel => "Excel",
            DocumentCategory::PowerPoint => "PPT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentCategory::Pdf => "PDF",
            DocumentCategory::Word => "Word",
            DocumentCategory::Hangul => "Hangul",
            DocumentCategory::Excel => "Excel",
            DocumentCategory::PowerPoint => "PowerPoint",
        }
    }

    /// Whether the extension is one of the importable document types.
    /// Unlike [`classify`](Self::classify) this has no fallback.
    pub fn is_supported_extension(extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        Self::ALL
            .iter()
            .any(|category| category.extensions().contains(&extension.as_str()))
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(DocumentCategory::classify("XLSX"), DocumentCategory::Excel);
        assert_eq!(DocumentCategory::classify("Docx"), DocumentCategory::Word);
        assert_eq!(DocumentCategory::classify("HWPX"), DocumentCategory::Hangul);
    }

    #[test]
    fn test_unknown_extension_falls_back_to_pdf() {
        assert_eq!(DocumentCategory::classify("txt"), DocumentCategory::Pdf);
        assert_eq!(DocumentCategory::classify(""), DocumentCategory::Pdf);
        assert!(!DocumentCategory::is_supported_extension("txt"));
        assert!(!DocumentCategory::is_supported_extension(""));
    }

    #[test]
    fn test_extensions_round_trip_through_classify() {
        for category in DocumentCategory::ALL {
            for extension in category.extensions() {
                assert_eq!(DocumentCategory::classify(extension), category);
                assert!(DocumentCategory::is_supported_extension(extension));
            }
        }
    }
}
