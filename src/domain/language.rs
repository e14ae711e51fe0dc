use std::fmt;

use serde::{Deserialize, Serialize};

/// A canonicalised BCP-47-like language tag, e.g. `ja`, `zh-Hans`, `en-US`.
/// `spec.md` §4.7: "canonicalise to BCP-47-like form".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Canonicalise a raw tag: trim, lowercase the primary subtag, title-case
    /// a 4-letter script subtag, uppercase a 2-letter region subtag. This is
    /// intentionally a light normalisation, not a full BCP-47 parser — the
    /// gate only needs a stable key for the requirements table below.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let parts: Vec<&str> = trimmed.split(['-', '_']).collect();
        let mut out = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return None;
            }
            let normalized = if i == 0 {
                part.to_ascii_lowercase()
            } else if part.len() == 4 {
                let mut chars = part.chars();
                let first = chars.next()?.to_ascii_uppercase();
                format!("{first}{}", chars.as_str().to_ascii_lowercase())
            } else if part.len() == 2 {
                part.to_ascii_uppercase()
            } else {
                part.to_ascii_lowercase()
            };
            out.push(normalized);
        }
        Some(Self(out.join("-")))
    }

    pub fn primary_subtag(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derived per-language requirements the gate (`engine::gate`) consults
/// before scheduling, per `spec.md` §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageRequirements {
    pub needs_tokenization: bool,
    pub needs_docker_romanization: bool,
}

/// Languages that require word-segmentation before transliteration/STT
/// alignment (no native whitespace tokenisation), per the glossary's
/// "Romanisation" entry.
const TOKENIZATION_REQUIRED: &[&str] = &["ja", "zh", "th", "my", "km", "lo"];

/// Languages whose romanisation in this deployment runs through a
/// docker-hosted service rather than an in-process rule table
/// (`spec.md` glossary: "some providers require a docker-hosted service").
const DOCKER_ROMANIZATION_REQUIRED: &[&str] = &["ja", "zh"];

impl LanguageTag {
    pub fn requirements(&self) -> LanguageRequirements {
        let primary = self.primary_subtag();
        LanguageRequirements {
            needs_tokenization: TOKENIZATION_REQUIRED.contains(&primary),
            needs_docker_romanization: DOCKER_ROMANIZATION_REQUIRED.contains(&primary),
        }
    }

    /// `GetRomanizationStyles(code)` (`spec.md` §6): the romanisation
    /// conventions this deployment offers for a given language, in
    /// display order. Languages with no dedicated romanisation system
    /// (most Latin-script languages) get the single generic
    /// diacritic-stripping style `engine::romanization::romanize_rule_based`
    /// implements.
    pub fn romanization_styles(&self) -> &'static [&'static str] {
        match self.primary_subtag() {
            "ja" => &["hepburn", "kunrei-shiki", "nihon-shiki"],
            "zh" => &["pinyin", "wade-giles"],
            "ko" => &["revised-romanization", "mccune-reischauer"],
            "ru" => &["bgn-pcgn", "iso-9"],
            _ => &["diacritic-stripping"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_case_by_subtag_kind() {
        let tag = LanguageTag::canonicalize("EN-us").unwrap();
        assert_eq!(tag.as_str(), "en-US");

        let tag = LanguageTag::canonicalize("zh_hans").unwrap();
        assert_eq!(tag.as_str(), "zh-Hans");
    }

    #[test]
    fn rejects_empty_or_malformed_tags() {
        assert!(LanguageTag::canonicalize("").is_none());
        assert!(LanguageTag::canonicalize("en--US").is_none());
    }

    #[test]
    fn japanese_needs_tokenization_and_docker_romanization() {
        let tag = LanguageTag::canonicalize("ja").unwrap();
        let req = tag.requirements();
        assert!(req.needs_tokenization);
        assert!(req.needs_docker_romanization);
    }

    #[test]
    fn english_needs_neither() {
        let tag = LanguageTag::canonicalize("en").unwrap();
        let req = tag.requirements();
        assert!(!req.needs_tokenization);
        assert!(!req.needs_docker_romanization);
    }

    #[test]
    fn japanese_offers_named_romanization_styles() {
        let tag = LanguageTag::canonicalize("ja").unwrap();
        assert_eq!(tag.romanization_styles(), &["hepburn", "kunrei-shiki", "nihon-shiki"]);
    }

    #[test]
    fn unmapped_language_falls_back_to_diacritic_stripping() {
        let tag = LanguageTag::canonicalize("fr").unwrap();
        assert_eq!(tag.romanization_styles(), &["diacritic-stripping"]);
    }
}
