//! Plate label normalization and composition.
//!
//! Indonesian plates read as `<region letters><number><suffix letters>`,
//! e.g. `B1234XYZ`.

use serde::Serialize;

use crate::error::CoreError;

/// Trim and upper-case a plate label, rejecting empty labels.
pub fn normalize_label(label: &str) -> Result<String, CoreError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "plate label must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_uppercase())
}

/// The three parts of a plate label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelComposition {
    pub region: String,
    pub number: String,
    pub suffix: String,
}

impl LabelComposition {
    /// Split a label around its single run of digits.
    ///
    /// Returns `None` when the label has no digits or more than one digit run.
    pub fn parse(label: &str) -> Option<Self> {
        let start = label.find(|c: char| c.is_ascii_digit())?;
        let rest = &label[start..];
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (number, suffix) = rest.split_at(len);
        if suffix.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            region: label[..start].to_string(),
            number: number.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_label("  n123xyz ").unwrap(), "N123XYZ");
    }

    #[test]
    fn empty_label_rejected() {
        assert!(normalize_label("   ").is_err());
    }

    #[test]
    fn composition_of_full_label() {
        let c = LabelComposition::parse("B1234XYZ").unwrap();
        assert_eq!(c.region, "B");
        assert_eq!(c.number, "1234");
        assert_eq!(c.suffix, "XYZ");
    }

    #[test]
    fn composition_without_suffix() {
        let c = LabelComposition::parse("AB77").unwrap();
        assert_eq!(c.region, "AB");
        assert_eq!(c.number, "77");
        assert_eq!(c.suffix, "");
    }

    #[test]
    fn composition_without_digits() {
        assert!(LabelComposition::parse("ABC").is_none());
    }

    #[test]
    fn composition_with_split_digit_runs() {
        assert!(LabelComposition::parse("B12X34").is_none());
    }
}
