//! CNPJ cleaning, masking and check-digit validation.
//!
//! A CNPJ is 14 digits: an 8-digit root, a 4-digit branch order and two
//! modulo-11 check digits. The canonical form everywhere in cnpjfy is the bare
//! 14-digit string with leading zeros preserved; the `NN.NNN.NNN/NNNN-NN`
//! punctuation is only ever derived for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of digits in a CNPJ.
pub const CNPJ_LEN: usize = 14;

/// Maximum length of a masked CNPJ (14 digits + 4 punctuation marks).
pub const MASKED_LEN: usize = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CnpjError {
    #[error("invalid CNPJ: {0:?}")]
    Invalid(String),
}

/// Strip every character that is not an ASCII digit.
pub fn clean(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Apply the `NN.NNN.NNN/NNNN-NN` pattern progressively.
///
/// Usable for live input formatting: a separator is only emitted once the
/// digit that follows it has been typed. Digits past the 14th are ignored.
pub fn mask(input: &str) -> String {
    let mut out = String::with_capacity(MASKED_LEN);
    for (i, d) in clean(input).chars().take(CNPJ_LEN).enumerate() {
        match i {
            2 | 5 => out.push('.'),
            8 => out.push('/'),
            12 => out.push('-'),
            _ => {}
        }
        out.push(d);
    }
    out
}

/// Full mask when the input holds exactly 14 digits, otherwise the input
/// unchanged.
pub fn format(input: &str) -> String {
    let digits = clean(input);
    if digits.len() == CNPJ_LEN {
        mask(&digits)
    } else {
        input.to_string()
    }
}

/// Check a CNPJ: 14 digits, not a repeated single digit, both check digits
/// correct. Never panics.
pub fn validate(input: &str) -> bool {
    let digits: Vec<u32> = clean(input)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    if digits.len() != CNPJ_LEN {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..12]) == digits[12] && check_digit(&digits[..13]) == digits[13]
}

/// Weighted modulo-11 check digit over `base` (12 or 13 digits).
///
/// Weights run from `len - 7` down to 2, then wrap to 9 and continue down to 2.
fn check_digit(base: &[u32]) -> u32 {
    let mut weight = base.len() as u32 - 7;
    let mut sum = 0;
    for &d in base {
        sum += d * weight;
        weight = if weight == 2 { 9 } else { weight - 1 };
    }
    let rem = sum % 11;
    if rem < 2 { 0 } else { 11 - rem }
}

/// A 14-digit CNPJ in canonical (unformatted) form.
///
/// [`Cnpj::parse`] accepts only identifiers with valid check digits.
/// [`Cnpj::from_digits_padded`] is the structural constructor used for
/// records coming back from the remote API, where the check digits are the
/// registry's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cnpj(String);

impl Cnpj {
    /// Clean and validate user input.
    pub fn parse(input: &str) -> Result<Self, CnpjError> {
        if !validate(input) {
            return Err(CnpjError::Invalid(input.to_string()));
        }
        Ok(Self(clean(input)))
    }

    /// Build an identifier from whatever digits `input` contains, left-padding
    /// with zeros to 14 and dropping anything past the 14th digit.
    pub fn from_digits_padded(input: &str) -> Self {
        let digits: String = clean(input).chars().take(CNPJ_LEN).collect();
        Self(format!("{digits:0>14}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `NN.NNN.NNN/NNNN-NN`.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }

    /// The 8-digit root shared by the head office and all its branches.
    pub fn root(&self) -> &str {
        &self.0[..8]
    }

    /// Whether the check digits are correct.
    pub fn is_valid(&self) -> bool {
        validate(&self.0)
    }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl FromStr for Cnpj {
    type Err = CnpjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Cnpj {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Cnpj {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cnpj {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = clean(&s);
        if digits.len() != CNPJ_LEN {
            return Err(serde::de::Error::custom(format!(
                "expected 14 CNPJ digits, got {s:?}"
            )));
        }
        Ok(Self(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const VALID: &str = "11222333000181";

    #[test]
    fn clean_strips_punctuation() {
        assert_eq!(clean("11.222.333/0001-81"), VALID);
        assert_eq!(clean(" 11 222 abc 333 0001 81 "), VALID);
        assert_eq!(clean(""), "");
        assert_eq!(clean("abc"), "");
    }

    #[test]
    fn mask_is_progressive() {
        assert_eq!(mask("1"), "1");
        assert_eq!(mask("11"), "11");
        assert_eq!(mask("112"), "11.2");
        assert_eq!(mask("11222"), "11.222");
        assert_eq!(mask("112223"), "11.222.3");
        assert_eq!(mask("112223330"), "11.222.333/0");
        assert_eq!(mask("1122233300018"), "11.222.333/0001-8");
        assert_eq!(mask(VALID), "11.222.333/0001-81");
    }

    #[test]
    fn mask_caps_at_eighteen_chars() {
        let masked = mask("112223330001819999");
        assert_eq!(masked, "11.222.333/0001-81");
        assert_eq!(masked.len(), MASKED_LEN);
    }

    #[test]
    fn format_leaves_partial_input_alone() {
        assert_eq!(format(VALID), "11.222.333/0001-81");
        assert_eq!(format("1122"), "1122");
    }

    #[test]
    fn known_valid_identifiers() {
        assert!(validate(VALID));
        assert!(validate("11.222.333/0001-81"));
        // Leading zeros are significant.
        assert!(validate("00000000000191"));
    }

    #[test]
    fn wrong_length_is_invalid() {
        assert!(!validate(""));
        assert!(!validate("not a cnpj"));
        assert!(!validate("1122233300018"));
        assert!(!validate("112223330001810"));
    }

    #[test]
    fn repeated_digits_are_invalid() {
        for d in 0..=9 {
            let s = d.to_string().repeat(14);
            assert!(!validate(&s), "{s} should be rejected");
        }
    }

    #[test]
    fn single_digit_changes_are_caught() {
        let mutants = [
            "21222333000181", // first digit
            "11222333000281", // last base digit
            "11222333000171", // first check digit
            "11222333000182", // second check digit
            "11222333000191", // first check digit, other direction
        ];
        for m in mutants {
            assert!(!validate(m), "{m} should be rejected");
        }
    }

    #[test]
    fn adjacent_transpositions_are_caught() {
        let mutants = [
            "11223233000181", // positions 5/6
            "11222330300181", // positions 8/9
            "12122333000181", // positions 2/3
        ];
        for m in mutants {
            assert!(!validate(m), "{m} should be rejected");
        }
    }

    #[test]
    fn parse_keeps_canonical_digits() {
        let cnpj = Cnpj::parse("11.222.333/0001-81").unwrap();
        assert_eq!(cnpj.as_str(), VALID);
        assert_eq!(cnpj.to_string(), "11.222.333/0001-81");
        assert_eq!(cnpj.root(), "11222333");
        assert!(matches!(Cnpj::parse("123"), Err(CnpjError::Invalid(_))));
    }

    #[test]
    fn padded_constructor_preserves_leading_zeros() {
        assert_eq!(Cnpj::from_digits_padded("191").as_str(), "00000000000191");
        assert_eq!(
            Cnpj::from_digits_padded("00.000.000/0001-91").as_str(),
            "00000000000191"
        );
        assert_eq!(
            Cnpj::from_digits_padded("1122233300018199").as_str(),
            VALID
        );
    }

    #[test]
    fn serde_uses_bare_digits() {
        let cnpj = Cnpj::parse(VALID).unwrap();
        let json = serde_json::to_string(&cnpj).unwrap();
        assert_eq!(json, "\"11222333000181\"");
        let back: Cnpj = serde_json::from_str("\"11.222.333/0001-81\"").unwrap();
        assert_eq!(back, cnpj);
        assert!(serde_json::from_str::<Cnpj>("\"123\"").is_err());
    }

    proptest! {
        #[test]
        fn mask_then_clean_keeps_digit_content(s in "[0-9]{1,14}[ ./a-z-]{0,4}") {
            let digits = clean(&s);
            prop_assert_eq!(clean(&mask(&digits)), digits);
        }

        #[test]
        fn validate_never_panics(s in ".*") {
            let _ = validate(&s);
        }

        #[test]
        fn non_fourteen_digit_input_is_invalid(s in "[0-9]{0,13}|[0-9]{15,20}") {
            prop_assert!(!validate(&s));
        }
    }
}
