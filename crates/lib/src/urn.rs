//! Contact URNs (`scheme:path`) and telephone number normalization.

use phonenumber::country;
use phonenumber::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEL_SCHEME: &str = "tel";

/// Numbers shorter than this are short codes and are never given a country prefix.
const MIN_NATIONAL_DIGITS: usize = 7;

#[derive(Debug, thiserror::Error)]
#[error("invalid urn: {0}")]
pub struct UrnError(String);

/// A contact address such as `tel:+639171234567`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Urn {
    scheme: String,
    path: String,
}

impl Urn {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_lowercase(),
            path: path.into(),
        }
    }

    /// Builds a `tel:` URN, formatting the number as E.164 when it is valid for `country`
    /// (or valid once a `+` is added). Short codes, numbers without a country and numbers
    /// that never validate keep their digits as given.
    pub fn tel_for_country(number: &str, country: Option<&str>) -> Self {
        let trimmed = number.trim();
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Self::new(TEL_SCHEME, trimmed.to_string());
        }
        let normalized = if trimmed.starts_with('+') {
            format!("+{}", digits)
        } else {
            digits
        };
        if normalized.trim_start_matches('+').len() < MIN_NATIONAL_DIGITS {
            return Self::new(TEL_SCHEME, normalized);
        }

        let country_id = country.and_then(|c| c.trim().to_uppercase().parse::<country::Id>().ok());
        let path = match phonenumber::parse(country_id, &normalized) {
            Err(_) => normalized,
            Ok(parsed) if phonenumber::is_valid(&parsed) => e164(&parsed),
            // e.g. "639171234567": the country code is there, only the plus is missing
            Ok(_) if !normalized.starts_with('+') => {
                match phonenumber::parse(None, format!("+{}", normalized)) {
                    Ok(parsed) if phonenumber::is_valid(&parsed) => e164(&parsed),
                    _ => normalized,
                }
            }
            Ok(_) => normalized,
        };
        Self::new(TEL_SCHEME, path)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn e164(number: &phonenumber::PhoneNumber) -> String {
    number.format().mode(Mode::E164).to_string()
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.to_string()
    }
}

impl TryFrom<String> for Urn {
    type Error = UrnError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for Urn {
    type Err = UrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((scheme, path)) if !scheme.is_empty() && !path.is_empty() => {
                Ok(Self::new(scheme, path))
            }
            _ => Err(UrnError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn international_number_kept() {
        let urn = Urn::tel_for_country("+639171234567", Some("PH"));
        assert_eq!(urn.to_string(), "tel:+639171234567");
    }

    #[test]
    fn national_number_gets_country_code() {
        let urn = Urn::tel_for_country("09171234567", Some("PH"));
        assert_eq!(urn.path(), "+639171234567");
    }

    #[test]
    fn number_with_code_but_no_plus() {
        let urn = Urn::tel_for_country("639171234567", Some("ph"));
        assert_eq!(urn.path(), "+639171234567");
    }

    #[test]
    fn short_code_untouched() {
        let urn = Urn::tel_for_country("2158", Some("PH"));
        assert_eq!(urn.path(), "2158");
    }

    #[test]
    fn national_numbers_for_other_countries() {
        let cases = [
            ("612345678", "ES", "+34612345678"),
            ("0612345678", "NL", "+31612345678"),
            ("3001234567", "CO", "+573001234567"),
            ("0788383383", "RW", "+250788383383"),
        ];
        for (number, country, expected) in cases {
            let urn = Urn::tel_for_country(number, Some(country));
            assert_eq!(urn.path(), expected, "{} in {}", number, country);
        }
    }

    #[test]
    fn invalid_number_keeps_digits() {
        let urn = Urn::tel_for_country("1234567", Some("PH"));
        assert_eq!(urn.path(), "1234567");
    }

    #[test]
    fn unknown_country_keeps_digits() {
        let urn = Urn::tel_for_country("0917 123 4567", None);
        assert_eq!(urn.path(), "09171234567");
        let urn = Urn::tel_for_country("0917 123 4567", Some("XX"));
        assert_eq!(urn.path(), "09171234567");
    }

    #[test]
    fn parse_and_display() {
        let urn: Urn = "tel:+250788383383".parse().unwrap();
        assert_eq!(urn.scheme(), "tel");
        assert_eq!(urn.path(), "+250788383383");
        assert!("nocolon".parse::<Urn>().is_err());
    }
}
