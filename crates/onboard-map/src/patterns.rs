//! Value-shape patterns inferred from target field names and example values.
//!
//! A field called "DOB" or "Visit Date" should be fed by a column whose
//! sampled values look like dates; "NPI" wants ten digits, and so on.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::keywords;

/// Dates: ISO (with optional time), slashed/dashed US or EU, compact YYYYMMDD.
static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?|\d{4}/\d{2}/\d{2}|\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}|(?:19|20)\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01]))$",
    )
    .expect("Invalid date regex")
});

static ZIP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").expect("Invalid ZIP regex"));

static NPI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("Invalid NPI regex"));

/// CPT: four digits followed by a digit, or Category II/III suffix F/T.
static CPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[0-9FT]$").expect("Invalid CPT regex"));

/// ICD-10: letter, digit, alphanumeric, optional dotted extension.
static ICD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]\d[0-9A-Z](?:\.?[0-9A-Z]{1,4})?$").expect("Invalid ICD regex")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+?1[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}$").expect("Invalid phone regex")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

static SSN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-?\d{2}-?\d{4}$").expect("Invalid SSN regex"));

/// A recognizable value shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePattern {
    Date,
    Zip,
    Npi,
    Cpt,
    Icd,
    Phone,
    Email,
    Ssn,
}

/// Lookup order when guessing a shape from one value. Ambiguous digit runs
/// resolve to the earlier entry: five digits read as a ZIP, not a CPT code.
const EXAMPLE_ORDER: [ValuePattern; 8] = [
    ValuePattern::Email,
    ValuePattern::Date,
    ValuePattern::Zip,
    ValuePattern::Npi,
    ValuePattern::Phone,
    ValuePattern::Ssn,
    ValuePattern::Icd,
    ValuePattern::Cpt,
];

impl ValuePattern {
    /// Infer the expected value shape from a field name.
    pub fn from_field_name(field_name: &str) -> Option<Self> {
        let tokens = keywords(field_name);
        let has = |needle: &str| tokens.iter().any(|t| t == needle);
        if has("date") {
            Some(Self::Date)
        } else if has("npi") {
            Some(Self::Npi)
        } else if has("cpt") {
            Some(Self::Cpt)
        } else if has("icd") || has("diagnosis") {
            Some(Self::Icd)
        } else if has("zip") {
            Some(Self::Zip)
        } else if has("ssn") {
            Some(Self::Ssn)
        } else if has("email") {
            Some(Self::Email)
        } else if has("phone") || has("fax") || has("mobile") {
            Some(Self::Phone)
        } else {
            None
        }
    }

    /// Map a free-form type tag to a pattern; only date-like tags carry one.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        if tag.contains("date") || tag.contains("time") {
            Some(Self::Date)
        } else {
            None
        }
    }

    /// Guess the shape from a single example value.
    pub fn from_example(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        EXAMPLE_ORDER.into_iter().find(|pattern| pattern.matches(value))
    }

    fn regex(self) -> &'static Regex {
        match self {
            Self::Date => &DATE_REGEX,
            Self::Zip => &ZIP_REGEX,
            Self::Npi => &NPI_REGEX,
            Self::Cpt => &CPT_REGEX,
            Self::Icd => &ICD_REGEX,
            Self::Phone => &PHONE_REGEX,
            Self::Email => &EMAIL_REGEX,
            Self::Ssn => &SSN_REGEX,
        }
    }

    pub fn matches(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Icd => self.regex().is_match(&value.to_uppercase()),
            _ => self.regex().is_match(value),
        }
    }

    /// Fraction of non-blank samples with this shape; 0.0 without samples.
    pub fn match_ratio(self, samples: &[String]) -> f64 {
        let mut total = 0usize;
        let mut matched = 0usize;
        for sample in samples {
            if sample.trim().is_empty() {
                continue;
            }
            total += 1;
            if self.matches(sample) {
                matched += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            matched as f64 / total as f64
        }
    }
}

/// True when every non-blank sample looks like a date (and there is at least one).
pub fn all_dates(samples: &[String]) -> bool {
    let mut seen = false;
    for sample in samples {
        if sample.trim().is_empty() {
            continue;
        }
        if !ValuePattern::Date.matches(sample) {
            return false;
        }
        seen = true;
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_from_field_name() {
        assert_eq!(ValuePattern::from_field_name("DOB"), Some(ValuePattern::Date));
        assert_eq!(ValuePattern::from_field_name("Service_Dt"), Some(ValuePattern::Date));
        assert_eq!(ValuePattern::from_field_name("Billing NPI"), Some(ValuePattern::Npi));
        assert_eq!(ValuePattern::from_field_name("ZipCode"), Some(ValuePattern::Zip));
        assert_eq!(ValuePattern::from_field_name("Primary_DX"), Some(ValuePattern::Icd));
        assert_eq!(ValuePattern::from_field_name("CPT"), Some(ValuePattern::Cpt));
        assert_eq!(ValuePattern::from_field_name("FirstName"), None);
    }

    #[test]
    fn date_shapes() {
        for value in ["2024-01-15", "2024-01-15T08:30:00Z", "01/15/2024", "1/5/24", "20240115"] {
            assert!(ValuePattern::Date.matches(value), "{value} should be a date");
        }
        assert!(!ValuePattern::Date.matches("hello"));
        assert!(!ValuePattern::Date.matches("12345"));
    }

    #[test]
    fn code_shapes() {
        assert!(ValuePattern::Zip.matches("02139"));
        assert!(ValuePattern::Zip.matches("02139-4307"));
        assert!(!ValuePattern::Zip.matches("0213"));
        assert!(ValuePattern::Npi.matches("1234567893"));
        assert!(ValuePattern::Cpt.matches("99213"));
        assert!(ValuePattern::Cpt.matches("0001F"));
        assert!(ValuePattern::Icd.matches("E11.9"));
        assert!(ValuePattern::Icd.matches("s72001a"));
        assert!(ValuePattern::Icd.matches("U07.1"));
        assert!(ValuePattern::Icd.matches("U071"));
        assert!(!ValuePattern::Icd.matches("7U0.1"));
    }

    #[test]
    fn infers_from_example_value() {
        assert_eq!(ValuePattern::from_example("2024-01-15"), Some(ValuePattern::Date));
        assert_eq!(ValuePattern::from_example(" 02139 "), Some(ValuePattern::Zip));
        assert_eq!(ValuePattern::from_example("1234567893"), Some(ValuePattern::Npi));
        assert_eq!(ValuePattern::from_example("(617) 555-0100"), Some(ValuePattern::Phone));
        assert_eq!(ValuePattern::from_example("123-45-6789"), Some(ValuePattern::Ssn));
        assert_eq!(ValuePattern::from_example("a@b.org"), Some(ValuePattern::Email));
        assert_eq!(ValuePattern::from_example("U07.1"), Some(ValuePattern::Icd));
        assert_eq!(ValuePattern::from_example("0001F"), Some(ValuePattern::Cpt));
        assert_eq!(ValuePattern::from_example("Smith"), None);
        assert_eq!(ValuePattern::from_example(""), None);
    }

    #[test]
    fn ratio_ignores_blanks() {
        let samples = vec![
            "02139".to_string(),
            " ".to_string(),
            "abc".to_string(),
            "10001".to_string(),
        ];
        let ratio = ValuePattern::Zip.match_ratio(&samples);
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(ValuePattern::Zip.match_ratio(&[]), 0.0);
    }
}
