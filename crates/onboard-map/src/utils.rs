//! Text normalization and keyword extraction shared by the matchers.

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercases and removes all whitespace, keeping every other character.
pub fn fold_whitespace(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase alphanumeric characters only ("Date_of_Birth" -> "dateofbirth").
pub fn compact_name(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Extract canonical keyword tokens from a name or free text.
///
/// Splits on separators and camelCase boundaries, splits well-known
/// suffixes ("birthdate" -> "birth", "date"), drops digits and stopwords,
/// canonicalizes abbreviations ("dt" -> "date") and appends expansions
/// ("dob" -> "dob", "date", "birth"). Tokens keep their first-seen order.
pub fn keywords(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in split_words(raw) {
        for part in split_suffixes(&word) {
            let Some(canonical) = canonical_token(&part) else {
                continue;
            };
            push_unique(&mut tokens, canonical);
            for expansion in expansions(canonical) {
                push_unique(&mut tokens, expansion);
            }
        }
    }
    tokens
}

fn push_unique(tokens: &mut Vec<String>, token: &str) {
    if !tokens.iter().any(|t| t == token) {
        tokens.push(token.to_string());
    }
}

/// Split into lowercase words on non-alphanumerics and camelCase boundaries.
///
/// Acronym runs stay together ("NPINumber" -> "npi", "number").
fn split_words(raw: &str) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut normalized = String::with_capacity(raw.len() + 8);
    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            normalized.push(' ');
            continue;
        }
        if idx > 0 && ch.is_uppercase() {
            let prev = chars[idx - 1];
            let next_lower = chars.get(idx + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_lower) {
                normalized.push(' ');
            }
        }
        normalized.push(ch);
    }
    normalized
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

fn split_suffixes(token: &str) -> Vec<String> {
    const SUFFIXES: [&str; 12] = [
        "dtc",
        "date",
        "dat",
        "dt",
        "seq",
        "sequence",
        "id",
        "identifier",
        "ident",
        "cd",
        "code",
        "name",
    ];
    for suffix in SUFFIXES {
        if token.len() >= suffix.len() + 3 && token.ends_with(suffix) {
            let base = &token[..token.len() - suffix.len()];
            return vec![base.to_string(), suffix.to_string()];
        }
    }
    vec![token.to_string()]
}

fn canonical_token(token: &str) -> Option<&str> {
    if token.is_empty() || token.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    if is_stopword(token) {
        return None;
    }
    let mapped = match token {
        "dt" | "dat" | "dtc" | "date" | "datetime" => "date",
        "subj" | "subject" | "subjid" => "subject",
        "num" | "no" | "nbr" | "nr" => "number",
        "ident" | "identifier" => "id",
        "cd" => "code",
        "seq" | "sequence" => "seq",
        "nam" | "nm" => "name",
        "amt" => "amount",
        "qty" => "quantity",
        "desc" | "descr" => "description",
        "addr" => "address",
        "pt" | "pat" => "patient",
        "tel" | "ph" | "phn" => "phone",
        "postal" | "postcode" => "zip",
        _ => token,
    };
    Some(mapped)
}

fn expansions(token: &str) -> &'static [&'static str] {
    match token {
        "dob" => &["date", "birth"],
        "dod" => &["date", "death"],
        "dos" => &["date", "service"],
        "ssn" => &["social", "security", "number"],
        "npi" => &["national", "provider", "id"],
        "mrn" => &["medical", "record", "number"],
        "dx" => &["diagnosis"],
        "px" => &["procedure"],
        "icd" => &["diagnosis", "code"],
        "cpt" => &["procedure", "code"],
        "fname" => &["first", "name"],
        "lname" => &["last", "name"],
        "zip" => &["postal", "code"],
        "sex" => &["gender"],
        "gender" => &["sex"],
        _ => &[],
    }
}

fn is_stopword(token: &str) -> bool {
    matches!(
        token,
        "of" | "and"
            | "the"
            | "to"
            | "for"
            | "in"
            | "on"
            | "at"
            | "with"
            | "by"
            | "from"
            | "or"
            | "a"
            | "an"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_and_separator_split() {
        assert_eq!(keywords("PatientID"), vec!["patient", "id"]);
        assert_eq!(keywords("Patient_ID"), vec!["patient", "id"]);
        assert_eq!(keywords("Date_of_Birth"), vec!["date", "birth"]);
    }

    #[test]
    fn acronym_run_stays_together() {
        assert_eq!(
            keywords("NPINumber"),
            vec!["npi", "national", "provider", "id", "number"]
        );
    }

    #[test]
    fn abbreviations_expand() {
        assert_eq!(keywords("DOB"), vec!["dob", "date", "birth"]);
        assert_eq!(keywords("visit_dt"), vec!["visit", "date"]);
    }

    #[test]
    fn suffixes_split_only_with_a_real_base() {
        assert_eq!(keywords("birthdate"), vec!["birth", "date"]);
        assert_eq!(keywords("update"), vec!["update"]);
    }

    #[test]
    fn digits_and_stopwords_dropped() {
        assert_eq!(keywords("address 2 of the"), vec!["address"]);
        assert!(keywords("___").is_empty());
    }

    #[test]
    fn folding_helpers() {
        assert_eq!(fold_whitespace(" Patient ID "), "patientid");
        assert_eq!(compact_name("Date_of_Birth"), "dateofbirth");
        assert_eq!(normalize_text("  Visit-Date_1 "), "visit date 1");
    }
}
