// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// Person documents carry 11 digits (CPF), organization documents 14
/// (CNPJ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Person,
    Organization,
}

impl DocumentKind {
    pub const fn digit_count(self) -> usize {
        match self {
            Self::Person => 11,
            Self::Organization => 14,
        }
    }

    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Person => "000.000.000-00",
            Self::Organization => "00.000.000/0000-00",
        }
    }
}

pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Reapplied on every keystroke. Separators are inserted only once at
/// least one digit of the following group exists, so partial input renders
/// without trailing punctuation. Input longer than the mask is returned as
/// bare digits, matching the length guard of the original input handlers.
pub fn mask_document(input: &str, kind: DocumentKind) -> String {
    let digits = digits_only(input);
    if digits.len() > kind.digit_count() {
        return digits;
    }
    match kind {
        DocumentKind::Person => group_mask(&digits, &[(3, "."), (3, "."), (3, "-"), (2, "")]),
        DocumentKind::Organization => {
            group_mask(&digits, &[(2, "."), (3, "."), (3, "/"), (4, "-"), (2, "")])
        }
    }
}

pub fn mask_phone(input: &str) -> String {
    let digits = digits_only(input);
    if digits.len() > 11 || digits.len() <= 2 {
        return digits;
    }
    let (area, local) = digits.split_at(2);
    if local.len() <= 5 {
        format!("({area}) {local}")
    } else {
        format!("({area}) {}-{}", &local[..5], &local[5..])
    }
}

pub fn mask_postal_code(input: &str) -> String {
    let digits = digits_only(input);
    if digits.len() > 8 || digits.len() <= 5 {
        return digits;
    }
    format!("{}-{}", &digits[..5], &digits[5..])
}

/// Mod-11 check of the 11-digit person document: two check digits over
/// weighted digit sums, all-identical sequences rejected.
pub fn validate_person_document(input: &str) -> bool {
    let digits = digits_only(input);
    if digits.len() != 11 {
        return false;
    }
    let values: Vec<u32> = digits.chars().filter_map(|ch| ch.to_digit(10)).collect();
    if values.iter().all(|&digit| digit == values[0]) {
        return false;
    }
    check_digit(&values[..9]) == values[9] && check_digit(&values[..10]) == values[10]
}

/// Weighted sum with weights descending from len+1 down to 2; remainders
/// below 2 map to a zero check digit.
fn check_digit(values: &[u32]) -> u32 {
    let top = values.len() as u32 + 1;
    let sum: u32 = values
        .iter()
        .enumerate()
        .map(|(index, &value)| value * (top - index as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

fn group_mask(digits: &str, groups: &[(usize, &str)]) -> String {
    let mut out = String::with_capacity(digits.len() + groups.len());
    let mut rest = digits;
    for (width, separator) in groups {
        let take = (*width).min(rest.len());
        out.push_str(&rest[..take]);
        rest = &rest[take..];
        if rest.is_empty() {
            break;
        }
        out.push_str(separator);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        DocumentKind, digits_only, mask_document, mask_phone, mask_postal_code,
        validate_person_document,
    };

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("12.345.678/9012-34"), "12345678901234");
        assert_eq!(digits_only("(11) 98765-4321"), "11987654321");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn person_document_mask_full_and_partial() {
        let cases = [
            ("", ""),
            ("1", "1"),
            ("123", "123"),
            ("1234", "123.4"),
            ("123456", "123.456"),
            ("1234567", "123.456.7"),
            ("123456789", "123.456.789"),
            ("1234567890", "123.456.789-0"),
            ("12345678901", "123.456.789-01"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                mask_document(input, DocumentKind::Person),
                expected,
                "input={input}"
            );
        }
    }

    #[test]
    fn organization_document_mask_full_and_partial() {
        let cases = [
            ("12", "12"),
            ("123", "12.3"),
            ("12345", "12.345"),
            ("123456", "12.345.6"),
            ("12345678", "12.345.678"),
            ("123456789", "12.345.678/9"),
            ("123456789012", "12.345.678/9012"),
            ("1234567890123", "12.345.678/9012-3"),
            ("12345678901234", "12.345.678/9012-34"),
        ];
        for (input, expected) in cases {
            assert_eq!(
                mask_document(input, DocumentKind::Organization),
                expected,
                "input={input}"
            );
        }
    }

    #[test]
    fn oversized_document_input_left_unformatted() {
        assert_eq!(
            mask_document("123456789012", DocumentKind::Person),
            "123456789012"
        );
        assert_eq!(
            mask_document("123456789012345", DocumentKind::Organization),
            "123456789012345"
        );
    }

    #[test]
    fn mask_reapplies_over_already_masked_input() {
        assert_eq!(
            mask_document("123.456.789-01", DocumentKind::Person),
            "123.456.789-01"
        );
        assert_eq!(
            mask_document("12.345.678/9012-34", DocumentKind::Organization),
            "12.345.678/9012-34"
        );
    }

    #[test]
    fn phone_mask_mobile_and_landline() {
        assert_eq!(mask_phone("11987654321"), "(11) 98765-4321");
        assert_eq!(mask_phone("1187654321"), "(11) 87654-321");
        assert_eq!(mask_phone("12"), "12");
        assert_eq!(mask_phone("123"), "(12) 3");
        assert_eq!(mask_phone("119876543210"), "119876543210");
    }

    #[test]
    fn postal_code_mask() {
        assert_eq!(mask_postal_code("12345678"), "12345-678");
        assert_eq!(mask_postal_code("123456"), "12345-6");
        assert_eq!(mask_postal_code("12345"), "12345");
        assert_eq!(mask_postal_code("123456789"), "123456789");
    }

    #[test]
    fn person_document_checksum_known_vectors() {
        assert!(validate_person_document("52998224725"));
        assert!(validate_person_document("529.982.247-25"));
        assert!(!validate_person_document("11111111111"));
        assert!(!validate_person_document("52998224724"));
        assert!(!validate_person_document("5299822472"));
        assert!(!validate_person_document(""));
    }

    #[test]
    fn person_document_checksum_rejects_wrong_second_digit() {
        assert!(!validate_person_document("52998224735"));
    }
}
