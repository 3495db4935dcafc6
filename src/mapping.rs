use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DsmError, Result};
use crate::models::Record;

/// Canonical field name -> source CSV header name.
pub type Mapping = BTreeMap<String, String>;

pub const RO_FIELDS: &[&str] = &[
    "ro_number",
    "ro_date",
    "advisor",
    "vin",
    "mileage",
    "customer_name",
    "phone",
    "email",
];

pub const LINE_FIELDS: &[&str] = &["ro_number", "line_desc", "declined_amount", "declined_category"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Ro,
    Lines,
    Combined,
}

impl MappingKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ro => "ro",
            Self::Lines => "lines",
            Self::Combined => "combined",
        }
    }

    pub fn required(&self) -> &'static [&'static str] {
        match self {
            Self::Ro => &["ro_number", "ro_date"],
            Self::Lines => &["ro_number", "line_desc", "declined_amount"],
            Self::Combined => &["ro_number", "ro_date", "line_desc", "declined_amount"],
        }
    }

    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            Self::Ro => RO_FIELDS.to_vec(),
            Self::Lines => LINE_FIELDS.to_vec(),
            Self::Combined => {
                let mut all = RO_FIELDS.to_vec();
                all.extend(LINE_FIELDS.iter().filter(|f| !RO_FIELDS.contains(f)));
                all
            }
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MappingKind {
    type Err = DsmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ro" => Ok(Self::Ro),
            "lines" => Ok(Self::Lines),
            "combined" => Ok(Self::Combined),
            other => Err(DsmError::InvalidMapping(format!(
                "unknown mapping kind '{other}' (expected ro, lines or combined)"
            ))),
        }
    }
}

/// Re-key rows by canonical field. Source columns absent from a row are left out.
pub fn apply_mapping(rows: &[Record], mapping: &Mapping) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            mapping
                .iter()
                .filter_map(|(canon, src)| row.get(src).map(|v| (canon.clone(), v.clone())))
                .collect()
        })
        .collect()
}

/// Required canonical fields with no source header, in `required` order.
pub fn missing_required(mapping: &Mapping, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|k| mapping.get(**k).map_or(true, |src| src.trim().is_empty()))
        .map(|k| k.to_string())
        .collect()
}

/// Parse `canonical=Source Header` pairs, rejecting fields unknown to `kind`.
pub fn parse_pairs(kind: MappingKind, pairs: &[String]) -> Result<Mapping> {
    let fields = kind.fields();
    let mut mapping = Mapping::new();
    for pair in pairs {
        let (canon, src) = pair
            .split_once('=')
            .ok_or_else(|| DsmError::InvalidMapping(format!("expected canonical=header, got '{pair}'")))?;
        let canon = canon.trim();
        if !fields.contains(&canon) {
            return Err(DsmError::UnknownField {
                kind: kind.to_string(),
                field: canon.to_string(),
            });
        }
        mapping.insert(canon.to_string(), src.trim().to_string());
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> Mapping {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_apply_mapping_renames_columns() {
        let rows = crate::csv_input::parse_csv("RO #,Open Date,Extra\nR1,2024-01-01,x\n").unwrap();
        let m = mapping(&[("ro_number", "RO #"), ("ro_date", "Open Date"), ("email", "E-mail")]);
        let out = apply_mapping(&rows, &m);
        assert_eq!(out[0]["ro_number"], "R1");
        assert_eq!(out[0]["ro_date"], "2024-01-01");
        assert!(!out[0].contains_key("email"));
        assert!(!out[0].contains_key("Extra"));
    }

    #[test]
    fn test_missing_required() {
        let m = mapping(&[("ro_number", "RO #"), ("line_desc", "")]);
        assert_eq!(
            missing_required(&m, MappingKind::Lines.required()),
            vec!["line_desc", "declined_amount"]
        );
        assert!(missing_required(&m, &["ro_number"]).is_empty());
    }

    #[test]
    fn test_mapping_kind_from_str() {
        assert_eq!("ro".parse::<MappingKind>().unwrap(), MappingKind::Ro);
        assert_eq!("combined".parse::<MappingKind>().unwrap(), MappingKind::Combined);
        assert!("headers".parse::<MappingKind>().is_err());
    }

    #[test]
    fn test_combined_fields_have_no_duplicates() {
        let fields = MappingKind::Combined.fields();
        assert_eq!(fields.iter().filter(|f| **f == "ro_number").count(), 1);
        assert!(fields.contains(&"declined_category"));
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = vec!["ro_number=RO #".to_string(), " declined_amount = Amount ".to_string()];
        let m = parse_pairs(MappingKind::Lines, &pairs).unwrap();
        assert_eq!(m["ro_number"], "RO #");
        assert_eq!(m["declined_amount"], "Amount");
    }

    #[test]
    fn test_parse_pairs_rejects_unknown_and_malformed() {
        let err = parse_pairs(MappingKind::Ro, &["declined_amount=Amt".to_string()]).unwrap_err();
        assert!(matches!(err, DsmError::UnknownField { .. }));
        let err = parse_pairs(MappingKind::Ro, &["ro_number".to_string()]).unwrap_err();
        assert!(matches!(err, DsmError::InvalidMapping(_)));
    }
}
