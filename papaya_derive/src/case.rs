//! Serde's `rename_all` conventions, applied to field names.

use std::str::FromStr;
use crate::error::{ Error, Result };

/// A renaming convention accepted by `#[serde(rename_all = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenameRule {
    /// `lowercase`
    LowerCase,
    /// `UPPERCASE`
    UpperCase,
    /// `PascalCase`
    PascalCase,
    /// `camelCase`
    CamelCase,
    /// `snake_case`
    SnakeCase,
    /// `SCREAMING_SNAKE_CASE`
    ScreamingSnakeCase,
    /// `kebab-case`
    KebabCase,
    /// `SCREAMING-KEBAB-CASE`
    ScreamingKebabCase,
}

impl RenameRule {
    /// Renames a `snake_case` field name the way Serde would.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::LowerCase | RenameRule::SnakeCase => field.to_owned(),
            RenameRule::UpperCase | RenameRule::ScreamingSnakeCase => field.to_ascii_uppercase(),
            RenameRule::PascalCase => capitalize_words(field, true),
            RenameRule::CamelCase => capitalize_words(field, false),
            RenameRule::KebabCase => field.replace('_', "-"),
            RenameRule::ScreamingKebabCase => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

/// Drops underscores and capitalizes the character after each of them.
fn capitalize_words(field: &str, capitalize_first: bool) -> String {
    let mut result = String::with_capacity(field.len());
    let mut capitalize = capitalize_first;

    for ch in field.chars() {
        if ch == '_' {
            capitalize = !result.is_empty() || capitalize_first;
        } else if capitalize {
            result.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            result.push(ch);
        }
    }

    result
}

impl FromStr for RenameRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lowercase"            => Ok(RenameRule::LowerCase),
            "UPPERCASE"            => Ok(RenameRule::UpperCase),
            "PascalCase"           => Ok(RenameRule::PascalCase),
            "camelCase"            => Ok(RenameRule::CamelCase),
            "snake_case"           => Ok(RenameRule::SnakeCase),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnakeCase),
            "kebab-case"           => Ok(RenameRule::KebabCase),
            "SCREAMING-KEBAB-CASE" => Ok(RenameRule::ScreamingKebabCase),
            _ => err_fmt!("unknown `rename_all` rule: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_renaming() {
        let field = "unit_price_usd";

        assert_eq!(RenameRule::CamelCase.apply_to_field(field), "unitPriceUsd");
        assert_eq!(RenameRule::PascalCase.apply_to_field(field), "UnitPriceUsd");
        assert_eq!(RenameRule::ScreamingKebabCase.apply_to_field(field), "UNIT-PRICE-USD");
        assert_eq!(RenameRule::KebabCase.apply_to_field(field), "unit-price-usd");
        assert_eq!(RenameRule::LowerCase.apply_to_field(field), field);
    }

    #[test]
    fn leading_underscore_is_dropped_in_camel_case() {
        assert_eq!(RenameRule::CamelCase.apply_to_field("_private_note"), "privateNote");
        assert_eq!(RenameRule::CamelCase.apply_to_field(""), "");
    }

    #[test]
    fn unknown_rule() {
        assert!("Title Case".parse::<RenameRule>().is_err());
        assert_eq!("camelCase".parse::<RenameRule>().unwrap(), RenameRule::CamelCase);
    }
}
