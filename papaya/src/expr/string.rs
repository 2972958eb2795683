//! String expression operators.
//!
//! Methods taking `&str` treat it as a literal string. The `..._value_of`
//! variants take an arbitrary operand instead, which for `&str` means a
//! field reference.

use crate::literal::RegexOpts;
use super::{ Expr, Operand, unary_operators, binary_operators };

/// Factory for string operators applied to a subject operand.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Strings };
/// #
/// let label = Strings::value_of("first").concat(" ").append("last");
///
/// assert_eq!(label.to_document(&NoOpContext).unwrap(), doc! {
///     "$concat": ["$first", " ", "$last"],
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Strings(Operand);

impl Strings {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Strings(operand.into())
    }

    unary_operators! {
        /// `$toLower`
        to_lower => "$toLower",
        /// `$toUpper`
        to_upper => "$toUpper",
        /// `$strLenBytes`
        length_bytes => "$strLenBytes",
        /// `$strLenCP`
        length_cp => "$strLenCP",
    }

    binary_operators! {
        /// `$concat` with another operand.
        concat_value_of => "$concat",
        /// `$strcasecmp` with another operand.
        strcasecmp_value_of => "$strcasecmp",
        /// `$indexOfBytes` of another operand.
        index_of_bytes_value_of => "$indexOfBytes",
        /// `$indexOfCP` of another operand.
        index_of_cp_value_of => "$indexOfCP",
        /// `$split` by another operand.
        split_value_of => "$split",
    }

    /// `$concat` with a literal string. Further parts can be `append`ed.
    pub fn concat(self, suffix: &str) -> Expr {
        self.concat_value_of(Operand::value(suffix))
    }

    /// `$strcasecmp` against a literal string.
    pub fn strcasecmp(self, other: &str) -> Expr {
        self.strcasecmp_value_of(Operand::value(other))
    }

    /// `$indexOfBytes` of a literal substring.
    pub fn index_of_bytes(self, substring: &str) -> Expr {
        self.index_of_bytes_value_of(Operand::value(substring))
    }

    /// `$indexOfCP` of a literal substring.
    pub fn index_of_cp(self, substring: &str) -> Expr {
        self.index_of_cp_value_of(Operand::value(substring))
    }

    /// `$split` by a literal delimiter.
    pub fn split(self, delimiter: &str) -> Expr {
        self.split_value_of(Operand::value(delimiter))
    }

    /// `$substr`, counting UTF-8 bytes.
    pub fn substr(self, start: i64, length: i64) -> Expr {
        Expr::list("$substr", vec![self.0, start.into(), length.into()])
    }

    /// `$substrCP`, counting code points.
    pub fn substr_cp(self, start: i64, length: i64) -> Expr {
        Expr::list("$substrCP", vec![self.0, start.into(), length.into()])
    }

    /// `$trim` whitespace.
    pub fn trim(self) -> Expr {
        self.trim_op("$trim", None)
    }

    /// `$trim` the given characters.
    pub fn trim_chars(self, chars: &str) -> Expr {
        self.trim_op("$trim", Some(chars))
    }

    /// `$ltrim` whitespace.
    pub fn ltrim(self) -> Expr {
        self.trim_op("$ltrim", None)
    }

    /// `$ltrim` the given characters.
    pub fn ltrim_chars(self, chars: &str) -> Expr {
        self.trim_op("$ltrim", Some(chars))
    }

    /// `$rtrim` whitespace.
    pub fn rtrim(self) -> Expr {
        self.trim_op("$rtrim", None)
    }

    /// `$rtrim` the given characters.
    pub fn rtrim_chars(self, chars: &str) -> Expr {
        self.trim_op("$rtrim", Some(chars))
    }

    fn trim_op(self, operator: &'static str, chars: Option<&str>) -> Expr {
        Expr::named(operator)
            .with_arg("input", self.0)
            .with_opt_arg("chars", chars.map(Operand::value))
    }

    /// `$regexFind`
    pub fn regex_find(self, pattern: &str, options: RegexOpts) -> Expr {
        self.regex_op("$regexFind", pattern, options)
    }

    /// `$regexFindAll`
    pub fn regex_find_all(self, pattern: &str, options: RegexOpts) -> Expr {
        self.regex_op("$regexFindAll", pattern, options)
    }

    /// `$regexMatch`
    pub fn regex_match(self, pattern: &str, options: RegexOpts) -> Expr {
        self.regex_op("$regexMatch", pattern, options)
    }

    fn regex_op(self, operator: &'static str, pattern: &str, options: RegexOpts) -> Expr {
        let options = if options.is_empty() {
            None
        } else {
            Some(Operand::value(options))
        };

        Expr::named(operator)
            .with_arg("input", self.0)
            .with_arg("regex", Operand::value(pattern))
            .with_opt_arg("options", options)
    }

    /// `$replaceOne` of a literal string.
    pub fn replace_one(self, find: &str, replacement: &str) -> Expr {
        self.replace_op("$replaceOne", find, replacement)
    }

    /// `$replaceAll` of a literal string.
    pub fn replace_all(self, find: &str, replacement: &str) -> Expr {
        self.replace_op("$replaceAll", find, replacement)
    }

    fn replace_op(self, operator: &'static str, find: &str, replacement: &str) -> Expr {
        Expr::named(operator)
            .with_arg("input", self.0)
            .with_arg("find", Operand::value(find))
            .with_arg("replacement", Operand::value(replacement))
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::AggregationExpression;
    use super::*;

    #[test]
    fn literal_vs_field_arguments() {
        let literal = Strings::value_of("name").split(",");
        let field = Strings::value_of("name").split_value_of("separator");

        assert_eq!(literal.to_document(&NoOpContext).unwrap(), doc! { "$split": ["$name", ","] });
        assert_eq!(field.to_document(&NoOpContext).unwrap(), doc! { "$split": ["$name", "$separator"] });
    }

    #[test]
    fn trim_and_regex_omit_absent_arguments() {
        let trim = Strings::value_of("code").trim();
        let regex = Strings::value_of("code").regex_match("^A", RegexOpts::empty());
        let regex_i = Strings::value_of("code").regex_find("^a", RegexOpts::IGNORE_CASE);

        assert_eq!(trim.to_document(&NoOpContext).unwrap(), doc! { "$trim": { "input": "$code" } });
        assert_eq!(regex.to_document(&NoOpContext).unwrap(), doc! {
            "$regexMatch": { "input": "$code", "regex": "^A" },
        });
        assert_eq!(regex_i.to_document(&NoOpContext).unwrap(), doc! {
            "$regexFind": { "input": "$code", "regex": "^a", "options": "i" },
        });
    }

    #[test]
    fn dollar_literals_are_escaped() {
        let expr = Strings::value_of("price").concat("$");
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$concat": ["$price", { "$literal": "$" }],
        });
    }

    #[test]
    fn replace_and_substr() {
        let replace = Strings::value_of("s").replace_all("-", "_");
        let substr = Strings::value_of("s").substr_cp(0, 3);

        assert_eq!(replace.to_document(&NoOpContext).unwrap(), doc! {
            "$replaceAll": { "input": "$s", "find": "-", "replacement": "_" },
        });
        assert_eq!(substr.to_document(&NoOpContext).unwrap(), doc! {
            "$substrCP": ["$s", 0_i64, 3_i64],
        });
    }
}
