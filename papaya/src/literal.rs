//! Small value types that stand in for the magic numbers and strings of the
//! aggregation language: sort directions, BSON type aliases and regex
//! option letters.

use std::fmt;
use std::str::FromStr;
use bson::Bson;
use serde::ser::{ Serialize, Serializer, Error as SerError };
use serde::de::{ Deserialize, Deserializer, Error as DeError };
use crate::error::{ Error, ErrorKind };

/// Sort direction of a `$sort` key.
///
/// ```
/// # use bson::doc;
/// # use papaya::literal::Order;
/// #
/// assert_eq!(doc! { "total": Order::Descending, "_id": Order::Ascending },
///            doc! { "total": -1, "_id": 1 });
/// assert_eq!(Order::Ascending.reverse(), Order::Descending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Order {
    /// Smaller values first.
    #[default]
    Ascending = 1,
    /// Greater values first.
    Descending = -1,
}

impl Order {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Order::Ascending => Order::Descending,
            Order::Descending => Order::Ascending,
        }
    }

    /// Reads a direction from a numeric BSON value, `1` or `-1`.
    #[allow(clippy::float_cmp)]
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match *value {
            Bson::Int32(1) | Bson::Int64(1) => Some(Order::Ascending),
            Bson::Int32(-1) | Bson::Int64(-1) => Some(Order::Descending),
            Bson::Double(n) if n == 1.0 => Some(Order::Ascending),
            Bson::Double(n) if n == -1.0 => Some(Order::Descending),
            _ => None,
        }
    }
}

impl From<Order> for Bson {
    fn from(order: Order) -> Self {
        Bson::Int32(order as i32)
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(*self as i32)
    }
}

/// ```
/// # use bson::{ Bson, from_bson };
/// # use papaya::literal::Order;
/// #
/// assert_eq!(from_bson::<Order>(Bson::Int64(-1)).unwrap(), Order::Descending);
/// assert_eq!(from_bson::<Order>(Bson::Double(1.0)).unwrap(), Order::Ascending);
/// assert!(from_bson::<Order>(Bson::Int32(0)).is_err());
/// assert!(from_bson::<Order>(Bson::from("asc")).is_err());
/// ```
impl<'a> Deserialize<'a> for Order {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Bson::deserialize(deserializer)?;

        Order::from_bson(&value).ok_or_else(|| D::Error::custom(
            format!("invalid sort direction {}, expected 1 or -1", value)
        ))
    }
}

bitflags! {
    /// BSON types, as accepted by the `$type` query operator and the
    /// `$convert` expression. A single flag renders as its alias, several
    /// flags as an array of aliases.
    ///
    /// ```
    /// # use bson::bson;
    /// # use papaya::literal::BsonType;
    /// #
    /// assert_eq!(bson!({ "$type": BsonType::OBJECT_ID }), bson!({ "$type": "objectId" }));
    /// assert_eq!(bson!({ "$type": BsonType::STRING | BsonType::NULL }),
    ///            bson!({ "$type": ["null", "string"] }));
    /// ```
    pub struct BsonType: u16 {
        /// `null`
        const NULL                  = 1 << 0;
        /// `bool`
        const BOOL                  = 1 << 1;
        /// `double`
        const DOUBLE                = 1 << 2;
        /// `int`, 32 bits.
        const INT                   = 1 << 3;
        /// `long`, 64 bits.
        const LONG                  = 1 << 4;
        /// `decimal`, 128 bits.
        const DECIMAL               = 1 << 5;
        /// Every numeric type. Aliased `number` by `$type` queries.
        const NUMBER                = Self::DOUBLE.bits | Self::INT.bits | Self::LONG.bits | Self::DECIMAL.bits;
        /// `objectId`
        const OBJECT_ID             = 1 << 6;
        /// `timestamp`
        const TIMESTAMP             = 1 << 7;
        /// `date`
        const DATE                  = 1 << 8;
        /// `string`
        const STRING                = 1 << 9;
        /// `regex`
        const REGEX                 = 1 << 10;
        /// `binData`
        const BINARY                = 1 << 11;
        /// `array`
        const ARRAY                 = 1 << 12;
        /// `object`
        const DOCUMENT              = 1 << 13;
        /// `javascript`
        const JAVASCRIPT            = 1 << 14;
        /// `javascriptWithScope`
        const JAVASCRIPT_WITH_SCOPE = 1 << 15;
    }
}

impl Default for BsonType {
    fn default() -> Self {
        BsonType::NULL
    }
}

impl BsonType {
    /// Alias of every single-flag type.
    const ALIASES: &'static [(BsonType, &'static str)] = &[
        (BsonType::NULL,                  "null"),
        (BsonType::BOOL,                  "bool"),
        (BsonType::DOUBLE,                "double"),
        (BsonType::INT,                   "int"),
        (BsonType::LONG,                  "long"),
        (BsonType::DECIMAL,               "decimal"),
        (BsonType::OBJECT_ID,             "objectId"),
        (BsonType::TIMESTAMP,             "timestamp"),
        (BsonType::DATE,                  "date"),
        (BsonType::STRING,                "string"),
        (BsonType::REGEX,                 "regex"),
        (BsonType::BINARY,                "binData"),
        (BsonType::ARRAY,                 "array"),
        (BsonType::DOCUMENT,              "object"),
        (BsonType::JAVASCRIPT,            "javascript"),
        (BsonType::JAVASCRIPT_WITH_SCOPE, "javascriptWithScope"),
    ];

    /// The alias of a single type, `None` for zero or several flags.
    ///
    /// ```
    /// # use papaya::literal::BsonType;
    /// #
    /// assert_eq!(BsonType::BINARY.alias(), Some("binData"));
    /// assert_eq!(BsonType::NUMBER.alias(), None);
    /// ```
    pub fn alias(self) -> Option<&'static str> {
        Self::ALIASES
            .iter()
            .find(|&&(flag, _)| flag == self)
            .map(|&(_, alias)| alias)
    }

    /// The aliases of the set flags, in flag order.
    pub fn aliases(self) -> Vec<&'static str> {
        Self::ALIASES
            .iter()
            .filter(|&&(flag, _)| self.contains(flag))
            .map(|&(_, alias)| alias)
            .collect()
    }

    /// The rendered form: one alias, or an array of them. `None` if no
    /// flag is set.
    pub fn to_bson(self) -> Option<Bson> {
        match self.alias() {
            Some(alias) => Some(Bson::from(alias)),
            None if self.is_empty() => None,
            None => Some(Bson::Array(self.aliases().into_iter().map(Bson::from).collect())),
        }
    }
}

impl FromStr for BsonType {
    type Err = Error;

    fn from_str(alias: &str) -> Result<Self, Error> {
        if alias == "number" {
            return Ok(BsonType::NUMBER);
        }

        Self::ALIASES
            .iter()
            .find(|&&(_, a)| a == alias)
            .map(|&(flag, _)| flag)
            .ok_or_else(|| Error::new(
                ErrorKind::BsonDecoding,
                format!("unknown BSON type alias '{}'", alias)
            ))
    }
}

/// The empty set renders as `null`; `$type` and `$convert` reject it before
/// it gets this far.
impl From<BsonType> for Bson {
    fn from(bson_type: BsonType) -> Self {
        bson_type.to_bson().unwrap_or(Bson::Null)
    }
}

impl Serialize for BsonType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_bson() {
            Some(value) => value.serialize(serializer),
            None => Err(S::Error::custom("a BSON type set needs at least one type")),
        }
    }
}

impl<'a> Deserialize<'a> for BsonType {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        let aliases = match Bson::deserialize(deserializer)? {
            Bson::String(alias) => vec![Bson::String(alias)],
            Bson::Array(aliases) => aliases,
            other => return Err(D::Error::custom(
                format!("expected a BSON type alias or an array of them, found {}", other)
            )),
        };

        aliases.into_iter().try_fold(BsonType::empty(), |flags, alias| match alias {
            Bson::String(ref alias) => alias
                .parse::<BsonType>()
                .map(|flag| flags | flag)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("invalid BSON type alias {}", other))),
        })
    }
}

bitflags! {
    /// Flags of `$regex` criteria and of `$regexMatch` and friends.
    ///
    /// ```
    /// # use bson::doc;
    /// # use papaya::literal::RegexOpts;
    /// #
    /// let query = doc! {
    ///     "$regex": "^papaya",
    ///     "$options": RegexOpts::IGNORE_CASE | RegexOpts::DOT_NEWLINE,
    /// };
    /// assert_eq!(query, doc! { "$regex": "^papaya", "$options": "is" });
    /// ```
    #[derive(Default)]
    pub struct RegexOpts: u8 {
        /// `i`: case insensitive.
        const IGNORE_CASE = 1 << 0;
        /// `m`: `^` and `$` match at line breaks.
        const LINE_ANCHOR = 1 << 1;
        /// `x`: whitespace and `#` comments in the pattern are ignored.
        const EXTENDED    = 1 << 2;
        /// `s`: `.` matches newlines.
        const DOT_NEWLINE = 1 << 3;
    }
}

impl RegexOpts {
    const LETTERS: &'static [(RegexOpts, char)] = &[
        (RegexOpts::IGNORE_CASE, 'i'),
        (RegexOpts::LINE_ANCHOR, 'm'),
        (RegexOpts::EXTENDED,    'x'),
        (RegexOpts::DOT_NEWLINE, 's'),
    ];

    /// The option letters, in `imxs` order.
    pub fn letters(self) -> String {
        Self::LETTERS
            .iter()
            .filter(|&&(flag, _)| self.contains(flag))
            .map(|&(_, letter)| letter)
            .collect()
    }
}

impl fmt::Display for RegexOpts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

impl FromStr for RegexOpts {
    type Err = Error;

    fn from_str(letters: &str) -> Result<Self, Error> {
        letters.chars().try_fold(RegexOpts::empty(), |options, letter| {
            Self::LETTERS
                .iter()
                .find(|&&(_, l)| l == letter)
                .map(|&(flag, _)| options | flag)
                .ok_or_else(|| Error::new(
                    ErrorKind::BsonDecoding,
                    format!("unknown regex option '{}'", letter)
                ))
        })
    }
}

impl From<RegexOpts> for Bson {
    fn from(options: RegexOpts) -> Self {
        Bson::String(options.letters())
    }
}

impl Serialize for RegexOpts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'a> Deserialize<'a> for RegexOpts {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use bson::{ from_bson, to_bson };
    use super::*;

    #[test]
    fn bson_type_sets_render_as_alias_arrays() {
        let flags = BsonType::STRING | BsonType::LONG;
        let bson = to_bson(&flags).unwrap();

        assert_eq!(bson, Bson::Array(vec!["long".into(), "string".into()]));
        assert_eq!(from_bson::<BsonType>(bson).unwrap(), flags);
        assert_eq!(from_bson::<BsonType>(Bson::from("number")).unwrap(), BsonType::NUMBER);
        assert!(from_bson::<BsonType>(Bson::from("float")).is_err());
    }

    #[test]
    fn empty_bson_type_is_null() {
        assert!(to_bson(&BsonType::empty()).is_err());
        assert_eq!(Bson::from(BsonType::empty()), Bson::Null);
        assert_eq!(BsonType::empty().alias(), None);
    }

    #[test]
    fn regex_options() {
        let opts = RegexOpts::DOT_NEWLINE | RegexOpts::IGNORE_CASE;

        assert_eq!(opts.letters(), "is");
        assert_eq!(Bson::from(RegexOpts::empty()), Bson::from(""));
        assert_eq!("xm".parse::<RegexOpts>().unwrap(), RegexOpts::EXTENDED | RegexOpts::LINE_ANCHOR);
        assert_eq!(from_bson::<RegexOpts>(Bson::from("s")).unwrap(), RegexOpts::DOT_NEWLINE);

        let err = "q".parse::<RegexOpts>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BsonDecoding);
    }

    #[test]
    fn order_reads_only_unit_numbers() {
        assert_eq!(Order::from_bson(&Bson::Int32(-1)), Some(Order::Descending));
        assert_eq!(Order::from_bson(&Bson::Int64(1)), Some(Order::Ascending));
        assert_eq!(Order::from_bson(&Bson::Int64(1 << 40)), None);
        assert_eq!(Order::from_bson(&Bson::Double(0.5)), None);
        assert_eq!(Order::default(), Order::Ascending);
    }
}
