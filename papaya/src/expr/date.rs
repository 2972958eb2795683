//! Date expression operators.

use std::fmt;
use super::{ Expr, Operand };

/// Units for `$dateAdd`, `$dateDiff` and `$dateTrunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeUnit {
    /// Calendar years.
    Year,
    /// Quarters of a year.
    Quarter,
    /// Calendar months.
    Month,
    /// Weeks.
    Week,
    /// Days.
    Day,
    /// Hours.
    Hour,
    /// Minutes.
    Minute,
    /// Seconds.
    Second,
    /// Milliseconds.
    Millisecond,
}

impl TimeUnit {
    /// The name the server expects.
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Year        => "year",
            TimeUnit::Quarter     => "quarter",
            TimeUnit::Month       => "month",
            TimeUnit::Week        => "week",
            TimeUnit::Day         => "day",
            TimeUnit::Hour        => "hour",
            TimeUnit::Minute      => "minute",
            TimeUnit::Second      => "second",
            TimeUnit::Millisecond => "millisecond",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TimeUnit> for Operand {
    fn from(unit: TimeUnit) -> Self {
        Operand::value(unit.as_str())
    }
}

/// Factory for date operators applied to a subject operand.
///
/// Component extraction renders the short form `{ "$year": "$date" }`; the
/// `..._in` variants add a literal timezone and render
/// `{ "$year": { "date": "$date", "timezone": "..." } }`. The `..._in_zone_of`
/// variants take the timezone from an operand, e.g. a field.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::{ AggregationExpression, Dates, TimeUnit };
/// #
/// let year = Dates::value_of("placed").year();
/// let local_hour = Dates::value_of("placed").hour_in("Europe/Budapest");
/// let due = Dates::value_of("placed").add(30, TimeUnit::Day);
///
/// assert_eq!(year.to_document(&NoOpContext).unwrap(), doc! { "$year": "$placed" });
/// assert_eq!(local_hour.to_document(&NoOpContext).unwrap(), doc! {
///     "$hour": { "date": "$placed", "timezone": "Europe/Budapest" },
/// });
/// assert_eq!(due.to_document(&NoOpContext).unwrap(), doc! {
///     "$dateAdd": { "startDate": "$placed", "unit": "day", "amount": 30 },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Dates(Operand);

/// Defines a plain and two timezone-aware extraction methods per operator.
macro_rules! date_parts {
    ($($name:ident, $name_in:ident, $name_in_zone_of:ident => $op:expr,)*) => {$(
        #[doc = concat!("`", $op, "`")]
        pub fn $name(self) -> Expr {
            Expr::new($op, self.0)
        }

        #[doc = concat!("`", $op, "` in the given timezone.")]
        pub fn $name_in(self, timezone: &str) -> Expr {
            self.$name_in_zone_of(Operand::value(timezone))
        }

        #[doc = concat!("`", $op, "` in the timezone `timezone` evaluates to.")]
        pub fn $name_in_zone_of<O: Into<Operand>>(self, timezone: O) -> Expr {
            Expr::named($op)
                .with_arg("date", self.0)
                .with_arg("timezone", timezone)
        }
    )*}
}

impl Dates {
    /// Starts an expression on `operand`.
    pub fn value_of<O: Into<Operand>>(operand: O) -> Self {
        Dates(operand.into())
    }

    date_parts! {
        year, year_in, year_in_zone_of => "$year",
        month, month_in, month_in_zone_of => "$month",
        day_of_month, day_of_month_in, day_of_month_in_zone_of => "$dayOfMonth",
        day_of_week, day_of_week_in, day_of_week_in_zone_of => "$dayOfWeek",
        day_of_year, day_of_year_in, day_of_year_in_zone_of => "$dayOfYear",
        hour, hour_in, hour_in_zone_of => "$hour",
        minute, minute_in, minute_in_zone_of => "$minute",
        second, second_in, second_in_zone_of => "$second",
        millisecond, millisecond_in, millisecond_in_zone_of => "$millisecond",
        week, week_in, week_in_zone_of => "$week",
        iso_week, iso_week_in, iso_week_in_zone_of => "$isoWeek",
        iso_week_year, iso_week_year_in, iso_week_year_in_zone_of => "$isoWeekYear",
        iso_day_of_week, iso_day_of_week_in, iso_day_of_week_in_zone_of => "$isoDayOfWeek",
    }

    /// `$dateToString` with the given format.
    pub fn to_string(self, format: &str) -> Expr {
        Expr::named("$dateToString")
            .with_arg("format", Operand::value(format))
            .with_arg("date", self.0)
    }

    /// `$dateToString` with the given format, in the given timezone.
    pub fn to_string_in(self, format: &str, timezone: &str) -> Expr {
        self.to_string_in_zone_of(format, Operand::value(timezone))
    }

    /// `$dateToString` with the given format, in the timezone `timezone`
    /// evaluates to.
    pub fn to_string_in_zone_of<O: Into<Operand>>(self, format: &str, timezone: O) -> Expr {
        self.to_string(format).with_arg("timezone", timezone)
    }

    /// `$dateFromString`, parsing the subject.
    pub fn from_string(self) -> Expr {
        Expr::named("$dateFromString").with_arg("dateString", self.0)
    }

    /// `$dateFromString` with an explicit format.
    pub fn from_string_with_format(self, format: &str) -> Expr {
        self.from_string().with_arg("format", Operand::value(format))
    }

    /// `$dateAdd`
    pub fn add<A: Into<Operand>>(self, amount: A, unit: TimeUnit) -> Expr {
        Expr::named("$dateAdd")
            .with_arg("startDate", self.0)
            .with_arg("unit", unit)
            .with_arg("amount", amount)
    }

    /// `$dateDiff` from the subject to `end`.
    pub fn diff<E: Into<Operand>>(self, end: E, unit: TimeUnit) -> Expr {
        Expr::named("$dateDiff")
            .with_arg("startDate", self.0)
            .with_arg("endDate", end)
            .with_arg("unit", unit)
    }

    /// `$dateTrunc`
    pub fn trunc(self, unit: TimeUnit) -> Expr {
        Expr::named("$dateTrunc")
            .with_arg("date", self.0)
            .with_arg("unit", unit)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use crate::context::NoOpContext;
    use crate::expr::AggregationExpression;
    use super::*;

    #[test]
    fn to_string_with_timezone() {
        let expr = Dates::value_of("at").to_string_in("%Y-%m-%d", "UTC");
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$dateToString": { "format": "%Y-%m-%d", "date": "$at", "timezone": "UTC" },
        });
    }

    #[test]
    fn timezone_from_a_field() {
        let hour = Dates::value_of("at").hour_in_zone_of("$tz");
        let day = Dates::value_of("at").to_string_in_zone_of("%F", "store.zone");

        assert_eq!(hour.to_document(&NoOpContext).unwrap(), doc! {
            "$hour": { "date": "$at", "timezone": "$tz" },
        });
        assert_eq!(day.to_document(&NoOpContext).unwrap(), doc! {
            "$dateToString": { "format": "%F", "date": "$at", "timezone": "$store.zone" },
        });
        assert_eq!(Dates::value_of("at").hour_in("$tz").to_document(&NoOpContext).unwrap(), doc! {
            "$hour": { "date": "$at", "timezone": { "$literal": "$tz" } },
        });
    }

    #[test]
    fn diff_between_fields() {
        let expr = Dates::value_of("start").diff("end", TimeUnit::Hour);
        assert_eq!(expr.to_document(&NoOpContext).unwrap(), doc! {
            "$dateDiff": { "startDate": "$start", "endDate": "$end", "unit": "hour" },
        });
    }

    #[test]
    fn trunc_and_parse() {
        let trunc = Dates::value_of("at").trunc(TimeUnit::Month);
        let parsed = Dates::value_of("raw").from_string_with_format("%d/%m/%Y");

        assert_eq!(trunc.to_document(&NoOpContext).unwrap(), doc! {
            "$dateTrunc": { "date": "$at", "unit": "month" },
        });
        assert_eq!(parsed.to_document(&NoOpContext).unwrap(), doc! {
            "$dateFromString": { "dateString": "$raw", "format": "%d/%m/%Y" },
        });
    }
}
