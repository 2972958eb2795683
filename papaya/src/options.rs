//! Options controlling how an aggregation is run.
//!
//! Options can be built in code or loaded from configuration, since they
//! (de)serialize with the same camel-cased keys as the `aggregate` command:
//!
//! ```
//! # use std::time::Duration;
//! # use bson::doc;
//! # use papaya::options::{ AggregationOptions, Hint };
//! #
//! let from_code = AggregationOptions::new()
//!     .allow_disk_use(true)
//!     .batch_size(100)
//!     .max_time(Duration::from_secs(2))
//!     .hint(Hint::Name(String::from("status_1")));
//!
//! let from_config: AggregationOptions = serde_json::from_str(r#"{
//!     "allowDiskUse": true,
//!     "batchSize": 100,
//!     "maxTimeMS": 2000,
//!     "hint": "status_1"
//! }"#).unwrap();
//!
//! assert_eq!(from_code, from_config);
//! ```

use std::time::Duration;
use bson::{ Bson, Document };
use mongodb::options::{ AggregateOptions, Collation };
use crate::error::{ Result, ResultExt };

/// The index an aggregation should use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hint {
    /// The name of the index.
    Name(String),
    /// The key specification of the index.
    Keys(Document),
}

impl From<Hint> for Bson {
    fn from(hint: Hint) -> Self {
        match hint {
            Hint::Name(name) => Bson::String(name),
            Hint::Keys(keys) => Bson::Document(keys),
        }
    }
}

impl From<Hint> for mongodb::options::Hint {
    fn from(hint: Hint) -> Self {
        match hint {
            Hint::Name(name) => mongodb::options::Hint::Name(name),
            Hint::Keys(keys) => mongodb::options::Hint::Keys(keys),
        }
    }
}

/// Options of an aggregation. Unset options are left to the server (or to
/// the per-type defaults of `Entity::aggregate_options()`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationOptions {
    /// Lets stages write temporary files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_disk_use: Option<bool>,
    /// Return the query plan instead of the results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<bool>,
    /// Initial batch size of the cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    /// Collation, as a raw collation document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Document>,
    /// Comment attached to the command for profiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Time limit of the command.
    #[serde(rename = "maxTimeMS", skip_serializing_if = "Option::is_none")]
    pub max_time_ms: Option<u64>,
    /// Index hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<Hint>,
    /// Variables accessible as `$$name` in every stage.
    #[serde(rename = "let", skip_serializing_if = "Option::is_none")]
    pub let_vars: Option<Document>,
    /// Whether unknown properties of typed aggregations are errors.
    /// Strict unless set otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_mapping: Option<bool>,
}

impl AggregationOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        AggregationOptions::default()
    }

    /// Sets `allowDiskUse`.
    pub fn allow_disk_use(mut self, allow: bool) -> Self {
        self.allow_disk_use = Some(allow);
        self
    }

    /// Sets `explain`.
    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = Some(explain);
        self
    }

    /// Sets the cursor batch size.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sets the collation document.
    pub fn collation(mut self, collation: Document) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Sets the comment.
    pub fn comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets `maxTimeMS`, saturating at `u64::MAX` milliseconds.
    pub fn max_time(mut self, limit: Duration) -> Self {
        self.max_time_ms = Some(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the index hint.
    pub fn hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Sets the pipeline variables.
    pub fn let_vars(mut self, vars: Document) -> Self {
        self.let_vars = Some(vars);
        self
    }

    /// Unknown properties of typed aggregations are errors.
    pub fn strict_mapping(mut self) -> Self {
        self.strict_mapping = Some(true);
        self
    }

    /// Unknown properties of typed aggregations are used as they are.
    pub fn relaxed_mapping(mut self) -> Self {
        self.strict_mapping = Some(false);
        self
    }

    /// Whether unknown properties of typed aggregations are errors.
    pub fn is_strict_mapping(&self) -> bool {
        self.strict_mapping.unwrap_or(true)
    }

    /// Whether the plan is requested instead of the results.
    pub fn is_explain(&self) -> bool {
        self.explain.unwrap_or(false)
    }

    /// Fills the options not set in `self` from `defaults`.
    pub fn or(self, defaults: AggregationOptions) -> Self {
        AggregationOptions {
            allow_disk_use: self.allow_disk_use.or(defaults.allow_disk_use),
            explain: self.explain.or(defaults.explain),
            batch_size: self.batch_size.or(defaults.batch_size),
            collation: self.collation.or(defaults.collation),
            comment: self.comment.or(defaults.comment),
            max_time_ms: self.max_time_ms.or(defaults.max_time_ms),
            hint: self.hint.or(defaults.hint),
            let_vars: self.let_vars.or(defaults.let_vars),
            strict_mapping: self.strict_mapping.or(defaults.strict_mapping),
        }
    }

    /// Appends the options to an `aggregate` command that already holds
    /// `aggregate` and `pipeline`. `cursor` is always present unless the
    /// plan is requested.
    pub fn apply_to_command(&self, command: &mut Document) {
        if let Some(allow) = self.allow_disk_use {
            command.insert("allowDiskUse", allow);
        }

        if self.is_explain() {
            command.insert("explain", true);
        } else {
            let mut cursor = Document::new();

            if let Some(size) = self.batch_size {
                cursor.insert("batchSize", i64::from(size));
            }

            command.insert("cursor", cursor);
        }

        if let Some(ref collation) = self.collation {
            command.insert("collation", collation.clone());
        }
        if let Some(ref comment) = self.comment {
            command.insert("comment", comment.as_str());
        }
        if let Some(ms) = self.max_time_ms {
            command.insert("maxTimeMS", i64::try_from(ms).unwrap_or(i64::MAX));
        }
        if let Some(ref hint) = self.hint {
            command.insert("hint", hint.clone());
        }
        if let Some(ref vars) = self.let_vars {
            command.insert("let", vars.clone());
        }
    }

    /// Converts into the options of the driver. `explain` and the mapping
    /// mode have no driver counterpart.
    pub fn to_driver_options(&self) -> Result<AggregateOptions> {
        let mut options = AggregateOptions::default();

        options.allow_disk_use = self.allow_disk_use;
        options.batch_size = self.batch_size;
        options.comment = self.comment.clone().map(Into::into);
        options.max_time = self.max_time_ms.map(Duration::from_millis);
        options.hint = self.hint.clone().map(Into::into);
        options.let_vars = self.let_vars.clone();
        options.collation = match self.collation {
            Some(ref doc) => Some(
                bson::from_document::<Collation>(doc.clone()).chain("invalid collation")?
            ),
            None => None,
        };

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::*;

    #[test]
    fn command_without_options_has_empty_cursor() {
        let mut command = doc! { "aggregate": "orders", "pipeline": [] };
        AggregationOptions::new().apply_to_command(&mut command);

        assert_eq!(command, doc! {
            "aggregate": "orders",
            "pipeline": [],
            "cursor": {},
        });
    }

    #[test]
    fn explain_omits_cursor() {
        let mut command = doc! { "aggregate": "orders", "pipeline": [] };
        let options = AggregationOptions::new()
            .explain(true)
            .batch_size(10)
            .comment("plan")
            .hint(Hint::Keys(doc! { "status": 1 }))
            .let_vars(doc! { "limit": 5 });

        options.apply_to_command(&mut command);

        assert_eq!(command, doc! {
            "aggregate": "orders",
            "pipeline": [],
            "explain": true,
            "comment": "plan",
            "hint": { "status": 1 },
            "let": { "limit": 5 },
        });
    }

    #[test]
    fn explicit_options_win_over_defaults() {
        let defaults = AggregationOptions::new().allow_disk_use(true).batch_size(50).relaxed_mapping();
        let options = AggregationOptions::new().batch_size(10).or(defaults);

        assert_eq!(options.allow_disk_use, Some(true));
        assert_eq!(options.batch_size, Some(10));
        assert!(!options.is_strict_mapping());
        assert!(AggregationOptions::new().is_strict_mapping());
    }

    #[test]
    fn driver_options() {
        let options = AggregationOptions::new()
            .allow_disk_use(true)
            .max_time(Duration::from_millis(1500))
            .collation(doc! { "locale": "en", "strength": 2 })
            .to_driver_options()
            .unwrap();

        assert_eq!(options.allow_disk_use, Some(true));
        assert_eq!(options.max_time, Some(Duration::from_millis(1500)));
        assert_eq!(options.collation.map(|c| c.locale), Some(String::from("en")));
    }
}
