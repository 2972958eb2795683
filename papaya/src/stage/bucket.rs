//! `$bucket`, `$bucketAuto` and `$sortByCount`.

use std::cmp::Ordering;
use bson::{ Bson, Document };
use crate::bsn::compare_values;
use crate::context::AggregationOperationContext;
use crate::expr::Operand;
use crate::fields::{ ExposedFields, Fields, ID };
use crate::error::{ Error, ErrorKind, Result };
use super::{ AggregationOperation, Exposure, render_entries, stage_document, validate_output_name };

/// The output field of buckets without explicit outputs.
const DEFAULT_COUNT_FIELD: &str = "count";

/// Adds an output to a list, replacing one with the same name.
fn put_output(outputs: &mut Vec<(String, Operand)>, name: &str, value: Operand) {
    match outputs.iter_mut().find(|(n, _)| n == name) {
        Some(entry) => entry.1 = value,
        None => outputs.push((name.to_owned(), value)),
    }
}

/// Renders the `output` document, if there are outputs.
fn render_outputs(
    operator: &str,
    ctx: &dyn AggregationOperationContext,
    outputs: &[(String, Operand)],
    body: &mut Document,
) -> Result<()> {
    if outputs.is_empty() {
        return Ok(());
    }

    for (name, _) in outputs {
        validate_output_name(operator, name)?;
    }

    body.insert("output", render_entries(ctx, outputs)?);
    Ok(())
}

/// `_id` plus the outputs, or `count` if there are none.
fn bucket_exposure(outputs: &[(String, Operand)]) -> Exposure {
    let names: Vec<&str> = if outputs.is_empty() {
        vec![ID, DEFAULT_COUNT_FIELD]
    } else {
        Some(ID).into_iter().chain(outputs.iter().map(|(name, _)| name.as_str())).collect()
    };

    Exposure::Replaced(ExposedFields::synthetic(Fields::from_names(names)))
}

/// Groups documents into buckets between fixed boundaries.
///
/// Boundaries must be at least two, of comparable types, and strictly
/// ascending.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::expr::Accumulators;
/// # use papaya::stage::{ AggregationOperation, BucketOperation };
/// #
/// let by_price = BucketOperation::new("price", vec![0, 200, 400])
///     .default_bucket("Other")
///     .output("count", Accumulators::count())
///     .output("titles", Accumulators::value_of("title").push());
///
/// assert_eq!(by_price.to_document(&NoOpContext).unwrap(), doc! {
///     "$bucket": {
///         "groupBy": "$price",
///         "boundaries": [0, 200, 400],
///         "default": "Other",
///         "output": {
///             "count": { "$sum": 1 },
///             "titles": { "$push": "$title" },
///         },
///     }
/// });
///
/// assert!(BucketOperation::new("price", vec![400, 200]).to_document(&NoOpContext).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BucketOperation {
    group_by: Operand,
    boundaries: Vec<Bson>,
    default: Option<Bson>,
    outputs: Vec<(String, Operand)>,
}

impl BucketOperation {
    /// Buckets by `group_by` between `boundaries`.
    pub fn new<O, I>(group_by: O, boundaries: I) -> Self
        where O: Into<Operand>,
              I: IntoIterator,
              I::Item: Into<Bson>
    {
        BucketOperation {
            group_by: group_by.into(),
            boundaries: boundaries.into_iter().map(Into::into).collect(),
            default: None,
            outputs: Vec::new(),
        }
    }

    /// The `_id` of the bucket collecting values outside the boundaries.
    pub fn default_bucket<V: Into<Bson>>(mut self, id: V) -> Self {
        self.default = Some(id.into());
        self
    }

    /// Computes the output field `name`, usually with an accumulator.
    pub fn output<O: Into<Operand>>(mut self, name: &str, value: O) -> Self {
        put_output(&mut self.outputs, name, value.into());
        self
    }

    fn validate_boundaries(&self) -> Result<()> {
        if self.boundaries.len() < 2 {
            return Err(Error::new(ErrorKind::InvalidStage, "$bucket needs at least two boundaries"));
        }

        for pair in self.boundaries.windows(2) {
            if compare_values(&pair[0], &pair[1]) != Some(Ordering::Less) {
                return Err(Error::new(
                    ErrorKind::InvalidStage,
                    format!("$bucket boundaries must be ascending, found {} before {}", pair[0], pair[1])
                ));
            }
        }

        Ok(())
    }
}

impl AggregationOperation for BucketOperation {
    fn operator(&self) -> &'static str {
        "$bucket"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        self.validate_boundaries()?;

        let mut body = Document::new();
        body.insert("groupBy", self.group_by.render(ctx)?);
        body.insert("boundaries", self.boundaries.clone());

        if let Some(ref default) = self.default {
            body.insert("default", default.clone());
        }

        render_outputs(self.operator(), ctx, &self.outputs, &mut body)?;

        Ok(stage_document(self.operator(), body))
    }

    fn exposure(&self) -> Exposure {
        bucket_exposure(&self.outputs)
    }
}

/// Preferred number series for `$bucketAuto` boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Renard series R5.
    R5,
    /// Renard series R10.
    R10,
    /// Renard series R20.
    R20,
    /// Renard series R40.
    R40,
    /// Renard series R80.
    R80,
    /// 1, 2, 5, 10, 20, 50, ...
    #[serde(rename = "1-2-5")]
    OneTwoFive,
    /// E-series E6.
    E6,
    /// E-series E12.
    E12,
    /// E-series E24.
    E24,
    /// E-series E48.
    E48,
    /// E-series E96.
    E96,
    /// E-series E192.
    E192,
    /// Powers of two.
    #[serde(rename = "POWERSOF2")]
    PowersOf2,
}

impl Granularity {
    /// The name the server knows the series by.
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::R5         => "R5",
            Granularity::R10        => "R10",
            Granularity::R20        => "R20",
            Granularity::R40        => "R40",
            Granularity::R80        => "R80",
            Granularity::OneTwoFive => "1-2-5",
            Granularity::E6         => "E6",
            Granularity::E12        => "E12",
            Granularity::E24        => "E24",
            Granularity::E48        => "E48",
            Granularity::E96        => "E96",
            Granularity::E192       => "E192",
            Granularity::PowersOf2  => "POWERSOF2",
        }
    }
}

/// Groups documents into a given number of evenly filled buckets.
///
/// ```
/// # use bson::doc;
/// # use papaya::context::NoOpContext;
/// # use papaya::stage::{ AggregationOperation, BucketAutoOperation, Granularity };
/// #
/// let auto = BucketAutoOperation::new("price", 4).granularity(Granularity::R10);
/// assert_eq!(auto.to_document(&NoOpContext).unwrap(), doc! {
///     "$bucketAuto": { "groupBy": "$price", "buckets": 4, "granularity": "R10" },
/// });
/// ```
#[derive(Debug, Clone)]
pub struct BucketAutoOperation {
    group_by: Operand,
    buckets: u32,
    granularity: Option<Granularity>,
    outputs: Vec<(String, Operand)>,
}

impl BucketAutoOperation {
    /// Buckets by `group_by` into `buckets` buckets.
    pub fn new<O: Into<Operand>>(group_by: O, buckets: u32) -> Self {
        BucketAutoOperation {
            group_by: group_by.into(),
            buckets,
            granularity: None,
            outputs: Vec::new(),
        }
    }

    /// Rounds the boundaries to a preferred number series.
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Computes the output field `name`, usually with an accumulator.
    pub fn output<O: Into<Operand>>(mut self, name: &str, value: O) -> Self {
        put_output(&mut self.outputs, name, value.into());
        self
    }
}

impl AggregationOperation for BucketAutoOperation {
    fn operator(&self) -> &'static str {
        "$bucketAuto"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        let buckets = i32::try_from(self.buckets)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| Error::new(
                ErrorKind::InvalidStage,
                format!("$bucketAuto: invalid bucket count {}", self.buckets)
            ))?;

        let mut body = Document::new();
        body.insert("groupBy", self.group_by.render(ctx)?);
        body.insert("buckets", buckets);

        if let Some(granularity) = self.granularity {
            body.insert("granularity", granularity.as_str());
        }

        render_outputs(self.operator(), ctx, &self.outputs, &mut body)?;

        Ok(stage_document(self.operator(), body))
    }

    fn exposure(&self) -> Exposure {
        bucket_exposure(&self.outputs)
    }
}

/// Groups by the value of an expression and sorts the groups by their size,
/// descending. Outputs `_id` and `count`.
#[derive(Debug, Clone)]
pub struct SortByCountOperation(Operand);

impl SortByCountOperation {
    /// `$sortByCount` of `operand`.
    pub fn new<O: Into<Operand>>(operand: O) -> Self {
        SortByCountOperation(operand.into())
    }
}

impl AggregationOperation for SortByCountOperation {
    fn operator(&self) -> &'static str {
        "$sortByCount"
    }

    fn to_document(&self, ctx: &dyn AggregationOperationContext) -> Result<Document> {
        Ok(stage_document(self.operator(), self.0.render(ctx)?))
    }

    fn exposure(&self) -> Exposure {
        bucket_exposure(&[])
    }
}
