//! Errors produced while rendering pipelines and talking to the server.
//!
//! Every error carries a structured `ErrorKind`. Wrapping an error in a
//! more descriptive one keeps the kind of the innermost cause, so callers
//! can match on what actually went wrong regardless of how many layers of
//! context were added on the way up.

use std::fmt;
use std::error::Error as StdError;
use std::borrow::Cow;
use bson::document::ValueAccessError;
use backtrace::Backtrace;

/// Errors that know their `ErrorKind` and may hold a backtrace.
#[allow(clippy::module_name_repetitions)]
pub trait ErrorExt: StdError + Send + Sync {
    /// The wrapped error, as a trait object that keeps the kind and backtrace.
    fn reason(&self) -> Option<&(dyn ErrorExt + 'static)> {
        None
    }

    /// The backtrace recorded closest to the point of failure.
    fn backtrace(&self) -> Option<&Backtrace> {
        self.reason()?.backtrace()
    }

    /// What went wrong, in machine-readable form.
    fn kind(&self) -> ErrorKind;

    /// Upcast helper for `std::error::Error::source()`.
    fn as_std_error(&self) -> &(dyn StdError + 'static);
}

/// Adds a message on top of a failed `Result`.
pub trait ResultExt<T>: Sized {
    /// Wraps the error, if any, into a new `Error` with the given message.
    /// The kind of the original error is kept.
    ///
    /// ```
    /// # use papaya::error::{ Error, ErrorKind, ErrorExt, Result, ResultExt };
    /// #
    /// # fn main() -> Result<()> {
    /// let ok: Result<_> = Ok(42);
    /// assert_eq!(ok.chain("never shown")?, 42);
    ///
    /// let err: Result<i32> = Err(Error::new(ErrorKind::InvalidReference, "no such field"));
    /// let err = err.chain("can't render $sort").unwrap_err();
    /// assert_eq!(err.message(), "can't render $sort");
    /// assert_eq!(err.kind(), ErrorKind::InvalidReference);
    /// # Ok(())
    /// # }
    /// ```
    fn chain<M: ErrMsg>(self, message: M) -> Result<T>;
}

/// A message, or something that lazily produces one.
pub trait ErrMsg: Sized {
    /// Produces the message.
    fn into_message(self) -> Cow<'static, str>;
}

/// `Result` with the error type fixed to `papaya::error::Error`.
pub type Result<T> = std::result::Result<T, Error>;

impl<T, E: ErrorExt + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn chain<M: ErrMsg>(self, message: M) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(cause) => Err(Error::with_cause(message.into_message(), cause)),
        }
    }
}

impl ErrMsg for &'static str {
    fn into_message(self) -> Cow<'static, str> {
        self.into()
    }
}

impl<F: FnOnce() -> String> ErrMsg for F {
    fn into_message(self) -> Cow<'static, str> {
        self().into()
    }
}

/// The category of an `Error`.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Empty or malformed field name.
    InvalidField,
    /// The field isn't visible after the previous stage.
    InvalidReference,
    /// The property path isn't part of the mapped input type.
    UnknownProperty,
    /// An operator got missing or contradictory arguments.
    InvalidExpression,
    /// A stage got invalid arguments, or appears where it is not allowed.
    InvalidStage,
    /// Stage ordering is invalid, e.g. `$out` followed by other stages.
    InvalidPipeline,
    /// Converting to or from JSON failed.
    JsonTranscoding,
    /// Serializing a value into BSON failed.
    BsonEncoding,
    /// Deserializing BSON, or parsing a BSON literal, failed.
    BsonDecoding,
    /// The document has no value under the requested key.
    MissingDocumentField,
    /// The document has a value under the key, of the wrong type.
    IllTypedDocumentField,
    /// Reported by the driver or the server.
    MongoDbError,
}

impl ErrorKind {
    /// Short description, used as the prefix of `Error`'s `Display` output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidField          => "invalid field",
            ErrorKind::InvalidReference      => "invalid field reference",
            ErrorKind::UnknownProperty       => "unknown property",
            ErrorKind::InvalidExpression     => "invalid aggregation expression",
            ErrorKind::InvalidStage          => "invalid pipeline stage",
            ErrorKind::InvalidPipeline       => "invalid pipeline",
            ErrorKind::JsonTranscoding       => "JSON transcoding error",
            ErrorKind::BsonEncoding          => "BSON encoding error",
            ErrorKind::BsonDecoding          => "BSON decoding error",
            ErrorKind::MissingDocumentField  => "document field not found",
            ErrorKind::IllTypedDocumentField => "document field of unexpected type",
            ErrorKind::MongoDbError          => "MongoDB error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type of every fallible operation in this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    cause: Option<Box<dyn ErrorExt>>,
    /// Only recorded when the cause doesn't already have one.
    backtrace: Option<Backtrace>,
}

impl Error {
    /// A fresh error without a cause. Captures a backtrace.
    ///
    /// ```
    /// # use std::error::Error as StdError;
    /// # use papaya::error::{ Error, ErrorKind, ErrorExt };
    /// #
    /// let error = Error::new(ErrorKind::InvalidStage, "$limit must be positive");
    /// assert_eq!(error.kind(), ErrorKind::InvalidStage);
    /// assert_eq!(error.message(), "$limit must be positive");
    /// assert!(error.source().is_none());
    /// ```
    pub fn new<S: Into<Cow<'static, str>>>(kind: ErrorKind, message: S) -> Self {
        Error {
            kind,
            message: message.into(),
            cause: None,
            backtrace: Some(Backtrace::new()),
        }
    }

    /// Wraps `cause`, taking over its kind.
    pub fn with_cause<S, E>(message: S, cause: E) -> Self
        where S: Into<Cow<'static, str>>,
              E: ErrorExt + 'static
    {
        let backtrace = match cause.backtrace() {
            Some(_) => None,
            None => Some(Backtrace::new()),
        };

        Error {
            kind: cause.kind(),
            message: message.into(),
            cause: Some(Box::new(cause)),
            backtrace,
        }
    }

    /// This error's own message. Causes are not included.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The kind of the innermost cause.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl ErrorExt for Error {
    fn reason(&self) -> Option<&(dyn ErrorExt + 'static)> {
        self.cause.as_deref()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        match self.reason().and_then(ErrorExt::backtrace) {
            Some(inner) => Some(inner),
            None => self.backtrace.as_ref(),
        }
    }

    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn as_std_error(&self) -> &(dyn StdError + 'static) {
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        match self.cause {
            Some(ref cause) => write!(f, ", caused by: {}", cause),
            None => Ok(()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|cause| cause.as_std_error())
    }
}

impl ErrorExt for ValueAccessError {
    fn kind(&self) -> ErrorKind {
        if let ValueAccessError::NotPresent = *self {
            ErrorKind::MissingDocumentField
        } else {
            ErrorKind::IllTypedDocumentField
        }
    }

    fn as_std_error(&self) -> &(dyn StdError + 'static) {
        self
    }
}

impl From<ValueAccessError> for Error {
    fn from(error: ValueAccessError) -> Self {
        let message = error.kind().as_str();
        Error::with_cause(message, error)
    }
}

/// `From` conversion and `ErrorKind` for a foreign error type.
macro_rules! impl_error_type {
    ($($ty:path => $kind:ident;)*) => {$(
        impl ErrorExt for $ty {
            fn kind(&self) -> ErrorKind {
                ErrorKind::$kind
            }

            fn as_std_error(&self) -> &(dyn StdError + 'static) {
                self
            }
        }

        impl From<$ty> for Error {
            fn from(error: $ty) -> Self {
                Error::with_cause(ErrorKind::$kind.as_str(), error)
            }
        }
    )*}
}

impl_error_type! {
    serde_json::Error => JsonTranscoding;
    bson::ser::Error => BsonEncoding;
    bson::de::Error => BsonDecoding;
    mongodb::error::Error => MongoDbError;
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use super::*;

    #[test]
    fn with_cause_inherits_kind_and_backtrace() {
        let cause = Error::new(ErrorKind::UnknownProperty, "no property `foo`");
        let error = Error::with_cause("can't render $project", cause);

        assert_eq!(error.kind(), ErrorKind::UnknownProperty);
        assert_eq!(error.message(), "can't render $project");
        assert!(error.backtrace.is_none());
        assert!(ErrorExt::backtrace(&error).is_some());
        assert!(error.source().is_some());
        assert_eq!(
            error.to_string(),
            "unknown property: can't render $project, caused by: unknown property: no property `foo`"
        );
    }

    #[test]
    fn value_access_error_kinds() {
        let missing: Error = ValueAccessError::NotPresent.into();
        let ill_typed: Error = ValueAccessError::UnexpectedType.into();

        assert_eq!(missing.kind(), ErrorKind::MissingDocumentField);
        assert_eq!(missing.message(), "document field not found");
        assert_eq!(ill_typed.kind(), ErrorKind::IllTypedDocumentField);
    }

    #[test]
    fn chain_with_closure_message() {
        let result: Result<()> = Err(Error::new(ErrorKind::InvalidStage, "inner"));
        let error = result.chain(|| format!("stage #{} is broken", 3)).unwrap_err();

        assert_eq!(error.message(), "stage #3 is broken");
        assert_eq!(error.kind(), ErrorKind::InvalidStage);
    }
}
