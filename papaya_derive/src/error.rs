//! Errors potentially happening while `#[derive]`ing the mapping traits.

use std::fmt;
use std::error;
use std::result;
use proc_macro2::{ Span, TokenStream };
use quote::ToTokens;
use syn::spanned::Spanned;

/// Returns an `Err(Error)` with a formatted message.
macro_rules! err_fmt {
    ($($arg:tt)*) => {
        Err($crate::error::Error::new(format!($($arg)*)))
    }
}

/// Convenience type alias for a result that holds a `papaya_derive::Error` value.
pub type Result<T> = result::Result<T, Error>;

/// An error that potentially happens while `#[derive]`ing.
#[derive(Debug, Clone)]
pub struct Error {
    /// The error message.
    message: String,
    /// Where the compiler should point.
    span: Span,
}

impl Error {
    /// Creates an `Error` pointing at the derive invocation.
    pub fn new<T: Into<String>>(message: T) -> Self {
        Error {
            message: message.into(),
            span: Span::call_site(),
        }
    }

    /// Creates an `Error` pointing at `tokens`.
    pub fn spanned<S: ToTokens, T: Into<String>>(tokens: &S, message: T) -> Self {
        Error {
            message: message.into(),
            span: tokens.span(),
        }
    }

    /// A `compile_error!` invocation reporting this error.
    pub fn to_compile_error(&self) -> TokenStream {
        syn::Error::new(self.span, &self.message).to_compile_error()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl error::Error for Error {}

impl From<syn::Error> for Error {
    fn from(error: syn::Error) -> Self {
        Error {
            message: error.to_string(),
            span: error.span(),
        }
    }
}
