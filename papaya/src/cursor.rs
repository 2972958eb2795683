//! Typed, generic wrapper around the driver's aggregation cursors.

use std::marker::PhantomData;
use std::fmt::{ self, Write };
use serde::de::DeserializeOwned;
use bson::{ Bson, Document, from_document };
use crate::error::{ Error, ErrorKind, Result, ResultExt };

/// Yields the result documents of an aggregation, deserialized as `T`.
pub struct Cursor<T> {
    /// The underlying driver cursor.
    inner: mongodb::sync::Cursor<Document>,
    /// Just here so that the type parameter is used.
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Cursor<T> {
    /// Wraps an untyped driver cursor.
    pub fn new(inner: mongodb::sync::Cursor<Document>) -> Self {
        Cursor {
            inner,
            _marker: PhantomData,
        }
    }

    /// Collects the remaining documents.
    pub fn collect_all(self) -> Result<Vec<T>> {
        self.collect()
    }
}

/// Deserializes a single result document, unless it reports an error.
pub(crate) fn deserialize_one<T: DeserializeOwned>(mut doc: Document) -> Result<T> {
    // The server may report a failure as a regular document.
    if let Some(Bson::String(mut errmsg)) = doc.remove("$err") {
        if let Ok(code) = doc.get_i32("code") {
            write!(errmsg, " (code: {})", code).ok();
        } else if let Ok(code) = doc.get_i64("code") {
            write!(errmsg, " (code: {})", code).ok();
        }

        return Err(Error::new(ErrorKind::MongoDbError, errmsg));
    }

    from_document(doc).chain("can't deserialize aggregation result")
}

impl<T: DeserializeOwned> Iterator for Cursor<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|result| {
            result
                .chain("can't step cursor")
                .and_then(deserialize_one)
        })
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
