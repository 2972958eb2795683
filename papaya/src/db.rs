//! Represents a MongoDB database.

use crate::{
    coll::Collection,
    mapping::Entity,
    error::Result,
};

/// Methods augmenting the driver's `Database` type.
pub trait DatabaseExt {
    /// Returns an existing collection without dropping/recreating it.
    fn existing_collection<T: Entity>(&self) -> Collection<T>;

    /// Returns the collection of `T` after dropping it.
    /// **Deletes every document of the collection.**
    fn empty_collection<T: Entity>(&self) -> Result<Collection<T>> {
        let coll = self.existing_collection::<T>();
        coll.drop()?;
        Ok(coll)
    }
}

impl DatabaseExt for mongodb::sync::Database {
    fn existing_collection<T: Entity>(&self) -> Collection<T> {
        Collection::new(self)
    }
}
