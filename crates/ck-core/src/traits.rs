//! Core traits for entities managed by crudkit

use chrono::{DateTime, Utc};

use crate::schema::{find_property, ObjectShape, PropertyDescriptor};
use crate::value::Value;

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Trait for soft-deletable entities
pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn mark_deleted(&mut self, at: DateTime<Utc>);
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// Base trait for all queryable domain entities
///
/// The schema is declared once as a static table; `property` exposes the
/// readable values named in that table.
pub trait Entity: Identifiable + Clone + Send + Sync + 'static {
    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;

    /// The database table name
    const TABLE_NAME: &'static str;

    /// Name of the key property
    const KEY: &'static str = "Id";

    /// Declared properties, in declaration order
    fn properties() -> &'static [PropertyDescriptor];

    /// Read a property value; `None` if the name is unknown or not readable
    fn property(&self, name: &str) -> Option<Value>;

    /// Soft-delete capability of this instance, if it has one
    fn as_soft_deletable(&self) -> Option<&dyn SoftDeletable> {
        None
    }

    fn as_soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        None
    }

    fn supports_soft_delete(&self) -> bool {
        self.as_soft_deletable().is_some()
    }

    fn descriptor(name: &str) -> Option<&'static PropertyDescriptor> {
        find_property(Self::properties(), name)
    }

    fn shape() -> ObjectShape {
        ObjectShape::entity(Self::TYPE_NAME, Self::properties)
    }
}
