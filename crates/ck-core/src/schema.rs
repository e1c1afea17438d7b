//! Declarative entity schemas
//!
//! Each entity type publishes a static table of [`PropertyDescriptor`]s. The
//! query engine uses these tables wherever it needs to know which properties
//! exist, how they are typed, and which of them are relationships to other
//! entities.

use std::fmt;

/// Primitive property types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    /// Carried as RFC 3339 text
    DateTime,
    /// Carried as hyphenated text
    Uuid,
}

/// Whether a navigation points at one entity or many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Shape of a composite type referenced by a property.
///
/// `has_identity` marks entity-shaped types; value objects (an address,
/// a money amount) have no identity of their own.
#[derive(Clone, Copy)]
pub struct ObjectShape {
    pub type_name: &'static str,
    pub has_identity: bool,
    pub properties: fn() -> &'static [PropertyDescriptor],
}

impl ObjectShape {
    pub const fn entity(
        type_name: &'static str,
        properties: fn() -> &'static [PropertyDescriptor],
    ) -> Self {
        Self {
            type_name,
            has_identity: true,
            properties,
        }
    }

    pub const fn value_object(
        type_name: &'static str,
        properties: fn() -> &'static [PropertyDescriptor],
    ) -> Self {
        Self {
            type_name,
            has_identity: false,
            properties,
        }
    }

    pub fn properties(&self) -> &'static [PropertyDescriptor] {
        (self.properties)()
    }

    pub fn property(&self, name: &str) -> Option<&'static PropertyDescriptor> {
        find_property(self.properties(), name)
    }
}

impl fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectShape")
            .field("type_name", &self.type_name)
            .field("has_identity", &self.has_identity)
            .finish()
    }
}

impl PartialEq for ObjectShape {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.has_identity == other.has_identity
    }
}

/// Element type of a collection property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementType {
    Scalar(ScalarType),
    Text,
    Object(ObjectShape),
}

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyType {
    Scalar(ScalarType),
    Text,
    Collection(ElementType),
    Object(ObjectShape),
}

impl PropertyType {
    /// Scalars and text can be compared, sorted and searched
    pub fn is_primitive(&self) -> bool {
        matches!(self, PropertyType::Scalar(_) | PropertyType::Text)
    }
}

/// A single property of an entity or value object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub ty: PropertyType,
    pub readable: bool,
    pub writable: bool,
}

impl PropertyDescriptor {
    pub const fn new(name: &'static str, ty: PropertyType) -> Self {
        Self {
            name,
            ty,
            readable: true,
            writable: true,
        }
    }

    pub const fn scalar(name: &'static str, scalar: ScalarType) -> Self {
        Self::new(name, PropertyType::Scalar(scalar))
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, PropertyType::Text)
    }

    pub const fn object(name: &'static str, shape: ObjectShape) -> Self {
        Self::new(name, PropertyType::Object(shape))
    }

    pub const fn collection(name: &'static str, element: ElementType) -> Self {
        Self::new(name, PropertyType::Collection(element))
    }

    pub const fn read_only(self) -> Self {
        Self {
            writable: false,
            ..self
        }
    }

    pub const fn write_only(self) -> Self {
        Self {
            readable: false,
            ..self
        }
    }

    /// Target shape and cardinality if this property is a relationship to
    /// another entity.
    ///
    /// Only publicly readable properties whose type is entity-shaped, or a
    /// collection of entity-shaped elements, qualify. Scalars, text,
    /// collections of primitives and value objects do not.
    pub fn navigation_target(&self) -> Option<(ObjectShape, Cardinality)> {
        if !self.readable {
            return None;
        }
        match self.ty {
            PropertyType::Object(shape) if shape.has_identity => Some((shape, Cardinality::One)),
            PropertyType::Collection(ElementType::Object(shape)) if shape.has_identity => {
                Some((shape, Cardinality::Many))
            }
            _ => None,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.navigation_target().is_some()
    }
}

/// Find a readable property by name.
///
/// Exact matches win; otherwise an ASCII case-insensitive match is accepted so
/// wire payloads using `age` still resolve to `Age`.
pub fn find_property(
    properties: &'static [PropertyDescriptor],
    name: &str,
) -> Option<&'static PropertyDescriptor> {
    properties
        .iter()
        .find(|p| p.readable && p.name == name)
        .or_else(|| {
            properties
                .iter()
                .find(|p| p.readable && p.name.eq_ignore_ascii_case(name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    static LINE_PROPERTIES: [PropertyDescriptor; 2] = [
        PropertyDescriptor::scalar("Id", ScalarType::Int),
        PropertyDescriptor::scalar("Quantity", ScalarType::Int),
    ];

    static MONEY_PROPERTIES: [PropertyDescriptor; 1] =
        [PropertyDescriptor::scalar("Amount", ScalarType::Float)];

    fn line_properties() -> &'static [PropertyDescriptor] {
        &LINE_PROPERTIES
    }

    fn money_properties() -> &'static [PropertyDescriptor] {
        &MONEY_PROPERTIES
    }

    static ORDER_PROPERTIES: [PropertyDescriptor; 6] = [
        PropertyDescriptor::scalar("Id", ScalarType::Int),
        PropertyDescriptor::text("Number"),
        PropertyDescriptor::collection("Tags", ElementType::Text),
        PropertyDescriptor::object("Total", ObjectShape::value_object("Money", money_properties)),
        PropertyDescriptor::collection(
            "Lines",
            ElementType::Object(ObjectShape::entity("OrderLine", line_properties)),
        ),
        PropertyDescriptor::object("Parent", ObjectShape::entity("OrderLine", line_properties))
            .write_only(),
    ];

    #[test]
    fn test_navigation_rule() {
        let navigations: Vec<_> = ORDER_PROPERTIES
            .iter()
            .filter(|p| p.is_navigation())
            .map(|p| p.name)
            .collect();
        assert_eq!(navigations, vec!["Lines"]);
    }

    #[test]
    fn test_navigation_cardinality() {
        let (shape, cardinality) = ORDER_PROPERTIES[4].navigation_target().unwrap();
        assert_eq!(shape.type_name, "OrderLine");
        assert_eq!(cardinality, Cardinality::Many);
        assert_eq!(shape.properties().len(), 2);
    }

    #[test]
    fn test_find_property_is_case_tolerant() {
        assert_eq!(find_property(&ORDER_PROPERTIES, "number").unwrap().name, "Number");
        assert!(find_property(&ORDER_PROPERTIES, "Parent").is_none());
        assert!(find_property(&ORDER_PROPERTIES, "Missing").is_none());
    }
}
