//! Navigation metadata
//!
//! A navigation is a readable property that points at another entity, or at
//! a collection of them. Discovery walks the entity's property table once per
//! type; the result is cached in a [`NavigationRegistry`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use ck_core::{Cardinality, Entity, ObjectShape, PropertyDescriptor, Value};

/// A relationship property of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationDescriptor {
    pub owner_type: &'static str,
    pub name: &'static str,
    pub target: ObjectShape,
    pub cardinality: Cardinality,
}

impl NavigationDescriptor {
    pub fn target_type(&self) -> &'static str {
        self.target.type_name
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Evaluate the navigation's accessor on an entity
    pub fn value_of<T: Entity>(&self, entity: &T) -> Option<Value> {
        entity.property(self.name)
    }
}

/// Navigations declared in a property table, in declaration order
pub fn navigation_properties(
    owner_type: &'static str,
    properties: &'static [PropertyDescriptor],
) -> Vec<NavigationDescriptor> {
    properties
        .iter()
        .filter_map(|property| {
            property
                .navigation_target()
                .map(|(target, cardinality)| NavigationDescriptor {
                    owner_type,
                    name: property.name,
                    target,
                    cardinality,
                })
        })
        .collect()
}

/// Navigations of an object shape; not cached
pub fn shape_navigations(shape: &ObjectShape) -> Vec<NavigationDescriptor> {
    navigation_properties(shape.type_name, shape.properties())
}

type Slot = Arc<OnceCell<Arc<[NavigationDescriptor]>>>;

static GLOBAL: Lazy<Arc<NavigationRegistry>> = Lazy::new(|| Arc::new(NavigationRegistry::new()));

/// Per-type cache of discovered navigations.
///
/// Each type is populated once; concurrent first lookups for the same type
/// block on a single initializer and all observe the same `Arc`.
#[derive(Default)]
pub struct NavigationRegistry {
    entries: RwLock<HashMap<TypeId, Slot>>,
}

impl NavigationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> Arc<NavigationRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn discover<T: Entity>(&self) -> Arc<[NavigationDescriptor]> {
        let type_id = TypeId::of::<T>();
        let cached = self.entries.read().get(&type_id).cloned();
        let slot = match cached {
            Some(slot) => slot,
            None => self.entries.write().entry(type_id).or_default().clone(),
        };

        slot.get_or_init(|| {
            let navigations = navigation_properties(T::TYPE_NAME, T::properties());
            tracing::debug!(
                entity = T::TYPE_NAME,
                navigations = navigations.len(),
                "Discovered navigation properties"
            );
            navigations.into()
        })
        .clone()
    }

    /// Find one navigation of `T` by name (exact, then case-insensitive)
    pub fn find<T: Entity>(&self, name: &str) -> Option<NavigationDescriptor> {
        let navigations = self.discover::<T>();
        let found = navigations
            .iter()
            .find(|n| n.name == name)
            .or_else(|| navigations.iter().find(|n| n.name.eq_ignore_ascii_case(name)))
            .copied();
        found
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Cleared navigation registry");
    }

    /// Number of types with populated entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Customer, Order};
    use ck_core::{Id, Identifiable, ScalarType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_discovery_rule() {
        let registry = NavigationRegistry::new();
        let navigations = registry.discover::<Customer>();
        let names: Vec<&str> = navigations.iter().map(|n| n.name).collect();

        assert_eq!(names, vec!["Orders", "Manager"]);
        assert_eq!(navigations[0].cardinality, Cardinality::Many);
        assert!(navigations[0].is_collection());
        assert_eq!(navigations[0].target_type(), "Order");
        assert_eq!(navigations[1].cardinality, Cardinality::One);
        assert!(!navigations[1].is_collection());
        assert_eq!(navigations[1].owner_type, "Customer");
    }

    #[test]
    fn test_shape_navigations() {
        let orders = NavigationRegistry::new().find::<Customer>("orders").unwrap();
        let nested = shape_navigations(&orders.target);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "Lines");
        assert_eq!(nested[0].owner_type, "Order");
    }

    #[test]
    fn test_cache_identity() {
        let registry = NavigationRegistry::new();
        let first = registry.discover::<Customer>();
        let second = registry.discover::<Customer>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());

        let third = registry.discover::<Customer>();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_types_are_cached_separately() {
        let registry = NavigationRegistry::new();
        registry.discover::<Customer>();
        let order_navigations = registry.discover::<Order>();
        assert_eq!(order_navigations.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    static SCANS: AtomicUsize = AtomicUsize::new(0);

    static WIDGET_PROPERTIES: [PropertyDescriptor; 1] =
        [PropertyDescriptor::scalar("Id", ScalarType::Int)];

    #[derive(Debug, Clone, Default)]
    struct Widget;

    impl Identifiable for Widget {
        fn id(&self) -> Option<Id> {
            None
        }
    }

    impl Entity for Widget {
        const TYPE_NAME: &'static str = "Widget";
        const TABLE_NAME: &'static str = "widgets";

        fn properties() -> &'static [PropertyDescriptor] {
            SCANS.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            &WIDGET_PROPERTIES
        }

        fn property(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn test_concurrent_first_access_populates_once() {
        let registry = NavigationRegistry::new();
        let results: Vec<Arc<[NavigationDescriptor]>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.discover::<Widget>()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(SCANS.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
