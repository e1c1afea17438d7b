//! Include directives
//!
//! An include asks a provider to load a navigation together with the root
//! entity. One level of chaining is supported (`Orders.Lines`).

use std::sync::Arc;

use ck_core::{find_property, Entity, ObjectShape, QsError, QsResult};

use crate::navigation::{shape_navigations, NavigationDescriptor, NavigationRegistry};

/// One step of an include path
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    /// Type owning the navigation
    pub entity_type: &'static str,
    pub navigation: &'static str,
    pub target: ObjectShape,
    pub previous: Option<Arc<IncludeNode>>,
    pub is_then_include: bool,
}

impl IncludeNode {
    /// Include a navigation of the root entity.
    ///
    /// The accessor is evaluated against `T::default()` so a navigation that
    /// is declared but not exposed by `property` is rejected here rather than
    /// at query time.
    pub fn root<T: Entity + Default>(
        registry: &NavigationRegistry,
        navigation: &str,
    ) -> QsResult<Self> {
        let descriptor = registry
            .find::<T>(navigation)
            .ok_or_else(|| not_navigable(T::TYPE_NAME, T::properties(), navigation))?;

        if descriptor.value_of(&T::default()).is_none() {
            return Err(QsError::Validation(format!(
                "navigation {}.{} has no readable accessor",
                T::TYPE_NAME,
                descriptor.name
            )));
        }

        Ok(Self::from_descriptor(descriptor, None))
    }

    /// Chain a navigation of this node's target type
    pub fn then(previous: &Arc<IncludeNode>, navigation: &str) -> QsResult<Self> {
        if previous.is_then_include {
            return Err(QsError::Validation(format!(
                "cannot chain an include after {}; only one level of then-include is supported",
                previous.path()
            )));
        }

        let target = previous.target;
        let navigations = shape_navigations(&target);
        let descriptor = navigations
            .iter()
            .find(|n| n.name == navigation)
            .or_else(|| navigations.iter().find(|n| n.name.eq_ignore_ascii_case(navigation)))
            .copied()
            .ok_or_else(|| not_navigable(target.type_name, target.properties(), navigation))?;

        Ok(Self::from_descriptor(descriptor, Some(Arc::clone(previous))))
    }

    fn from_descriptor(descriptor: NavigationDescriptor, previous: Option<Arc<IncludeNode>>) -> Self {
        Self {
            entity_type: descriptor.owner_type,
            navigation: descriptor.name,
            target: descriptor.target,
            is_then_include: previous.is_some(),
            previous,
        }
    }

    pub fn target_type(&self) -> &'static str {
        self.target.type_name
    }

    /// Dotted path from the root entity
    pub fn path(&self) -> String {
        match &self.previous {
            Some(previous) => format!("{}.{}", previous.path(), self.navigation),
            None => self.navigation.to_string(),
        }
    }
}

fn not_navigable(
    owner: &str,
    properties: &'static [ck_core::PropertyDescriptor],
    name: &str,
) -> QsError {
    match find_property(properties, name) {
        Some(property) => QsError::NotNavigable {
            entity: owner.to_string(),
            property: property.name.to_string(),
        },
        None => QsError::unknown_property(owner, name),
    }
}

/// Include directives of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludeChain {
    nodes: Vec<Arc<IncludeNode>>,
}

impl IncludeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: IncludeNode) -> Arc<IncludeNode> {
        let node = Arc::new(node);
        self.nodes.push(Arc::clone(&node));
        node
    }

    pub fn include<T: Entity + Default>(
        &mut self,
        registry: &NavigationRegistry,
        navigation: &str,
    ) -> QsResult<Arc<IncludeNode>> {
        Ok(self.push(IncludeNode::root::<T>(registry, navigation)?))
    }

    pub fn include_then<T: Entity + Default>(
        &mut self,
        registry: &NavigationRegistry,
        navigation: &str,
        then: &str,
    ) -> QsResult<Arc<IncludeNode>> {
        let root = Arc::new(IncludeNode::root::<T>(registry, navigation)?);
        let leaf = IncludeNode::then(&root, then)?;
        Ok(self.push(leaf))
    }

    /// Include a dotted path of at most two navigations
    pub fn include_path<T: Entity + Default>(
        &mut self,
        registry: &NavigationRegistry,
        path: &str,
    ) -> QsResult<Arc<IncludeNode>> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        match segments.as_slice() {
            [navigation] => self.include::<T>(registry, navigation),
            [navigation, then] => self.include_then::<T>(registry, navigation, then),
            _ => Err(QsError::Validation(format!(
                "include path '{}' is deeper than one then-include",
                path
            ))),
        }
    }

    pub fn nodes(&self) -> &[Arc<IncludeNode>] {
        &self.nodes
    }

    /// Distinct include paths; a path implied by a longer one is omitted
    pub fn paths(&self) -> Vec<String> {
        let all: Vec<String> = self.nodes.iter().map(|n| n.path()).collect();
        let mut paths: Vec<String> = Vec::new();
        for path in &all {
            let implied = all
                .iter()
                .any(|other| other.len() > path.len() && other.starts_with(&format!("{}.", path)));
            if !implied && !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
