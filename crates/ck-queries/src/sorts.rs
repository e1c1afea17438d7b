//! Order terms
//!
//! A query has at most one primary order term. Additional keys are `then`
//! terms, applied as tie-breakers in ascending `sequence`.

use serde::{Deserialize, Serialize};

use ck_core::{QsError, QsResult};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    #[serde(alias = "Asc", alias = "ascending")]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    #[serde(alias = "Desc", alias = "descending")]
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Get the opposite direction
    pub fn reverse(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// A single ordering key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderTerm {
    /// Property path, dot-separated for value-object members
    pub property: String,
    #[serde(default)]
    pub direction: SortDirection,
    /// Insertion sequence; orders `then` terms among themselves
    #[serde(default)]
    pub sequence: usize,
    /// False for the primary term
    #[serde(default)]
    pub then: bool,
}

impl OrderTerm {
    pub fn primary(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
            sequence: 0,
            then: false,
        }
    }

    pub fn then(property: impl Into<String>, direction: SortDirection, sequence: usize) -> Self {
        Self {
            property: property.into(),
            direction,
            sequence,
            then: true,
        }
    }
}

/// Order terms of a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderChain {
    terms: Vec<OrderTerm>,
}

impl OrderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap terms as given; call [`OrderChain::validate`] before use
    pub fn from_terms(terms: Vec<OrderTerm>) -> Self {
        Self { terms }
    }

    /// Add the primary term; fails if one already exists
    pub fn push_primary(
        &mut self,
        property: impl Into<String>,
        direction: SortDirection,
    ) -> QsResult<()> {
        let existing = self.primary_count();
        if existing > 0 {
            return Err(QsError::DuplicatePrimaryOrder {
                count: existing + 1,
            });
        }
        let mut term = OrderTerm::primary(property, direction);
        term.sequence = self.next_sequence();
        self.terms.push(term);
        Ok(())
    }

    /// Add a tie-breaker; fails without a primary term
    pub fn push_then(&mut self, property: impl Into<String>, direction: SortDirection) -> QsResult<()> {
        if self.primary_count() == 0 {
            return Err(QsError::Validation(
                "then_by requires a primary order term; call order_by or order_by_descending first"
                    .to_string(),
            ));
        }
        let sequence = self.next_sequence();
        self.terms.push(OrderTerm::then(property, direction, sequence));
        Ok(())
    }

    /// Check the chain has at most one primary term and that `then` terms
    /// follow a primary
    pub fn validate(&self) -> QsResult<()> {
        match self.primary_count() {
            0 if !self.terms.is_empty() => Err(QsError::Validation(
                "then terms require a primary order term".to_string(),
            )),
            0 | 1 => Ok(()),
            count => Err(QsError::DuplicatePrimaryOrder { count }),
        }
    }

    pub fn primary(&self) -> Option<&OrderTerm> {
        self.terms.iter().find(|t| !t.then)
    }

    /// Tie-breakers in application order
    pub fn secondaries(&self) -> Vec<&OrderTerm> {
        let mut secondaries: Vec<&OrderTerm> = self.terms.iter().filter(|t| t.then).collect();
        secondaries.sort_by_key(|t| t.sequence);
        secondaries
    }

    pub fn primary_count(&self) -> usize {
        self.terms.iter().filter(|t| !t.then).count()
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    fn next_sequence(&self) -> usize {
        self.terms.iter().map(|t| t.sequence + 1).max().unwrap_or(0)
    }
}
