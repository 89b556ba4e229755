// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Pluggable storage for key-ring XML elements.
//!
//! The repository is a flat bag of top-level elements: key elements and
//! revocation elements. Reads are always full scans; the ring provider caches
//! the materialized result.

use parking_lot::RwLock;
use tracing::debug;
use xmltree::Element;

use super::error::RepositoryError;

/// Backend that persists key-ring elements.
pub trait KeyRepository: Send + Sync {
    /// Returns every stored element.
    fn get_all_elements(&self) -> Result<Vec<Element>, RepositoryError>;

    /// Appends an element. `friendly_name` is a stable human-readable label
    /// the backend may use for file names or logging.
    fn store_element(&self, element: Element, friendly_name: &str) -> Result<(), RepositoryError>;
}

/// Process-local repository holding elements in memory.
///
/// Suitable for tests and for applications that accept losing protected
/// payloads on restart.
#[derive(Default)]
pub struct InMemoryRepository {
    elements: RwLock<Vec<Element>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

impl KeyRepository for InMemoryRepository {
    fn get_all_elements(&self) -> Result<Vec<Element>, RepositoryError> {
        Ok(self.elements.read().clone())
    }

    fn store_element(&self, element: Element, friendly_name: &str) -> Result<(), RepositoryError> {
        debug!(friendly_name, "storing key ring element");
        self.elements.write().push(element);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let repository = InMemoryRepository::new();
        assert!(repository.is_empty());
        assert!(repository.get_all_elements().unwrap().is_empty());
    }

    #[test]
    fn stored_elements_come_back_in_order() {
        let repository = InMemoryRepository::new();
        repository
            .store_element(Element::new("first"), "first")
            .unwrap();
        repository
            .store_element(Element::new("second"), "second")
            .unwrap();

        let elements = repository.get_all_elements().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name, "first");
        assert_eq!(elements[1].name, "second");
    }
}
