// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Closed registry of descriptor deserializers.
//!
//! The `deserializerType` string persisted on each descriptor element is the
//! variant discriminator. Resolution goes through this explicit table rather
//! than runtime type reflection.

use std::collections::HashMap;
use std::sync::Arc;

use xmltree::Element;

use crate::crypto::CryptoError;

use super::cbc::{CbcHmacDescriptorDeserializer, CBC_DESERIALIZER_TYPE};
use super::gcm::{GcmDescriptorDeserializer, GCM_DESERIALIZER_TYPE};
use super::{Descriptor, DESERIALIZER_TYPE_ATTR};

/// Pure reader: descriptor element in, [`Descriptor`] out. No I/O.
pub trait DescriptorDeserializer: Send + Sync {
    fn deserialize(&self, element: &Element) -> Result<Descriptor, CryptoError>;
}

/// Maps deserializer type strings to deserializer instances.
pub struct DeserializerRegistry {
    deserializers: HashMap<String, Arc<dyn DescriptorDeserializer>>,
}

impl DeserializerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            deserializers: HashMap::new(),
        }
    }

    /// Registry with both built-in variants registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CBC_DESERIALIZER_TYPE, Arc::new(CbcHmacDescriptorDeserializer));
        registry.register(GCM_DESERIALIZER_TYPE, Arc::new(GcmDescriptorDeserializer));
        registry
    }

    /// Registers a deserializer under its type string.
    pub fn register(
        &mut self,
        deserializer_type: impl Into<String>,
        deserializer: Arc<dyn DescriptorDeserializer>,
    ) {
        self.deserializers
            .insert(deserializer_type.into(), deserializer);
    }

    /// Resolves a type string.
    pub fn resolve(
        &self,
        deserializer_type: &str,
    ) -> Result<Arc<dyn DescriptorDeserializer>, CryptoError> {
        self.deserializers
            .get(deserializer_type)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownDeserializer(deserializer_type.to_string()))
    }

    /// Reads a descriptor element: dispatch on its `deserializerType`
    /// attribute and run the matching deserializer.
    pub fn deserialize(&self, element: &Element) -> Result<Descriptor, CryptoError> {
        let deserializer_type = element
            .attributes
            .get(DESERIALIZER_TYPE_ATTR)
            .ok_or_else(|| {
                CryptoError::MalformedDescriptor("missing deserializerType".to_string())
            })?;
        self.resolve(deserializer_type)?.deserialize(element)
    }
}

impl Default for DeserializerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EncryptionAlgorithm, Secret, ValidationAlgorithm};
    use crate::descriptors::{CbcHmacDescriptor, GcmDescriptor};

    #[test]
    fn dispatches_both_builtin_variants() {
        let registry = DeserializerRegistry::with_defaults();

        let cbc = CbcHmacDescriptor::new(
            EncryptionAlgorithm::Aes256Cbc,
            ValidationAlgorithm::HmacSha256,
            Secret::random(64).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            registry.deserialize(&cbc.to_xml_element()).unwrap(),
            Descriptor::CbcHmac(_)
        ));

        let gcm =
            GcmDescriptor::new(EncryptionAlgorithm::Aes128Gcm, Secret::random(64).unwrap())
                .unwrap();
        assert!(matches!(
            registry.deserialize(&gcm.to_xml_element()).unwrap(),
            Descriptor::Gcm(_)
        ));
    }

    #[test]
    fn unknown_type_string_is_rejected() {
        let registry = DeserializerRegistry::with_defaults();
        let mut element = Element::new("descriptor");
        element.attributes.insert(
            DESERIALIZER_TYPE_ATTR.to_string(),
            "com.example.Mystery".to_string(),
        );

        let result = registry.deserialize(&element);
        assert!(matches!(result, Err(CryptoError::UnknownDeserializer(_))));
    }

    #[test]
    fn missing_type_attribute_is_rejected() {
        let registry = DeserializerRegistry::with_defaults();
        let element = Element::new("descriptor");

        let result = registry.deserialize(&element);
        assert!(matches!(result, Err(CryptoError::MalformedDescriptor(_))));
    }
}
