// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Descriptor and deserializer for the AES-GCM encryptor.

use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::crypto::{
    CryptoError, EncryptionAlgorithm, GcmEncryptor, Secret, MASTER_SECRET_MIN_SIZE,
};

use super::registry::DescriptorDeserializer;
use super::{
    descriptor_element, master_key_element, read_algorithm_attr, read_master_key, Descriptor,
    ALGORITHM_ATTR, ENCRYPTION_ELEMENT,
};

/// Type string persisted in the `deserializerType` attribute.
pub const GCM_DESERIALIZER_TYPE: &str = "cloak::descriptors::GcmDescriptorDeserializer";

/// Configuration of a GCM key: encryption algorithm plus master secret.
pub struct GcmDescriptor {
    encryption: EncryptionAlgorithm,
    master: Arc<Secret>,
}

impl GcmDescriptor {
    /// Validates and builds a descriptor. `encryption` must be a GCM
    /// identifier and the master secret at least 512 bits.
    pub fn new(encryption: EncryptionAlgorithm, master: Secret) -> Result<Self, CryptoError> {
        if !encryption.is_gcm() {
            return Err(CryptoError::WrongAlgorithmFamily(
                encryption.as_str().to_string(),
            ));
        }
        if master.len() < MASTER_SECRET_MIN_SIZE {
            return Err(CryptoError::MasterSecretTooShort {
                expected: MASTER_SECRET_MIN_SIZE,
                got: master.len(),
            });
        }
        Ok(Self {
            encryption,
            master: Arc::new(master),
        })
    }

    pub fn encryption(&self) -> EncryptionAlgorithm {
        self.encryption
    }

    /// Serializes to the descriptor element shape.
    pub fn to_xml_element(&self) -> Element {
        let mut descriptor = descriptor_element(GCM_DESERIALIZER_TYPE);

        let mut encryption = Element::new(ENCRYPTION_ELEMENT);
        encryption
            .attributes
            .insert(ALGORITHM_ATTR.to_string(), self.encryption.as_str().to_string());
        descriptor.children.push(XMLNode::Element(encryption));

        descriptor
            .children
            .push(XMLNode::Element(master_key_element(&self.master)));
        descriptor
    }

    /// Builds the configured encryptor, sharing this descriptor's secret.
    pub fn build_encryptor(&self) -> Result<GcmEncryptor, CryptoError> {
        GcmEncryptor::new(self.encryption, Arc::clone(&self.master))
    }
}

impl std::fmt::Debug for GcmDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcmDescriptor")
            .field("encryption", &self.encryption)
            .field("master", &"[REDACTED]")
            .finish()
    }
}

/// Pure element-to-descriptor reader for the GCM variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct GcmDescriptorDeserializer;

impl DescriptorDeserializer for GcmDescriptorDeserializer {
    fn deserialize(&self, element: &Element) -> Result<Descriptor, CryptoError> {
        let encryption: EncryptionAlgorithm =
            read_algorithm_attr(element, ENCRYPTION_ELEMENT)?.parse()?;
        let master = read_master_key(element)?;
        Ok(Descriptor::Gcm(GcmDescriptor::new(encryption, master)?))
    }
}
