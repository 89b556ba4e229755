// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Descriptor and deserializer for the CBC-then-HMAC encryptor.

use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::crypto::{
    CbcHmacEncryptor, CryptoError, EncryptionAlgorithm, Secret, ValidationAlgorithm,
    MASTER_SECRET_MIN_SIZE,
};

use super::registry::DescriptorDeserializer;
use super::{
    descriptor_element, master_key_element, read_algorithm_attr, read_master_key, Descriptor,
    ALGORITHM_ATTR, ENCRYPTION_ELEMENT, VALIDATION_ELEMENT,
};

/// Type string persisted in the `deserializerType` attribute.
pub const CBC_DESERIALIZER_TYPE: &str = "cloak::descriptors::CbcHmacDescriptorDeserializer";

/// Configuration of a CBC-then-HMAC key: encryption algorithm, validation
/// algorithm, and the master secret subkeys derive from.
pub struct CbcHmacDescriptor {
    encryption: EncryptionAlgorithm,
    validation: ValidationAlgorithm,
    master: Arc<Secret>,
}

impl CbcHmacDescriptor {
    /// Validates and builds a descriptor. `encryption` must be a CBC
    /// identifier and the master secret at least 512 bits.
    pub fn new(
        encryption: EncryptionAlgorithm,
        validation: ValidationAlgorithm,
        master: Secret,
    ) -> Result<Self, CryptoError> {
        if !encryption.is_cbc() {
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
            validation,
            master: Arc::new(master),
        })
    }

    pub fn encryption(&self) -> EncryptionAlgorithm {
        self.encryption
    }

    pub fn validation(&self) -> ValidationAlgorithm {
        self.validation
    }

    /// Serializes to the descriptor element shape.
    pub fn to_xml_element(&self) -> Element {
        let mut descriptor = descriptor_element(CBC_DESERIALIZER_TYPE);

        let mut encryption = Element::new(ENCRYPTION_ELEMENT);
        encryption
            .attributes
            .insert(ALGORITHM_ATTR.to_string(), self.encryption.as_str().to_string());
        descriptor.children.push(XMLNode::Element(encryption));

        let mut validation = Element::new(VALIDATION_ELEMENT);
        validation
            .attributes
            .insert(ALGORITHM_ATTR.to_string(), self.validation.as_str().to_string());
        descriptor.children.push(XMLNode::Element(validation));

        descriptor
            .children
            .push(XMLNode::Element(master_key_element(&self.master)));
        descriptor
    }

    /// Builds the configured encryptor, sharing this descriptor's secret.
    pub fn build_encryptor(&self) -> Result<CbcHmacEncryptor, CryptoError> {
        CbcHmacEncryptor::new(self.encryption, self.validation, Arc::clone(&self.master))
    }
}

impl std::fmt::Debug for CbcHmacDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcHmacDescriptor")
            .field("encryption", &self.encryption)
            .field("validation", &self.validation)
            .field("master", &"[REDACTED]")
            .finish()
    }
}

/// Pure element-to-descriptor reader for the CBC variant.
#[derive(Debug, Default, Clone, Copy)]
pub struct CbcHmacDescriptorDeserializer;

impl DescriptorDeserializer for CbcHmacDescriptorDeserializer {
    fn deserialize(&self, element: &Element) -> Result<Descriptor, CryptoError> {
        let encryption: EncryptionAlgorithm =
            read_algorithm_attr(element, ENCRYPTION_ELEMENT)?.parse()?;
        let validation: ValidationAlgorithm =
            read_algorithm_attr(element, VALIDATION_ELEMENT)?.parse()?;
        let master = read_master_key(element)?;
        Ok(Descriptor::CbcHmac(CbcHmacDescriptor::new(
            encryption, validation, master,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::to_canonical_string;

    fn descriptor() -> CbcHmacDescriptor {
        CbcHmacDescriptor::new(
            EncryptionAlgorithm::Aes256Cbc,
            ValidationAlgorithm::HmacSha512,
            Secret::random(64).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn xml_round_trip_preserves_configuration() {
        let original = descriptor();
        let element = original.to_xml_element();

        let rehydrated = CbcHmacDescriptorDeserializer.deserialize(&element).unwrap();
        let Descriptor::CbcHmac(rehydrated) = rehydrated else {
            panic!("wrong variant");
        };

        assert_eq!(rehydrated.encryption(), original.encryption());
        assert_eq!(rehydrated.validation(), original.validation());
        assert_eq!(
            to_canonical_string(&rehydrated.to_xml_element()),
            to_canonical_string(&element)
        );
    }

    #[test]
    fn element_shape_is_exact() {
        let master = Secret::from_bytes(&[0x11; 64]).unwrap();
        let base64 = master.to_base64();
        let descriptor = CbcHmacDescriptor::new(
            EncryptionAlgorithm::Aes256Cbc,
            ValidationAlgorithm::HmacSha512,
            master,
        )
        .unwrap();

        let expected = format!(
            concat!(
                r#"<descriptor deserializerType="{}">"#,
                r#"<encryption algorithm="AES_256_CBC"/>"#,
                r#"<validation algorithm="HMACSHA512"/>"#,
                r#"<masterKey requiresEncryption="true"><value>{}</value></masterKey>"#,
                r#"</descriptor>"#
            ),
            CBC_DESERIALIZER_TYPE, base64
        );
        assert_eq!(to_canonical_string(&descriptor.to_xml_element()), expected);
    }

    #[test]
    fn missing_validation_is_rejected() {
        let mut element = descriptor().to_xml_element();
        element.take_child(VALIDATION_ELEMENT).unwrap();

        let result = CbcHmacDescriptorDeserializer.deserialize(&element);
        assert!(matches!(result, Err(CryptoError::MalformedDescriptor(_))));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let mut element = descriptor().to_xml_element();
        element
            .get_mut_child(ENCRYPTION_ELEMENT)
            .unwrap()
            .attributes
            .insert(ALGORITHM_ATTR.to_string(), "ROT13".to_string());

        let result = CbcHmacDescriptorDeserializer.deserialize(&element);
        assert!(matches!(result, Err(CryptoError::UnknownAlgorithm(_))));
    }

    #[test]
    fn gcm_algorithm_is_rejected() {
        let result = CbcHmacDescriptor::new(
            EncryptionAlgorithm::Aes128Gcm,
            ValidationAlgorithm::HmacSha256,
            Secret::random(64).unwrap(),
        );
        assert!(matches!(result, Err(CryptoError::WrongAlgorithmFamily(_))));
    }
}
