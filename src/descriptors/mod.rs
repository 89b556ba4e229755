// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Encryptor descriptors: the durable configuration of a key.
//!
//! A descriptor pairs algorithm identifiers with the key's master secret. It
//! serializes to an XML element whose `deserializerType` attribute is the
//! tagged-variant discriminator that the closed [`DeserializerRegistry`]
//! resolves on read. Deserializers are pure element-to-descriptor functions;
//! at-rest decryption happens before the element reaches them.
//!
//! # Element shape
//!
//! ```text
//! <descriptor deserializerType="...">
//!   <encryption algorithm="AES_256_CBC"/>
//!   <validation algorithm="HMACSHA512"/>     (CBC family only)
//!   <masterKey requiresEncryption="true">
//!     <value>base64</value>
//!   </masterKey>
//! </descriptor>
//! ```

mod cbc;
mod gcm;
mod registry;

use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::crypto::{AuthenticatedEncryptor, CryptoError, Secret};
use crate::xml::REQUIRES_ENCRYPTION_ATTR;

pub use self::cbc::{CbcHmacDescriptor, CbcHmacDescriptorDeserializer, CBC_DESERIALIZER_TYPE};
pub use self::gcm::{GcmDescriptor, GcmDescriptorDeserializer, GCM_DESERIALIZER_TYPE};
pub use self::registry::{DescriptorDeserializer, DeserializerRegistry};

pub(crate) const DESCRIPTOR_ELEMENT: &str = "descriptor";
pub(crate) const DESERIALIZER_TYPE_ATTR: &str = "deserializerType";
pub(crate) const ENCRYPTION_ELEMENT: &str = "encryption";
pub(crate) const VALIDATION_ELEMENT: &str = "validation";
pub(crate) const ALGORITHM_ATTR: &str = "algorithm";
pub(crate) const MASTER_KEY_ELEMENT: &str = "masterKey";
pub(crate) const VALUE_ELEMENT: &str = "value";

/// The durable configuration of one encryptor variant.
#[derive(Debug)]
pub enum Descriptor {
    CbcHmac(CbcHmacDescriptor),
    Gcm(GcmDescriptor),
}

impl Descriptor {
    /// Type string written into the element's `deserializerType` attribute.
    pub fn deserializer_type(&self) -> &'static str {
        match self {
            Descriptor::CbcHmac(_) => CBC_DESERIALIZER_TYPE,
            Descriptor::Gcm(_) => GCM_DESERIALIZER_TYPE,
        }
    }

    /// Serializes to the descriptor element. The master-key sub-tree carries
    /// the requires-encryption marker; the key manager encrypts it at rest
    /// before the element is persisted.
    pub fn to_xml_element(&self) -> Element {
        match self {
            Descriptor::CbcHmac(d) => d.to_xml_element(),
            Descriptor::Gcm(d) => d.to_xml_element(),
        }
    }

    /// Builds the encryptor this descriptor configures.
    pub fn build_encryptor(&self) -> Result<Arc<dyn AuthenticatedEncryptor>, CryptoError> {
        match self {
            Descriptor::CbcHmac(d) => Ok(Arc::new(d.build_encryptor()?)),
            Descriptor::Gcm(d) => Ok(Arc::new(d.build_encryptor()?)),
        }
    }
}

/// `<masterKey requiresEncryption="true"><value>base64</value></masterKey>`
pub(crate) fn master_key_element(master: &Secret) -> Element {
    let mut value = Element::new(VALUE_ELEMENT);
    value.children.push(XMLNode::Text(master.to_base64()));

    let mut master_key = Element::new(MASTER_KEY_ELEMENT);
    master_key
        .attributes
        .insert(REQUIRES_ENCRYPTION_ATTR.to_string(), "true".to_string());
    master_key.children.push(XMLNode::Element(value));
    master_key
}

/// Reads the master secret back out of a descriptor element.
pub(crate) fn read_master_key(descriptor: &Element) -> Result<Secret, CryptoError> {
    let master_key = descriptor
        .get_child(MASTER_KEY_ELEMENT)
        .ok_or_else(|| CryptoError::MalformedDescriptor("missing masterKey".to_string()))?;
    let value = master_key
        .get_child(VALUE_ELEMENT)
        .and_then(|v| v.get_text())
        .ok_or_else(|| CryptoError::MalformedDescriptor("missing masterKey value".to_string()))?;
    Secret::from_base64(&value)
}

/// Reads the `algorithm` attribute of a named child element.
pub(crate) fn read_algorithm_attr<'a>(
    descriptor: &'a Element,
    child: &str,
) -> Result<&'a str, CryptoError> {
    descriptor
        .get_child(child)
        .and_then(|e| e.attributes.get(ALGORITHM_ATTR))
        .map(String::as_str)
        .ok_or_else(|| CryptoError::MalformedDescriptor(format!("missing {child} algorithm")))
}

/// Builds the common descriptor scaffold.
pub(crate) fn descriptor_element(deserializer_type: &str) -> Element {
    let mut descriptor = Element::new(DESCRIPTOR_ELEMENT);
    descriptor
        .attributes
        .insert(DESERIALIZER_TYPE_ATTR.to_string(), deserializer_type.to_string());
    descriptor
}
