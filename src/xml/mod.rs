// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! XML element plumbing and the at-rest encryption seams.
//!
//! Key material is persisted as XML elements. Sub-trees that hold secrets are
//! marked with the well-known [`REQUIRES_ENCRYPTION_ATTR`] attribute; before
//! an element reaches the repository, every marked sub-tree is passed through
//! an [`XmlEncryptor`] and replaced by an `<encryptedSecret>` envelope naming
//! the [`XmlDecryptor`] that can reverse it. OS-specific encryptors (DPAPI,
//! certificates) plug in behind these traits; the built-in pair is the
//! pass-through [`NullXmlEncryptor`] / [`NullXmlDecryptor`].

use std::collections::HashMap;
use std::sync::Arc;

use xmltree::{Element, XMLNode};

/// Namespace URN that scopes the reserved attribute and envelope names.
pub const PROTECTION_NAMESPACE: &str = "urn:cloak:keyring";

/// Marker attribute: the element's sub-tree must be encrypted at rest.
pub const REQUIRES_ENCRYPTION_ATTR: &str = "requiresEncryption";

/// Envelope element wrapped around an encrypted sub-tree.
pub const ENCRYPTED_SECRET_ELEMENT: &str = "encryptedSecret";

/// Envelope attribute naming the decryptor able to reverse the encryption.
pub const DECRYPTOR_TYPE_ATTR: &str = "decryptorType";

/// Type string registered for [`NullXmlDecryptor`].
pub const NULL_DECRYPTOR_TYPE: &str = "cloak::xml::NullXmlDecryptor";

/// Errors from XML handling and the at-rest encryption pass.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An `<encryptedSecret>` envelope names a decryptor nobody registered.
    #[error("unknown XML decryptor type: {0}")]
    UnknownDecryptor(String),

    /// The at-rest encryptor failed.
    #[error("XML encryption failed: {0}")]
    Encryption(String),

    /// The at-rest decryptor failed.
    #[error("XML decryption failed: {0}")]
    Decryption(String),

    /// An element does not have the expected shape.
    #[error("malformed XML element: {0}")]
    Malformed(String),
}

/// Result of encrypting a sub-tree: the replacement element plus the type
/// string of the decryptor that can reverse it.
pub struct EncryptedXml {
    pub element: Element,
    pub decryptor_type: String,
}

/// Encrypts an XML sub-tree for storage at rest.
pub trait XmlEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &Element) -> Result<EncryptedXml, XmlError>;
}

/// Reverses an [`XmlEncryptor`].
pub trait XmlDecryptor: Send + Sync {
    fn decrypt(&self, encrypted: &Element) -> Result<Element, XmlError>;
}

/// Pass-through encryptor for deployments without an at-rest protector.
///
/// Still produces the standard envelope so the read path is uniform across
/// encrypted and unencrypted repositories.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullXmlEncryptor;

impl XmlEncryptor for NullXmlEncryptor {
    fn encrypt(&self, plaintext: &Element) -> Result<EncryptedXml, XmlError> {
        Ok(EncryptedXml {
            element: plaintext.clone(),
            decryptor_type: NULL_DECRYPTOR_TYPE.to_string(),
        })
    }
}

/// Pass-through decryptor paired with [`NullXmlEncryptor`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullXmlDecryptor;

impl XmlDecryptor for NullXmlDecryptor {
    fn decrypt(&self, encrypted: &Element) -> Result<Element, XmlError> {
        Ok(encrypted.clone())
    }
}

/// Closed registry resolving decryptor type strings to instances.
///
/// Persisted envelopes carry a type string, not code; resolution goes through
/// this table so the set of runnable decryptors stays explicit and auditable.
pub struct XmlDecryptorActivator {
    decryptors: HashMap<String, Arc<dyn XmlDecryptor>>,
}

impl XmlDecryptorActivator {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            decryptors: HashMap::new(),
        }
    }

    /// Registry with the built-in pass-through decryptor.
    pub fn with_defaults() -> Self {
        let mut activator = Self::new();
        activator.register(NULL_DECRYPTOR_TYPE, Arc::new(NullXmlDecryptor));
        activator
    }

    /// Registers a decryptor under its type string.
    pub fn register(&mut self, decryptor_type: impl Into<String>, decryptor: Arc<dyn XmlDecryptor>) {
        self.decryptors.insert(decryptor_type.into(), decryptor);
    }

    /// Resolves a type string.
    pub fn resolve(&self, decryptor_type: &str) -> Result<Arc<dyn XmlDecryptor>, XmlError> {
        self.decryptors
            .get(decryptor_type)
            .cloned()
            .ok_or_else(|| XmlError::UnknownDecryptor(decryptor_type.to_string()))
    }
}

impl Default for XmlDecryptorActivator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// True if the element itself is marked as requiring encryption.
fn is_marked(element: &Element) -> bool {
    element
        .attributes
        .get(REQUIRES_ENCRYPTION_ATTR)
        .is_some_and(|v| v == "true")
}

/// True if any element in the sub-tree is marked as requiring encryption.
pub fn requires_encryption(element: &Element) -> bool {
    if is_marked(element) {
        return true;
    }
    element
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .any(requires_encryption)
}

/// Replaces every marked sub-tree under `element` with an encrypted envelope.
///
/// The root itself is never replaced; markers live on descendants (the
/// descriptor's master-key element).
pub fn seal_secrets(element: &mut Element, encryptor: &dyn XmlEncryptor) -> Result<(), XmlError> {
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            if is_marked(child) {
                let sealed = encryptor.encrypt(child)?;
                let mut envelope = Element::new(ENCRYPTED_SECRET_ELEMENT);
                envelope
                    .attributes
                    .insert(DECRYPTOR_TYPE_ATTR.to_string(), sealed.decryptor_type);
                envelope.children.push(XMLNode::Element(sealed.element));
                *child = envelope;
            } else {
                seal_secrets(child, encryptor)?;
            }
        }
    }
    Ok(())
}

/// Reverses [`seal_secrets`]: every `<encryptedSecret>` envelope under
/// `element` is decrypted through the activator and substituted back.
pub fn open_secrets(
    element: &mut Element,
    activator: &XmlDecryptorActivator,
) -> Result<(), XmlError> {
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            if child.name == ENCRYPTED_SECRET_ELEMENT {
                let decryptor_type = child
                    .attributes
                    .get(DECRYPTOR_TYPE_ATTR)
                    .ok_or_else(|| {
                        XmlError::Malformed("encryptedSecret without decryptorType".to_string())
                    })?
                    .clone();
                let inner = child
                    .children
                    .iter()
                    .filter_map(XMLNode::as_element)
                    .next()
                    .cloned()
                    .ok_or_else(|| {
                        XmlError::Malformed("encryptedSecret without payload".to_string())
                    })?;
                let decryptor = activator.resolve(&decryptor_type)?;
                *child = decryptor.decrypt(&inner)?;
            } else {
                open_secrets(child, activator)?;
            }
        }
    }
    Ok(())
}

/// Renders an element in a canonical text form: attributes sorted by name,
/// whitespace-only text dropped, comments stripped.
///
/// Used to compare elements for equivalence; persistence uses the regular
/// writer.
pub fn to_canonical_string(element: &Element) -> String {
    let mut out = String::new();
    write_canonical(element, &mut out);
    out
}

fn write_canonical(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);

    let mut attrs: Vec<_> = element.attributes.iter().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(value, out);
        out.push('"');
    }

    let mut body = String::new();
    for node in &element.children {
        match node {
            XMLNode::Element(child) => write_canonical(child, &mut body),
            XMLNode::Text(text) | XMLNode::CData(text) => {
                if !text.trim().is_empty() {
                    escape_into(text.trim(), &mut body);
                }
            }
            _ => {}
        }
    }

    if body.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        out.push_str(&body);
        out.push_str("</");
        out.push_str(&element.name);
        out.push('>');
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
