// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! XML key manager: creates, reads, and revokes persisted keys.
//!
//! The repository holds two kinds of top-level elements, both version 1:
//!
//! ```text
//! <key id="GUID" version="1">
//!   <creationDate/><activationDate/><expirationDate/>
//!   <descriptor deserializerType="..."> ... </descriptor>
//! </key>
//!
//! <revocation version="1">
//!   <revocationDate/>
//!   <key id="GUID"/>            (or id="*" for a mass revocation)
//!   <reason/>
//! </revocation>
//! ```
//!
//! Timestamps are ISO-8601 UTC. Before an element is persisted, every
//! sub-tree marked with the requires-encryption attribute runs through the
//! configured at-rest encryptor; the reverse pass happens lazily when a key's
//! descriptor is first materialized.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use xmltree::{Element, XMLNode};

use crate::clock::{Clock, SystemClock};
use crate::crypto::Secret;
use crate::descriptors::{
    CbcHmacDescriptor, Descriptor, DeserializerRegistry, GcmDescriptor, DESCRIPTOR_ELEMENT,
};
use crate::xml::{seal_secrets, NullXmlEncryptor, XmlDecryptorActivator, XmlEncryptor};

use super::audit::{AuditEvent, AuditLogger, KeyRingOperation};
use super::config::KeyRingConfig;
use super::error::KeyRingError;
use super::key::Key;
use super::repository::KeyRepository;

pub(crate) const KEY_ELEMENT: &str = "key";
pub(crate) const REVOCATION_ELEMENT: &str = "revocation";
const ID_ATTR: &str = "id";
const VERSION_ATTR: &str = "version";
const REVOKED_ATTR: &str = "revoked";
const CREATION_DATE_ELEMENT: &str = "creationDate";
const ACTIVATION_DATE_ELEMENT: &str = "activationDate";
const EXPIRATION_DATE_ELEMENT: &str = "expirationDate";
const REVOCATION_DATE_ELEMENT: &str = "revocationDate";
const REASON_ELEMENT: &str = "reason";
const ALL_KEYS_ID: &str = "*";

/// What a revocation element targets.
#[derive(Debug)]
enum RevocationTarget {
    Key(Uuid),
    /// Every key created on or before the revocation date.
    AllKeys,
}

#[derive(Debug)]
struct Revocation {
    date: DateTime<Utc>,
    target: RevocationTarget,
}

/// Manages key and revocation elements in a [`KeyRepository`].
pub struct XmlKeyManager {
    repository: Arc<dyn KeyRepository>,
    xml_encryptor: Arc<dyn XmlEncryptor>,
    activator: Arc<XmlDecryptorActivator>,
    deserializers: Arc<DeserializerRegistry>,
    config: KeyRingConfig,
    clock: Arc<dyn Clock>,
    audit: AuditLogger,
}

impl XmlKeyManager {
    /// Creates a manager with the pass-through at-rest encryptor and the
    /// built-in registries. Fails on invalid configuration.
    pub fn new(
        repository: Arc<dyn KeyRepository>,
        config: KeyRingConfig,
    ) -> Result<Self, KeyRingError> {
        config.validate()?;
        Ok(Self {
            repository,
            xml_encryptor: Arc::new(NullXmlEncryptor),
            activator: Arc::new(XmlDecryptorActivator::with_defaults()),
            deserializers: Arc::new(DeserializerRegistry::with_defaults()),
            config,
            clock: Arc::new(SystemClock),
            audit: AuditLogger::new("key-manager"),
        })
    }

    /// Replaces the at-rest XML encryptor.
    pub fn with_xml_encryptor(mut self, encryptor: Arc<dyn XmlEncryptor>) -> Self {
        self.xml_encryptor = encryptor;
        self
    }

    /// Replaces the decryptor registry used when reading keys back.
    pub fn with_decryptor_activator(mut self, activator: Arc<XmlDecryptorActivator>) -> Self {
        self.activator = activator;
        self
    }

    /// Replaces the descriptor deserializer registry.
    pub fn with_deserializers(mut self, deserializers: Arc<DeserializerRegistry>) -> Self {
        self.deserializers = deserializers;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates, persists, and returns a key using the configured activation
    /// delay and lifetime.
    pub fn create_key(&self) -> Result<Arc<Key>, KeyRingError> {
        let now = self.clock.now();
        let activation = now + chrono_duration(self.config.activation_delay)?;
        let expiration = now + chrono_duration(self.config.key_lifetime)?;
        self.create_new_key(activation, expiration)
    }

    /// Creates, persists, and returns a key with an explicit lifecycle.
    #[instrument(skip(self))]
    pub fn create_new_key(
        &self,
        activation: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> Result<Arc<Key>, KeyRingError> {
        let id = Uuid::new_v4();
        // Rebuilds request keys activating "now"; a creation stamp taken a
        // tick later would invert the lifecycle order, so clamp it.
        let creation = self.clock.now().min(activation);

        let descriptor = self.new_descriptor()?;
        let mut element = key_element(id, creation, activation, expiration, &descriptor);
        seal_secrets(&mut element, self.xml_encryptor.as_ref())?;
        self.repository
            .store_element(element, &format!("key-{id}"))?;

        self.audit.log(
            AuditEvent::new(KeyRingOperation::KeyCreated)
                .with_key(id)
                .with_details(format!("activation={activation}, expiration={expiration}")),
        );

        let key = Key::new(id, creation, activation, expiration, descriptor)?;
        Ok(Arc::new(key))
    }

    /// Full repository scan: parses every key element, applies every
    /// revocation element, and returns the materialized keys. Descriptors
    /// stay in XML form until first encryptor use.
    pub fn get_all_keys(&self) -> Result<Vec<Arc<Key>>, KeyRingError> {
        let elements = self.repository.get_all_elements()?;

        let mut keys: Vec<Arc<Key>> = Vec::new();
        let mut revocations: Vec<Revocation> = Vec::new();

        for element in &elements {
            match element.name.as_str() {
                KEY_ELEMENT => match self.parse_key_element(element) {
                    Ok(key) => keys.push(key),
                    Err(error) => {
                        warn!(%error, "skipping unreadable key element");
                    }
                },
                REVOCATION_ELEMENT => match parse_revocation_element(element) {
                    Ok(revocation) => revocations.push(revocation),
                    Err(error) => {
                        warn!(%error, "skipping unreadable revocation element");
                    }
                },
                other => {
                    debug!(element = other, "ignoring unknown repository element");
                }
            }
        }

        apply_revocations(&keys, &revocations);
        debug!(
            keys = keys.len(),
            revocations = revocations.len(),
            "key repository scan complete"
        );
        Ok(keys)
    }

    /// Persists a revocation of a single key.
    pub fn revoke_key(&self, id: Uuid, reason: Option<&str>) -> Result<(), KeyRingError> {
        let element = revocation_element(self.clock.now(), Some(id), reason);
        self.repository
            .store_element(element, &format!("revocation-{id}"))?;
        self.audit.log(
            AuditEvent::new(KeyRingOperation::KeyRevoked)
                .with_key(id)
                .with_details(reason.unwrap_or_default()),
        );
        Ok(())
    }

    /// Persists a mass revocation of every key created on or before
    /// `cut_off`.
    pub fn revoke_all_keys(
        &self,
        cut_off: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<(), KeyRingError> {
        let element = revocation_element(cut_off, None, reason);
        self.repository
            .store_element(element, "revocation-all")?;
        self.audit.log(
            AuditEvent::new(KeyRingOperation::MassRevocation)
                .with_details(format!("cut_off={cut_off}")),
        );
        Ok(())
    }

    fn new_descriptor(&self) -> Result<Descriptor, KeyRingError> {
        let master = Secret::random(crate::crypto::MASTER_SECRET_MIN_SIZE)?;
        let encryption = self.config.encryption_algorithm;
        let descriptor = if encryption.is_cbc() {
            Descriptor::CbcHmac(CbcHmacDescriptor::new(
                encryption,
                self.config.validation_algorithm,
                master,
            )?)
        } else {
            Descriptor::Gcm(GcmDescriptor::new(encryption, master)?)
        };
        Ok(descriptor)
    }

    fn parse_key_element(&self, element: &Element) -> Result<Arc<Key>, KeyRingError> {
        let version = element
            .attributes
            .get(VERSION_ATTR)
            .ok_or_else(|| KeyRingError::MalformedElement("key without version".to_string()))?;
        if version != "1" {
            return Err(KeyRingError::MalformedElement(format!(
                "unsupported key version {version}"
            )));
        }

        let id = parse_id_attr(element)?;
        let creation = read_timestamp(element, CREATION_DATE_ELEMENT)?;
        let activation = read_timestamp(element, ACTIVATION_DATE_ELEMENT)?;
        let expiration = read_timestamp(element, EXPIRATION_DATE_ELEMENT)?;
        let descriptor = element
            .get_child(DESCRIPTOR_ELEMENT)
            .ok_or_else(|| {
                KeyRingError::MalformedElement(format!("key {id} without descriptor"))
            })?
            .clone();

        let key = Key::deferred(
            id,
            creation,
            activation,
            expiration,
            descriptor,
            Arc::clone(&self.activator),
            Arc::clone(&self.deserializers),
        );
        if element
            .attributes
            .get(REVOKED_ATTR)
            .is_some_and(|v| v == "true")
        {
            key.set_revoked();
        }
        Ok(Arc::new(key))
    }
}

/// Marks keys targeted by the parsed revocation elements.
///
/// A mass revocation covers keys created on or before its date (inclusive
/// boundary); a per-key revocation covers the named key unconditionally.
fn apply_revocations(keys: &[Arc<Key>], revocations: &[Revocation]) {
    for revocation in revocations {
        match revocation.target {
            RevocationTarget::Key(id) => {
                if let Some(key) = keys.iter().find(|k| k.id() == id) {
                    key.set_revoked();
                }
            }
            RevocationTarget::AllKeys => {
                for key in keys.iter().filter(|k| k.creation() <= revocation.date) {
                    key.set_revoked();
                }
            }
        }
    }
}

fn key_element(
    id: Uuid,
    creation: DateTime<Utc>,
    activation: DateTime<Utc>,
    expiration: DateTime<Utc>,
    descriptor: &Descriptor,
) -> Element {
    let mut element = Element::new(KEY_ELEMENT);
    element.attributes.insert(ID_ATTR.to_string(), id.to_string());
    element
        .attributes
        .insert(VERSION_ATTR.to_string(), "1".to_string());
    element
        .children
        .push(XMLNode::Element(timestamp_element(
            CREATION_DATE_ELEMENT,
            creation,
        )));
    element
        .children
        .push(XMLNode::Element(timestamp_element(
            ACTIVATION_DATE_ELEMENT,
            activation,
        )));
    element
        .children
        .push(XMLNode::Element(timestamp_element(
            EXPIRATION_DATE_ELEMENT,
            expiration,
        )));
    element
        .children
        .push(XMLNode::Element(descriptor.to_xml_element()));
    element
}

fn revocation_element(date: DateTime<Utc>, id: Option<Uuid>, reason: Option<&str>) -> Element {
    let mut element = Element::new(REVOCATION_ELEMENT);
    element
        .attributes
        .insert(VERSION_ATTR.to_string(), "1".to_string());
    element
        .children
        .push(XMLNode::Element(timestamp_element(
            REVOCATION_DATE_ELEMENT,
            date,
        )));

    let mut key = Element::new(KEY_ELEMENT);
    let target = id.map_or_else(|| ALL_KEYS_ID.to_string(), |id| id.to_string());
    key.attributes.insert(ID_ATTR.to_string(), target);
    element.children.push(XMLNode::Element(key));

    if let Some(reason) = reason {
        let mut reason_element = Element::new(REASON_ELEMENT);
        reason_element
            .children
            .push(XMLNode::Text(reason.to_string()));
        element.children.push(XMLNode::Element(reason_element));
    }
    element
}

fn parse_revocation_element(element: &Element) -> Result<Revocation, KeyRingError> {
    let date = read_timestamp(element, REVOCATION_DATE_ELEMENT)?;
    let key = element.get_child(KEY_ELEMENT).ok_or_else(|| {
        KeyRingError::MalformedElement("revocation without key target".to_string())
    })?;
    let id = key.attributes.get(ID_ATTR).ok_or_else(|| {
        KeyRingError::MalformedElement("revocation key target without id".to_string())
    })?;

    let target = if id == ALL_KEYS_ID {
        RevocationTarget::AllKeys
    } else {
        RevocationTarget::Key(parse_uuid(id)?)
    };
    Ok(Revocation { date, target })
}

fn timestamp_element(name: &str, value: DateTime<Utc>) -> Element {
    let mut element = Element::new(name);
    element
        .children
        .push(XMLNode::Text(format_timestamp(value)));
    element
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_timestamp(element: &Element, child: &str) -> Result<DateTime<Utc>, KeyRingError> {
    let text = element
        .get_child(child)
        .and_then(|e| e.get_text())
        .ok_or_else(|| KeyRingError::MalformedElement(format!("missing {child}")))?;
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KeyRingError::MalformedElement(format!("bad {child}: {e}")))
}

fn parse_id_attr(element: &Element) -> Result<Uuid, KeyRingError> {
    let id = element
        .attributes
        .get(ID_ATTR)
        .ok_or_else(|| KeyRingError::MalformedElement("key without id".to_string()))?;
    parse_uuid(id)
}

fn parse_uuid(id: &str) -> Result<Uuid, KeyRingError> {
    Uuid::parse_str(id).map_err(|e| KeyRingError::MalformedElement(format!("bad key id: {e}")))
}

fn chrono_duration(value: std::time::Duration) -> Result<chrono::Duration, KeyRingError> {
    chrono::Duration::from_std(value)
        .map_err(|_| KeyRingError::Configuration("duration out of range".to_string()))
}
