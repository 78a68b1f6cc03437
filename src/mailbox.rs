//! Mailbox collaborator boundary.
//!
//! The handler talks to a mail store only through [`Mailbox`]. No network
//! client lives in this crate; [`MemoryMailbox`] serves tests and the CLI
//! from pre-split messages.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub type MessageId = u32;

/// Content-Transfer-Encoding of a body or part, numbered like IMAP
/// body structure encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferEncoding {
    #[default]
    #[serde(rename = "7bit")]
    SevenBit,
    #[serde(rename = "8bit")]
    EightBit,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "quoted-printable")]
    QuotedPrintable,
    #[serde(rename = "other")]
    Other,
}

impl TransferEncoding {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => TransferEncoding::SevenBit,
            1 => TransferEncoding::EightBit,
            2 => TransferEncoding::Binary,
            3 => TransferEncoding::Base64,
            4 => TransferEncoding::QuotedPrintable,
            _ => TransferEncoding::Other,
        }
    }
}

/// Primary body type, numbered like IMAP body structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    #[default]
    Text,
    Multipart,
    Message,
    Other,
}

impl BodyType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BodyType::Text,
            1 => BodyType::Multipart,
            2 => BodyType::Message,
            _ => BodyType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    #[serde(default)]
    pub body_type: BodyType,
    #[serde(default)]
    pub encoding: TransferEncoding,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyStructure {
    #[serde(default)]
    pub body_type: BodyType,
    #[serde(default)]
    pub encoding: TransferEncoding,
    /// Immediate sub-parts, empty for single-part messages.
    #[serde(default)]
    pub parts: Vec<PartInfo>,
}

/// An open mail session.
///
/// Sections use IMAP part paths (`"1"`, `"2"`, `"3"`, ...). Text is returned
/// exactly as stored; transfer decoding is the caller's job.
pub trait Mailbox {
    fn search(&mut self, criterion: &str) -> Result<Vec<MessageId>>;

    fn fetch_header(&mut self, id: MessageId) -> Result<String>;

    /// Full body, without the top-level header.
    fn fetch_body(&mut self, id: MessageId) -> Result<String>;

    /// One body part. A section that does not exist yields empty text.
    fn fetch_part(&mut self, id: MessageId, section: &str) -> Result<String>;

    fn structure(&mut self, id: MessageId) -> Result<BodyStructure>;

    fn part_structure(&mut self, id: MessageId, section: &str) -> Result<PartInfo>;

    /// Flag a message for deletion; it disappears on [`Mailbox::expunge`].
    fn delete(&mut self, id: MessageId) -> Result<()>;

    fn expunge(&mut self) -> Result<()>;

    fn close(&mut self) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPart {
    pub text: String,
    #[serde(flatten)]
    pub info: PartInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: MessageId,
    pub header: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub structure: BodyStructure,
    #[serde(default)]
    pub parts: BTreeMap<String, StoredPart>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    messages: Vec<StoredMessage>,
}

/// Mailbox held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    messages: BTreeMap<MessageId, StoredMessage>,
    deleted: BTreeSet<MessageId>,
    closed: bool,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, message: StoredMessage) {
        self.messages.insert(message.id, message);
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_yaml::from_str(content).context("Failed to parse mailbox snapshot")?;
        let mut mailbox = Self::new();
        for message in snapshot.messages {
            mailbox.insert(message);
        }
        Ok(mailbox)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read mailbox snapshot: {}", path.as_ref().display())
        })?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid mailbox snapshot: {}", path.as_ref().display()))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    pub fn is_deleted(&self, id: MessageId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn message(&self, id: MessageId) -> Result<&StoredMessage> {
        self.messages
            .get(&id)
            .ok_or_else(|| anyhow::anyhow!("No message with id {id}"))
    }
}

impl Mailbox for MemoryMailbox {
    fn search(&mut self, criterion: &str) -> Result<Vec<MessageId>> {
        if self.closed {
            anyhow::bail!("Mailbox is closed");
        }
        log::debug!("Searching in-memory mailbox ({criterion}), criterion not applied");
        Ok(self
            .messages
            .keys()
            .filter(|id| !self.deleted.contains(id))
            .copied()
            .collect())
    }

    fn fetch_header(&mut self, id: MessageId) -> Result<String> {
        Ok(self.message(id)?.header.clone())
    }

    fn fetch_body(&mut self, id: MessageId) -> Result<String> {
        Ok(self.message(id)?.body.clone())
    }

    fn fetch_part(&mut self, id: MessageId, section: &str) -> Result<String> {
        let message = self.message(id)?;
        Ok(message
            .parts
            .get(section)
            .map(|p| p.text.clone())
            .unwrap_or_default())
    }

    fn structure(&mut self, id: MessageId) -> Result<BodyStructure> {
        Ok(self.message(id)?.structure.clone())
    }

    fn part_structure(&mut self, id: MessageId, section: &str) -> Result<PartInfo> {
        let message = self.message(id)?;
        message
            .parts
            .get(section)
            .map(|p| p.info)
            .ok_or_else(|| anyhow::anyhow!("Message {id} has no part {section}"))
    }

    fn delete(&mut self, id: MessageId) -> Result<()> {
        self.message(id)?;
        self.deleted.insert(id);
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        for id in std::mem::take(&mut self.deleted) {
            self.messages.remove(&id);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
