//! Message Registry: assigns one stable `MessageId` per logical source string of a domain.

use std::collections::HashMap;
use std::sync::{
    PoisonError,
    RwLock,
};

use crate::types::{
    DomainId,
    MessageId,
};

/// Source-side identity of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub domain: DomainId,
    pub msgid: String,
    /// Plural source string. Plural messages take one translation per plural form.
    pub msgid_plural: Option<String>,
    /// Disambiguating context (`msgctxt`), if any.
    pub msgctxt: Option<String>,
}

impl MessageKey {
    #[must_use]
    pub fn new(domain: DomainId, msgid: impl Into<String>) -> Self {
        Self { domain, msgid: msgid.into(), msgid_plural: None, msgctxt: None }
    }

    #[must_use]
    pub fn with_plural(mut self, msgid_plural: impl Into<String>) -> Self {
        self.msgid_plural = Some(msgid_plural.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, msgctxt: impl Into<String>) -> Self {
        self.msgctxt = Some(msgctxt.into());
        self
    }

    #[must_use]
    pub const fn is_plural(&self) -> bool {
        self.msgid_plural.is_some()
    }
}

pub trait MessageRegistry {
    /// Returns the id for `key`, assigning a new one on first use.
    fn resolve(&self, key: &MessageKey) -> MessageId;

    /// Returns the id for `key` without assigning one.
    fn lookup(&self, key: &MessageKey) -> Option<MessageId>;

    /// `None` if the id was never assigned.
    fn is_plural(&self, message: MessageId) -> Option<bool>;

    /// Domain the message was registered under. `None` if the id was never assigned.
    fn domain_of(&self, message: MessageId) -> Option<DomainId>;
}

/// 双方向の対応表。常に同じ件数を保つ
#[derive(Debug, Default)]
struct Entries {
    /// key → id
    ids: HashMap<MessageKey, MessageId>,
    /// id → key
    keys: HashMap<MessageId, MessageKey>,
}

#[derive(Debug, Default)]
pub struct MemoryMessageRegistry {
    /// 登録済みのメッセージ
    entries: RwLock<Entries>,
}

impl MemoryMessageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageRegistry for MemoryMessageRegistry {
    fn resolve(&self, key: &MessageKey) -> MessageId {
        if let Some(id) = self.lookup(key) {
            return id;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = entries.ids.get(key) {
            return *id;
        }
        let id = MessageId(entries.ids.len() as u64 + 1);
        entries.ids.insert(key.clone(), id);
        entries.keys.insert(id, key.clone());
        tracing::debug!(domain = %key.domain, msgid = %key.msgid, %id, "Assigned message id");
        id
    }

    fn lookup(&self, key: &MessageKey) -> Option<MessageId> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).ids.get(key).copied()
    }

    fn is_plural(&self, message: MessageId) -> Option<bool> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .get(&message)
            .map(MessageKey::is_plural)
    }

    fn domain_of(&self, message: MessageId) -> Option<DomainId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .get(&message)
            .map(|key| key.domain.clone())
    }
}
