//! 結合テスト共通のヘルパー

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]
#![allow(missing_docs)]

use translation_sharing::types::{
    ContextId,
    DomainId,
    MessageId,
    RecordId,
    Side,
    SubmitterId,
    TranslationRecord,
};
use translation_sharing::{
    ContextInfo,
    MemoryMessageRegistry,
    MemoryStore,
    MessageKey,
    MessageRegistry,
    RecordStore,
    SharingEngine,
    StaticDomainResolver,
    Submission,
};

pub const DOMAIN: &str = "evolution";
pub const TRUNK: &str = "trunk/fr";
pub const STABLE: &str = "stable/fr";
pub const JAMMY: &str = "jammy/fr";
pub const NOBLE: &str = "noble/fr";

pub type Engine<S = MemoryStore> = SharingEngine<S, StaticDomainResolver, MemoryMessageRegistry>;

/// trunk, stable (upstream) / jammy, noble (downstream)
pub fn resolver() -> StaticDomainResolver {
    StaticDomainResolver::new()
        .with(ContextInfo::new(TRUNK, DOMAIN, Side::Upstream, "fr"))
        .unwrap()
        .with(ContextInfo::new(STABLE, DOMAIN, Side::Upstream, "fr"))
        .unwrap()
        .with(ContextInfo::new(JAMMY, DOMAIN, Side::Downstream, "fr"))
        .unwrap()
        .with(ContextInfo::new(NOBLE, DOMAIN, Side::Downstream, "fr"))
        .unwrap()
}

/// "Open" を登録した Registry と、その MessageId
pub fn registry() -> (MemoryMessageRegistry, MessageId) {
    let registry = MemoryMessageRegistry::new();
    let message = registry.resolve(&MessageKey::new(DomainId::new(DOMAIN), "Open"));
    (registry, message)
}

pub fn engine_with_store<S: RecordStore>(store: S) -> (Engine<S>, MessageId) {
    let (registry, message) = registry();
    (SharingEngine::new(store, resolver(), registry), message)
}

pub fn engine() -> (Engine, MessageId) {
    engine_with_store(MemoryStore::new())
}

pub fn submit(context: &str, message: MessageId, text: &str) -> Submission {
    Submission::new(
        ContextId::new(context),
        message,
        SubmitterId::new("alice"),
        vec![text.to_string()],
    )
}

/// メッセージの全レコード（ID 順）
pub fn records<S: RecordStore>(engine: &Engine<S>, message: MessageId) -> Vec<TranslationRecord> {
    engine.store().records(message, &DomainId::new(DOMAIN)).unwrap()
}

pub fn record<S: RecordStore>(
    engine: &Engine<S>,
    message: MessageId,
    id: RecordId,
) -> Option<TranslationRecord> {
    records(engine, message).into_iter().find(|r| r.id == id)
}

/// 各 Side の有効な DomainWide と、各 Context の有効な上書きが高々 1 件であること
pub fn assert_unique_active(records: &[TranslationRecord]) {
    translation_sharing::store::check_uniqueness(records.iter()).unwrap();
}

