//! 同じメッセージへの並行更新と、コミット競合時の再試行

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicU32,
    Ordering,
};
use std::thread;

use common::{
    DOMAIN,
    JAMMY,
    NOBLE,
    STABLE,
    TRUNK,
    assert_unique_active,
    engine_with_store,
    records,
    resolver,
    submit,
};
use googletest::prelude::*;
use rstest::rstest;
use translation_sharing::config::SharingSettings;
use translation_sharing::store::MemoryTransaction;
use translation_sharing::types::{
    ContextId,
    DomainId,
    MessageId,
    NewRecord,
    RecordId,
    Scope,
    Side,
    TranslationRecord,
};
use translation_sharing::{
    MemoryMessageRegistry,
    MemoryStore,
    MessageKey,
    MessageRegistry,
    RecordStore,
    SharingEngine,
    SharingError,
    StoreError,
    StoreTransaction,
};

/// 指定回数だけ commit を競合として失敗させるストア
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    conflicts_left: AtomicU32,
    commits_attempted: AtomicU32,
}

impl FlakyStore {
    fn failing(times: u32) -> Self {
        Self { conflicts_left: AtomicU32::new(times), ..Self::default() }
    }
}

struct FlakyTransaction<'a> {
    inner: MemoryTransaction<'a>,
    store: &'a FlakyStore,
}

impl RecordStore for FlakyStore {
    type Transaction<'a> = FlakyTransaction<'a>;

    fn begin(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<FlakyTransaction<'_>, StoreError> {
        Ok(FlakyTransaction { inner: self.inner.begin(message, domain)?, store: self })
    }

    fn records(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<Vec<TranslationRecord>, StoreError> {
        self.inner.records(message, domain)
    }
}

impl StoreTransaction for FlakyTransaction<'_> {
    fn message(&self) -> MessageId {
        self.inner.message()
    }

    fn domain(&self) -> &DomainId {
        self.inner.domain()
    }

    fn records(&self) -> impl Iterator<Item = &TranslationRecord> {
        self.inner.records()
    }

    fn get(&self, id: RecordId) -> Option<&TranslationRecord> {
        self.inner.get(id)
    }

    fn create(&mut self, record: NewRecord) -> Result<TranslationRecord, StoreError> {
        self.inner.create(record)
    }

    fn set_active(&mut self, id: RecordId, side: Side, active: bool) -> Result<bool, StoreError> {
        self.inner.set_active(id, side, active)
    }

    fn merge(
        &mut self,
        survivor: RecordId,
        superseded: RecordId,
        scope: Scope,
    ) -> Result<TranslationRecord, StoreError> {
        self.inner.merge(survivor, superseded, scope)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.store.commits_attempted.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .store
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict {
                message: self.inner.message(),
                domain: self.inner.domain().clone(),
            });
        }
        self.inner.commit()
    }
}

#[rstest]
#[case::once(1)]
#[case::up_to_limit(2)]
fn test_conflict_is_retried(#[case] conflicts: u32) {
    let (engine, message) = engine_with_store(FlakyStore::failing(conflicts));

    let outcome = engine.set_active_translation(&submit(JAMMY, message, "Ouvrir")).unwrap();

    assert_that!(outcome.created, eq(true));
    assert_that!(engine.store().commits_attempted.load(Ordering::SeqCst), eq(conflicts + 1));
    // 失敗した試行の書き込みは残らない
    let stored = records(&engine, message);
    assert_eq!(stored.len(), 1);
    assert_that!(stored[0].id, eq(outcome.record.id));
}

#[rstest]
fn test_conflict_exhausts_attempts() {
    let (engine, message) = engine_with_store(FlakyStore::failing(u32::MAX));

    let result = engine.set_active_translation(&submit(JAMMY, message, "Ouvrir"));

    let error = result.unwrap_err();
    assert!(error.is_retryable());
    assert!(matches!(error, SharingError::Conflict { attempts: 3, .. }));
    assert_that!(engine.store().commits_attempted.load(Ordering::SeqCst), eq(3));
    assert_that!(records(&engine, message), is_empty());
}

#[rstest]
fn test_attempts_follow_settings() {
    let registry = MemoryMessageRegistry::new();
    let message = registry.resolve(&MessageKey::new(DomainId::new(DOMAIN), "Open"));
    let settings = SharingSettings { max_commit_attempts: 1, ..SharingSettings::default() };
    let engine =
        SharingEngine::with_settings(FlakyStore::failing(1), resolver(), registry, settings).unwrap();

    let result = engine.clear_current_translation(&ContextId::new(JAMMY), message);

    // 変更がなくても commit は呼ばれる
    assert!(matches!(result, Err(SharingError::Conflict { attempts: 1, .. })));
}

#[rstest]
fn test_concurrent_submissions_keep_uniqueness() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 5;

    let registry = MemoryMessageRegistry::new();
    let message = registry.resolve(&MessageKey::new(DomainId::new(DOMAIN), "Open"));
    // 他スレッドの成功回数を超える試行回数を許せば必ず完了する
    let settings = SharingSettings { max_commit_attempts: 64, ..SharingSettings::default() };
    let engine =
        SharingEngine::with_settings(MemoryStore::new(), resolver(), registry, settings).unwrap();
    let contexts = [TRUNK, STABLE, JAMMY, NOBLE];

    thread::scope(|scope| {
        for t in 0..THREADS {
            let engine = &engine;
            let context = contexts[t % contexts.len()];
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let text = format!("Ouvrir {}", (t + round) % 3);
                    let submission = submit(context, message, &text).propagate(round % 2 == 0);
                    if t % 4 == 2 && round == 3 {
                        engine.set_diverged_translation(&submission).unwrap();
                    } else {
                        engine.set_active_translation(&submission).unwrap();
                    }
                }
            });
        }
    });

    let stored = records(&engine, message);
    assert_unique_active(&stored);
    // 同じテキストのレコードは作られすぎない
    let mut per_text: HashMap<(&[String], bool), usize> = HashMap::new();
    for record in &stored {
        *per_text.entry((record.translations.as_slice(), record.scope.is_domain_wide())).or_default() += 1;
    }
    assert!(per_text.values().all(|&n| n == 1), "{per_text:?}");
    for context in contexts {
        let effective = engine.effective(&ContextId::new(context), message).unwrap();
        assert_that!(effective, some(anything()));
    }
}

#[rstest]
fn test_separate_messages_do_not_conflict() {
    const MESSAGES: usize = 16;

    let registry = MemoryMessageRegistry::new();
    let messages: Vec<MessageId> = (0..MESSAGES)
        .map(|i| registry.resolve(&MessageKey::new(DomainId::new(DOMAIN), format!("Message {i}"))))
        .collect();
    let settings = SharingSettings { max_commit_attempts: 1, ..SharingSettings::default() };
    let engine =
        SharingEngine::with_settings(MemoryStore::new(), resolver(), registry, settings).unwrap();

    thread::scope(|scope| {
        for &message in &messages {
            let engine = &engine;
            scope.spawn(move || {
                for text in ["Un", "Deux", "Trois"] {
                    engine
                        .set_active_translation(&submit(JAMMY, message, text).propagate(true))
                        .unwrap();
                }
            });
        }
    });

    for message in messages {
        let effective = engine.effective(&ContextId::new(TRUNK), message).unwrap();
        assert_eq!(effective.map(|r| r.translations), Some(vec!["Un".to_string()]));
        let effective = engine.effective(&ContextId::new(JAMMY), message).unwrap();
        assert_eq!(effective.map(|r| r.translations), Some(vec!["Trois".to_string()]));
    }
}
