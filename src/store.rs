//! Record Store
//!
//! 翻訳レコードの永続化と検索。1 回の選択処理は `(message, domain)` パーティション単位の
//! トランザクションで読み書きし、`commit` 時にバージョン比較で競合を検出する。

mod memory;

use std::collections::HashSet;

use thiserror::Error;

pub use memory::{
    MemoryStore,
    MemoryTransaction,
    StoreSnapshot,
};

use crate::types::{
    ContextId,
    DomainId,
    MessageId,
    NewRecord,
    RecordId,
    Scope,
    Side,
    TranslationRecord,
};

#[derive(Error, Debug)]
pub enum StoreError {
    /// 別のトランザクションが同じパーティションを先に更新した
    #[error("Concurrent update of {message} in domain '{domain}'")]
    Conflict { message: MessageId, domain: DomainId },

    #[error("Store invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Record not found: {0}")]
    UnknownRecord(RecordId),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Failed to read or write snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Failed to access snapshot file: {0}")]
    Io(#[from] std::io::Error),
}

/// レコードストア
pub trait RecordStore {
    type Transaction<'a>: StoreTransaction
    where
        Self: 'a;

    /// `(message, domain)` パーティションのスナップショットを取ってトランザクションを開始する
    fn begin(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<Self::Transaction<'_>, StoreError>;

    /// 読み取り専用: パーティションの全レコード（作成順）
    fn records(
        &self,
        message: MessageId,
        domain: &DomainId,
    ) -> Result<Vec<TranslationRecord>, StoreError>;
}

/// 1 パーティションに対する読み書きの単位
///
/// 書き込みは `commit` まで他のトランザクションから見えない。
/// `commit` せずに破棄した場合は何も反映されない。
pub trait StoreTransaction {
    /// パーティションのメッセージ
    fn message(&self) -> MessageId;

    /// パーティションの Domain
    fn domain(&self) -> &DomainId;

    /// パーティション内の全レコード（作成順）
    fn records(&self) -> impl Iterator<Item = &TranslationRecord>;

    /// このパーティションのレコードのみ
    fn get(&self, id: RecordId) -> Option<&TranslationRecord>;

    /// 新しいレコードを非アクティブな状態で作成する
    fn create(&mut self, record: NewRecord) -> Result<TranslationRecord, StoreError>;

    /// Side のアクティブフラグを変更する。変化があった場合は `true`
    fn set_active(&mut self, id: RecordId, side: Side, active: bool) -> Result<bool, StoreError>;

    /// `superseded` を削除し、`survivor` に `scope` とフラグの和を与える
    fn merge(
        &mut self,
        survivor: RecordId,
        superseded: RecordId,
        scope: Scope,
    ) -> Result<TranslationRecord, StoreError>;

    /// 開始後にパーティションが変更されていれば [`StoreError::Conflict`]
    ///
    /// # Errors
    /// 競合、またはストアが使えない場合
    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;

    /// Side でアクティブな `DomainWide` レコード
    fn find_active_domain_wide(&self, side: Side) -> Option<&TranslationRecord> {
        self.records().find(|r| r.scope.is_domain_wide() && r.is_active(side))
    }

    /// Context に束縛され、Side でアクティブなレコード
    fn find_active_context_bound(
        &self,
        context: &ContextId,
        side: Side,
    ) -> Option<&TranslationRecord> {
        self.records().find(|r| r.scope.is_bound_to(context) && r.is_active(side))
    }

    /// `scope` に完全一致し、テキストが完全一致するレコード
    fn find_exact_text(&self, scope: &Scope, translations: &[String]) -> Option<&TranslationRecord> {
        self.records().find(|r| &r.scope == scope && r.has_text(translations))
    }
}

/// ストア側で検証できる一意性制約
///
/// - Side ごとにアクティブな `DomainWide` は高々 1 件
/// - Context・Side ごとにアクティブな `ContextBound` は高々 1 件
pub fn check_uniqueness<'a>(
    records: impl IntoIterator<Item = &'a TranslationRecord>,
) -> Result<(), String> {
    let mut seen: HashSet<(Option<&ContextId>, Side)> = HashSet::new();
    for record in records {
        for side in [Side::Upstream, Side::Downstream] {
            if !record.is_active(side) {
                continue;
            }
            let slot = match &record.scope {
                Scope::DomainWide => None,
                Scope::ContextBound(context) => Some(context),
            };
            if !seen.insert((slot, side)) {
                return Err(match slot {
                    None => format!(
                        "more than one active domain-wide record for {} on {side} (found {})",
                        record.message, record.id
                    ),
                    Some(context) => format!(
                        "more than one active override for {} in '{context}' on {side} (found {})",
                        record.message, record.id
                    ),
                });
            }
        }
    }
    Ok(())
}
