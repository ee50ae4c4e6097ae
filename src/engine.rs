//! Selection engine
//!
//! 提出された翻訳をどのレコードで有効化するかを決定し、`(message, domain)` 単位の
//! 楽観的トランザクションで反映する。競合時は設定された回数まで再試行する。

mod error;
mod operation;
mod selection;
mod validation;

pub use error::SharingError;
pub use selection::AUDIT_TARGET;

use self::operation::Operation;
use crate::config::{
    ConfigError,
    SharingSettings,
};
use crate::projection::{
    self,
    ImportantTranslations,
};
use crate::registry::MessageRegistry;
use crate::resolver::{
    ContextInfo,
    DomainResolver,
};
use crate::store::{
    RecordStore,
    StoreError,
    StoreTransaction,
};
use crate::types::{
    ContextId,
    MessageId,
    Origin,
    RecordId,
    Side,
    SubmitterId,
    TranslationRecord,
};

/// 翻訳の提出内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub context: ContextId,
    pub message: MessageId,
    pub submitter: SubmitterId,
    /// 複数形ごとのテキスト
    pub translations: Vec<String>,
    pub origin: Origin,
    /// もう一方の Side にも反映するか
    pub propagate: bool,
}

impl Submission {
    #[must_use]
    pub fn new(
        context: ContextId,
        message: MessageId,
        submitter: SubmitterId,
        translations: Vec<String>,
    ) -> Self {
        Self { context, message, submitter, translations, origin: Origin::Submitted, propagate: false }
    }

    #[must_use]
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }
}

/// 1 件のフラグ変更
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange {
    pub record: RecordId,
    pub side: Side,
    pub active: bool,
}

/// 同一テキストのレコード統合（監査対象）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEvent {
    pub survivor: RecordId,
    /// 削除されたレコード
    pub superseded: RecordId,
    /// 統合を引き起こした Context
    pub context: ContextId,
}

/// 選択処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// コミット後の対象レコード
    pub record: TranslationRecord,
    /// 対象レコードを新規作成したか
    pub created: bool,
    pub changes: Vec<FlagChange>,
    pub merged: Vec<MergeEvent>,
}

/// 有効な翻訳の選択と共有を行うエンジン
#[derive(Debug)]
pub struct SharingEngine<S, R, M> {
    store: S,
    /// Context → Domain・Side
    resolver: R,
    /// メッセージの Domain と複数形の有無
    registry: M,
    settings: SharingSettings,
}

impl<S: RecordStore, R: DomainResolver, M: MessageRegistry> SharingEngine<S, R, M> {
    /// デフォルト設定でエンジンを作成
    #[must_use]
    pub fn new(store: S, resolver: R, registry: M) -> Self {
        Self { store, resolver, registry, settings: SharingSettings::default() }
    }

    /// # Errors
    /// 設定のバリデーションエラー
    pub fn with_settings(
        store: S,
        resolver: R,
        registry: M,
        settings: SharingSettings,
    ) -> Result<Self, ConfigError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;
        Ok(Self { store, resolver, registry, settings })
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    #[must_use]
    pub const fn registry(&self) -> &M {
        &self.registry
    }

    #[must_use]
    pub const fn settings(&self) -> &SharingSettings {
        &self.settings
    }

    /// 提出されたテキストを Context の Side で有効にする
    ///
    /// 同じテキストのレコードがあれば再利用し、なければ `DomainWide` で作成する。
    /// `propagate` の場合、もう一方の Side に異なる有効レコードがなければそちらでも有効にする。
    pub fn set_active_translation(
        &self,
        submission: &Submission,
    ) -> Result<SelectionOutcome, SharingError> {
        let context = self.prepare(submission)?;
        self.run_atomic(&context, submission.message, &operation::SetActive(submission))
    }

    /// テキストをこの Context だけの上書きとして有効にする
    pub fn set_diverged_translation(
        &self,
        submission: &Submission,
    ) -> Result<SelectionOutcome, SharingError> {
        let context = self.prepare(submission)?;
        self.run_atomic(&context, submission.message, &operation::SetDiverged(submission))
    }

    /// 既存の候補を有効にする
    pub fn approve_suggestion(
        &self,
        context: &ContextId,
        message: MessageId,
        record: RecordId,
        reviewer: &SubmitterId,
        propagate: bool,
    ) -> Result<SelectionOutcome, SharingError> {
        let context = self.resolve(context, message)?;
        self.run_atomic(&context, message, &operation::Approve { record, reviewer, propagate })
    }

    /// 有効化せずに候補として保存する
    pub fn submit_suggestion(
        &self,
        submission: &Submission,
    ) -> Result<SelectionOutcome, SharingError> {
        let context = self.prepare(submission)?;
        self.run_atomic(&context, submission.message, &operation::Suggest(submission))
    }

    /// Context の上書きを解除し、共有の翻訳に戻す
    pub fn reset_diverged_translation(
        &self,
        context: &ContextId,
        message: MessageId,
    ) -> Result<Vec<FlagChange>, SharingError> {
        let context = self.resolve(context, message)?;
        self.run_atomic(&context, message, &operation::ResetDiverged)
    }

    /// Context の Side で有効な翻訳をなくす
    pub fn clear_current_translation(
        &self,
        context: &ContextId,
        message: MessageId,
    ) -> Result<Vec<FlagChange>, SharingError> {
        let context = self.resolve(context, message)?;
        self.run_atomic(&context, message, &operation::Clear)
    }

    /// Context から見た有効レコードの一覧（読み取りのみ）
    pub fn important(
        &self,
        context: &ContextId,
        message: MessageId,
    ) -> Result<ImportantTranslations, SharingError> {
        let context = self.resolver.context(context)?;
        let records = self.store.records(message, &context.domain)?;
        Ok(projection::important(&records, &context))
    }

    /// Context で有効になっていない候補（作成順）
    pub fn suggestions(
        &self,
        context: &ContextId,
        message: MessageId,
    ) -> Result<Vec<TranslationRecord>, SharingError> {
        let context = self.resolver.context(context)?;
        let records = self.store.records(message, &context.domain)?;
        Ok(projection::suggestions(&records, &context))
    }

    /// Context の読み手に見える翻訳
    pub fn effective(
        &self,
        context: &ContextId,
        message: MessageId,
    ) -> Result<Option<TranslationRecord>, SharingError> {
        Ok(self.important(context, message)?.into_effective())
    }

    /// 読み取り系の呼び出し用。テキストの検証はしない
    fn resolve(&self, context: &ContextId, message: MessageId) -> Result<ContextInfo, SharingError> {
        let context = self.resolver.context(context)?;
        self.check_message(&context, message)?;
        Ok(context)
    }

    /// メッセージが Context と同じ Domain に登録されていることを確認し、複数形を持つかを返す
    fn check_message(&self, context: &ContextInfo, message: MessageId) -> Result<bool, SharingError> {
        let (Some(domain), Some(plural)) =
            (self.registry.domain_of(message), self.registry.is_plural(message))
        else {
            return Err(SharingError::UnknownMessage(message));
        };
        if domain != context.domain {
            tracing::debug!(
                %message,
                registered = %domain,
                context = %context.id,
                "Message belongs to another domain"
            );
            return Err(SharingError::UnknownMessage(message));
        }
        Ok(plural)
    }

    /// Context とメッセージを解決し、テキストを検証する。ストアには触れない。
    fn prepare(&self, submission: &Submission) -> Result<ContextInfo, SharingError> {
        let context = self.resolver.context(&submission.context)?;
        let plural = self.check_message(&context, submission.message)?;
        let expected =
            if plural { self.settings.plural_forms_for(&context.language) } else { 1 };
        validation::validate_translations(&submission.translations, expected)?;
        Ok(context)
    }

    /// 1 トランザクションで実行し、競合時は再試行する
    fn run_atomic<O: Operation>(
        &self,
        context: &ContextInfo,
        message: MessageId,
        operation: &O,
    ) -> Result<O::Output, SharingError> {
        let attempts = self.settings.max_commit_attempts;
        for attempt in 1..=attempts {
            let mut tx = self.store.begin(message, &context.domain)?;
            let value = operation.apply(&mut tx, context).inspect_err(|e| log_failure(O::NAME, e))?;
            match tx.commit() {
                Ok(()) => {
                    tracing::debug!(
                        operation = O::NAME,
                        %message,
                        context = %context.id,
                        attempt,
                        "Committed"
                    );
                    return Ok(value);
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::warn!(
                        operation = O::NAME,
                        %message,
                        domain = %context.domain,
                        attempt,
                        "Commit conflict, retrying"
                    );
                }
                Err(e) => {
                    let error = SharingError::from(e);
                    log_failure(O::NAME, &error);
                    return Err(error);
                }
            }
        }
        Err(SharingError::Conflict { message, domain: context.domain.clone(), attempts })
    }
}

/// 不変条件の違反だけは error で出す
fn log_failure(operation: &str, error: &SharingError) {
    match error {
        SharingError::InvariantViolation(detail) => {
            tracing::error!(operation, "Invariant violated: {detail}");
        }
        _ => tracing::debug!(operation, "Rejected: {error}"),
    }
}
