//! テスト用ユーティリティ
//!
//! 複数のテストモジュールで使う共通の Fixture を提供します。
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use rstest::fixture;

use crate::config::SharingSettings;
use crate::engine::{
    SharingEngine,
    Submission,
};
use crate::registry::{
    MemoryMessageRegistry,
    MessageKey,
    MessageRegistry,
};
use crate::resolver::{
    ContextInfo,
    StaticDomainResolver,
};
use crate::store::MemoryStore;
use crate::types::{
    ContextId,
    DomainId,
    MessageId,
    Side,
    SubmitterId,
};

pub(crate) const DOMAIN: &str = "evolution";
/// upstream
pub(crate) const TRUNK: &str = "trunk/fr";
/// upstream
pub(crate) const STABLE: &str = "stable/fr";
/// downstream
pub(crate) const JAMMY: &str = "jammy/fr";
/// downstream
pub(crate) const NOBLE: &str = "noble/fr";
/// upstream, 日本語
pub(crate) const TRUNK_JA: &str = "trunk/ja";

pub(crate) type TestEngine = SharingEngine<MemoryStore, StaticDomainResolver, MemoryMessageRegistry>;

/// 4 つのフランス語 Context と 1 つの日本語 Context を登録したエンジン
pub(crate) struct Fixture {
    pub(crate) engine: TestEngine,
    /// 単数形のみのメッセージ "Open"
    pub(crate) message: MessageId,
    /// 複数形を持つメッセージ "%d file" / "%d files"
    pub(crate) plural_message: MessageId,
}

impl Fixture {
    pub(crate) fn with_settings(settings: SharingSettings) -> Self {
        let resolver = StaticDomainResolver::new()
            .with(ContextInfo::new(TRUNK, DOMAIN, Side::Upstream, "fr"))
            .unwrap()
            .with(ContextInfo::new(STABLE, DOMAIN, Side::Upstream, "fr"))
            .unwrap()
            .with(ContextInfo::new(JAMMY, DOMAIN, Side::Downstream, "fr"))
            .unwrap()
            .with(ContextInfo::new(NOBLE, DOMAIN, Side::Downstream, "fr"))
            .unwrap()
            .with(ContextInfo::new(TRUNK_JA, DOMAIN, Side::Upstream, "ja"))
            .unwrap();

        let registry = MemoryMessageRegistry::new();
        let message = registry.resolve(&MessageKey::new(DomainId::new(DOMAIN), "Open"));
        let plural_message = registry
            .resolve(&MessageKey::new(DomainId::new(DOMAIN), "%d file").with_plural("%d files"));

        let engine =
            SharingEngine::with_settings(MemoryStore::new(), resolver, registry, settings).unwrap();
        Self { engine, message, plural_message }
    }

    /// `message` への提出を作成する
    pub(crate) fn submission(&self, context: &str, texts: &[&str]) -> Submission {
        Submission::new(
            ContextId::new(context),
            self.message,
            SubmitterId::new("alice"),
            texts.iter().map(ToString::to_string).collect(),
        )
    }
}

#[fixture]
pub(crate) fn fixture() -> Fixture {
    Fixture::with_settings(SharingSettings::default())
}
