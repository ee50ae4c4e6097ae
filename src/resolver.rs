//! Domain Resolver
//!
//! Context から翻訳ドメインと Side を引く読み取り専用のインターフェース。

use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::types::{
    ContextId,
    DomainId,
    Side,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown context: {0}")]
    UnknownContext(ContextId),

    #[error("Context already registered: {0}")]
    DuplicateContext(ContextId),
}

/// Context の所属情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub id: ContextId,
    pub domain: DomainId,
    pub side: Side,
    /// 言語コード（例: "fr", "pt-BR"）。複数形の数の決定に使う。
    pub language: String,
}

impl ContextInfo {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        side: Side,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: ContextId::new(id),
            domain: DomainId::new(domain),
            side,
            language: language.into(),
        }
    }
}

/// Context → Domain / Side の解決
pub trait DomainResolver {
    /// # Errors
    /// 未登録の Context
    fn context(&self, context: &ContextId) -> Result<ContextInfo, ResolveError>;

    /// 同じ Domain・同じ Side に属する Context を列挙する
    fn sibling_contexts(&self, domain: &DomainId, side: Side) -> Vec<ContextId>;

    fn domain_of(&self, context: &ContextId) -> Result<DomainId, ResolveError> {
        self.context(context).map(|info| info.domain)
    }

    fn side_of(&self, context: &ContextId) -> Result<Side, ResolveError> {
        self.context(context).map(|info| info.side)
    }
}

/// 登録済みの Context を保持するだけの Resolver
#[derive(Debug, Clone, Default)]
pub struct StaticDomainResolver {
    /// 登録された Context
    contexts: BTreeMap<ContextId, ContextInfo>,
}

impl StaticDomainResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context を登録する
    ///
    /// # Errors
    /// 同じ ID の Context が既に登録されている
    pub fn register(&mut self, info: ContextInfo) -> Result<(), ResolveError> {
        if self.contexts.contains_key(&info.id) {
            return Err(ResolveError::DuplicateContext(info.id));
        }
        tracing::debug!(context = %info.id, domain = %info.domain, side = %info.side, "Registered context");
        self.contexts.insert(info.id.clone(), info);
        Ok(())
    }

    /// ビルダー形式で登録する
    ///
    /// # Errors
    /// 同じ ID の Context が既に登録されている
    pub fn with(mut self, info: ContextInfo) -> Result<Self, ResolveError> {
        self.register(info)?;
        Ok(self)
    }
}

impl DomainResolver for StaticDomainResolver {
    fn context(&self, context: &ContextId) -> Result<ContextInfo, ResolveError> {
        self.contexts
            .get(context)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownContext(context.clone()))
    }

    fn sibling_contexts(&self, domain: &DomainId, side: Side) -> Vec<ContextId> {
        self.contexts
            .values()
            .filter(|info| &info.domain == domain && info.side == side)
            .map(|info| info.id.clone())
            .collect()
    }
}
