//! Read-side projection of the records of one message.

use serde::Serialize;

use crate::resolver::ContextInfo;
use crate::types::{
    Scope,
    Side,
    TranslationRecord,
};

/// Records that matter to a reader of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantTranslations {
    /// Domain-wide record active on the context's side.
    pub current: Option<TranslationRecord>,
    /// Override active in the context.
    pub diverged: Option<TranslationRecord>,
    /// Domain-wide record active on the other side.
    pub other: Option<TranslationRecord>,
    /// Active overrides of every other context, either side.
    pub elsewhere: Vec<TranslationRecord>,
}

impl ImportantTranslations {
    /// What readers of the context see: the override if any, else the shared record.
    #[must_use]
    pub fn effective(&self) -> Option<&TranslationRecord> {
        self.diverged.as_ref().or(self.current.as_ref())
    }

    #[must_use]
    pub fn into_effective(self) -> Option<TranslationRecord> {
        self.diverged.or(self.current)
    }
}

/// `records` must all belong to one message and to `context`'s domain.
#[must_use]
pub fn important(records: &[TranslationRecord], context: &ContextInfo) -> ImportantTranslations {
    let side = context.side;
    let find_domain_wide = |side: Side| {
        records.iter().find(|r| r.scope.is_domain_wide() && r.is_active(side)).cloned()
    };

    let diverged = records
        .iter()
        .find(|r| r.scope.is_bound_to(&context.id) && r.is_active(side))
        .cloned();
    let elsewhere = records
        .iter()
        .filter(|r| matches!(r.scope, Scope::ContextBound(_)) && r.active.any())
        .filter(|r| diverged.as_ref().is_none_or(|d| d.id != r.id))
        .cloned()
        .collect();

    ImportantTranslations {
        current: find_domain_wide(side),
        diverged,
        other: find_domain_wide(side.other()),
        elsewhere,
    }
}

/// Records visible from the context that are not active on its side, oldest first.
#[must_use]
pub fn suggestions(records: &[TranslationRecord], context: &ContextInfo) -> Vec<TranslationRecord> {
    let mut found: Vec<_> = records
        .iter()
        .filter(|r| r.scope.is_visible_from(&context.id) && !r.is_active(context.side))
        .cloned()
        .collect();
    found.sort_by_key(|r| r.id);
    found
}
