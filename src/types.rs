//! Core types used throughout the project.

use std::fmt;
use std::time::SystemTime;

use serde::{
    Deserialize,
    Serialize,
};

/// Sharing scope key, stable across container instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainId(pub String);

/// The most specific scope (container instance, language, variant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub String);

/// Stable identity of one source string within a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Translation record identifier. Allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

/// Who submitted a translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmitterId(pub String);

macro_rules! impl_string_id {
    ($($name:ident),*) => {
        $(
            impl $name {
                #[must_use]
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

impl_string_id!(DomainId, ContextId, SubmitterId);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg#{}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec#{}", self.0)
    }
}

/// One of the two independent tracks a translation can be active in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Upstream,
    Downstream,
}

impl Side {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Upstream => Self::Downstream,
            Self::Downstream => Self::Upstream,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("upstream"),
            Self::Downstream => f.write_str("downstream"),
        }
    }
}

/// Scope of a translation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "context")]
pub enum Scope {
    /// Default for every context of the domain.
    DomainWide,
    /// Local override visible only to reads scoped to this context.
    ContextBound(ContextId),
}

impl Scope {
    #[must_use]
    pub const fn is_domain_wide(&self) -> bool {
        matches!(self, Self::DomainWide)
    }

    /// Returns true if the record is bound to exactly `context`.
    #[must_use]
    pub fn is_bound_to(&self, context: &ContextId) -> bool {
        matches!(self, Self::ContextBound(bound) if bound == context)
    }

    /// Returns true if a read or write scoped to `context` can see the record.
    #[must_use]
    pub fn is_visible_from(&self, context: &ContextId) -> bool {
        self.is_domain_wide() || self.is_bound_to(context)
    }
}

/// Per-side `active` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SideFlags {
    pub upstream: bool,
    pub downstream: bool,
}

impl SideFlags {
    #[must_use]
    pub const fn get(self, side: Side) -> bool {
        match side {
            Side::Upstream => self.upstream,
            Side::Downstream => self.downstream,
        }
    }

    pub const fn set(&mut self, side: Side, value: bool) {
        match side {
            Side::Upstream => self.upstream = value,
            Side::Downstream => self.downstream = value,
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            upstream: self.upstream || other.upstream,
            downstream: self.downstream || other.downstream,
        }
    }

    #[must_use]
    pub const fn any(self) -> bool {
        self.upstream || self.downstream
    }
}

/// How a translation entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Imported from a translation file of one side.
    Imported,
    /// Entered by a translator through a submission form.
    Submitted,
    /// Approved by a reviewer.
    Reviewed,
}

/// A candidate translation for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub id: RecordId,
    pub message: MessageId,
    pub domain: DomainId,
    /// Plural forms in order. Singular messages have exactly one.
    pub translations: Vec<String>,
    pub submitter: SubmitterId,
    pub origin: Origin,
    pub created_at: SystemTime,
    pub scope: Scope,
    pub active: SideFlags,
}

impl TranslationRecord {
    #[must_use]
    pub const fn is_active(&self, side: Side) -> bool {
        self.active.get(side)
    }

    /// Exact text comparison over every plural form.
    #[must_use]
    pub fn has_text(&self, translations: &[String]) -> bool {
        self.translations == translations
    }
}

/// Fields of a record that does not exist yet. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub message: MessageId,
    pub domain: DomainId,
    pub translations: Vec<String>,
    pub submitter: SubmitterId,
    pub origin: Origin,
    pub scope: Scope,
}
