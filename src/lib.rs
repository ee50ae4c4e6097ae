//! translation-sharing
//!
//! 上流（upstream）と下流（downstream）の Context 間で共有されるメッセージについて、
//! どの翻訳を有効にするかを決め、共有・上書きを管理するエンジン。

pub mod config;
pub mod engine;
pub mod logging;
pub mod projection;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use engine::{
    FlagChange,
    MergeEvent,
    SelectionOutcome,
    SharingEngine,
    SharingError,
    Submission,
};
pub use projection::ImportantTranslations;
pub use registry::{
    MemoryMessageRegistry,
    MessageKey,
    MessageRegistry,
};
pub use resolver::{
    ContextInfo,
    DomainResolver,
    StaticDomainResolver,
};
pub use store::{
    MemoryStore,
    RecordStore,
    StoreError,
    StoreTransaction,
};
