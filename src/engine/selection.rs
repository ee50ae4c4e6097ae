//! Active-translation selection.
//!
//! Every function here works on one open store transaction and only decides
//! which records to create and which flags to flip. Commit and retry belong to
//! the engine.

use super::error::SharingError;
use super::{
    FlagChange,
    MergeEvent,
    SelectionOutcome,
    Submission,
};
use crate::resolver::ContextInfo;
use crate::store::{
    StoreError,
    StoreTransaction,
    check_uniqueness,
};
use crate::types::{
    NewRecord,
    RecordId,
    Scope,
    Side,
    SubmitterId,
};

/// tracing target for merge events, kept apart from ordinary demotions.
pub const AUDIT_TARGET: &str = "translation_sharing::audit";

/// Flag flips and merges done by one call, in order.
#[derive(Debug, Default)]
struct Journal {
    /// 実際に値が変わったフラグのみ
    changes: Vec<FlagChange>,
    merged: Vec<MergeEvent>,
}

impl Journal {
    /// フラグを変更し、値が変わった場合だけ記録する
    fn flip<Tx: StoreTransaction>(
        &mut self,
        tx: &mut Tx,
        record: RecordId,
        side: Side,
        active: bool,
    ) -> Result<(), StoreError> {
        if tx.set_active(record, side, active)? {
            tracing::debug!(%record, %side, active, "Flag changed");
            self.changes.push(FlagChange { record, side, active });
        }
        Ok(())
    }
}

/// The active records a call reads before deciding anything.
#[derive(Debug, Clone, Copy)]
struct Slots {
    /// Domain-wide record active on the context's side.
    current: Option<RecordId>,
    /// Override active in the context.
    diverged: Option<RecordId>,
    /// Domain-wide record active on the other side.
    other: Option<RecordId>,
}

impl Slots {
    /// Context の Side から見た現在のアクティブレコード
    fn read<Tx: StoreTransaction>(tx: &Tx, context: &ContextInfo) -> Self {
        let slots = Self {
            current: tx.find_active_domain_wide(context.side).map(|r| r.id),
            diverged: tx.find_active_context_bound(&context.id, context.side).map(|r| r.id),
            other: tx.find_active_domain_wide(context.side.other()).map(|r| r.id),
        };
        tracing::debug!(
            context = %context.id,
            current = ?slots.current,
            diverged = ?slots.diverged,
            other = ?slots.other,
            "Read active records"
        );
        slots
    }
}

/// Makes `submission.translations` the active translation of the context's side.
pub(super) fn set_active_translation<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    submission: &Submission,
) -> Result<SelectionOutcome, SharingError> {
    let slots = Slots::read(tx, context);
    let mut journal = Journal::default();

    let (target, created) = match find_match(tx, context, &submission.translations) {
        Some(id) => {
            tracing::debug!(record = %id, "Reusing record with identical text");
            (id, false)
        }
        None => (create(tx, submission, Scope::DomainWide)?, true),
    };

    activate(tx, context, slots, target, submission.propagate, &mut journal)?;
    let target = converge(tx, context, target, &mut journal)?;
    finish(tx, context, target, created, journal)
}

/// Binds the text to the context only. Domain-wide records are left alone.
pub(super) fn set_diverged_translation<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    submission: &Submission,
) -> Result<SelectionOutcome, SharingError> {
    let side = context.side;
    let slots = Slots::read(tx, context);
    let mut journal = Journal::default();

    if let Some(current) = slots.current
        && tx.get(current).is_some_and(|r| r.has_text(&submission.translations))
    {
        tracing::debug!(record = %current, "Text equals the shared translation, dropping override");
        if let Some(diverged) = slots.diverged {
            journal.flip(tx, diverged, side, false)?;
        }
        return finish(tx, context, current, false, journal);
    }

    let scope = Scope::ContextBound(context.id.clone());
    let existing = tx.find_exact_text(&scope, &submission.translations).map(|r| r.id);
    let (target, created) = match existing {
        Some(id) => (id, false),
        None => (create(tx, submission, scope)?, true),
    };

    if let Some(diverged) = slots.diverged
        && diverged != target
    {
        journal.flip(tx, diverged, side, false)?;
    }
    journal.flip(tx, target, side, true)?;

    finish(tx, context, target, created, journal)
}

/// Runs the selection with an existing record as the target.
pub(super) fn approve_suggestion<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    record: RecordId,
    reviewer: &SubmitterId,
    propagate: bool,
) -> Result<SelectionOutcome, SharingError> {
    if !tx.get(record).is_some_and(|r| r.scope.is_visible_from(&context.id)) {
        return Err(SharingError::UnknownRecord(record));
    }
    tracing::debug!(%record, %reviewer, context = %context.id, "Approving suggestion");

    let slots = Slots::read(tx, context);
    let mut journal = Journal::default();
    activate(tx, context, slots, record, propagate, &mut journal)?;
    let target = converge(tx, context, record, &mut journal)?;
    finish(tx, context, target, false, journal)
}

/// Stores the text as a suggestion without activating anything.
pub(super) fn submit_suggestion<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    submission: &Submission,
) -> Result<SelectionOutcome, SharingError> {
    let (target, created) = match find_match(tx, context, &submission.translations) {
        Some(id) => (id, false),
        None => (create(tx, submission, Scope::DomainWide)?, true),
    };
    finish(tx, context, target, created, Journal::default())
}

/// Demotes the context's override so reads fall back to the shared translation.
pub(super) fn reset_diverged_translation<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
) -> Result<Vec<FlagChange>, SharingError> {
    let slots = Slots::read(tx, context);
    let mut journal = Journal::default();
    if let Some(diverged) = slots.diverged {
        journal.flip(tx, diverged, context.side, false)?;
    }
    check_partition(tx, context)?;
    Ok(journal.changes)
}

/// Leaves the context's side with no active translation at all.
pub(super) fn clear_current_translation<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
) -> Result<Vec<FlagChange>, SharingError> {
    let slots = Slots::read(tx, context);
    let mut journal = Journal::default();
    for record in [slots.diverged, slots.current].into_iter().flatten() {
        journal.flip(tx, record, context.side, false)?;
    }
    check_partition(tx, context)?;
    Ok(journal.changes)
}

/// In-scope record with exactly this text.
///
/// Preference: active override, active shared record, any shared record,
/// any override of this context. Lower id wins within a rank.
fn find_match<Tx: StoreTransaction>(
    tx: &Tx,
    context: &ContextInfo,
    translations: &[String],
) -> Option<RecordId> {
    let side = context.side;
    tx.records()
        .filter(|r| r.scope.is_visible_from(&context.id) && r.has_text(translations))
        .min_by_key(|r| {
            let rank = match (&r.scope, r.is_active(side)) {
                (Scope::ContextBound(_), true) => 0,
                (Scope::DomainWide, true) => 1,
                (Scope::DomainWide, false) => 2,
                (Scope::ContextBound(_), false) => 3,
            };
            (rank, r.id)
        })
        .map(|r| r.id)
}

/// 提出内容から非アクティブなレコードを作成する
fn create<Tx: StoreTransaction>(
    tx: &mut Tx,
    submission: &Submission,
    scope: Scope,
) -> Result<RecordId, SharingError> {
    let domain = tx.domain().clone();
    let record = tx.create(NewRecord {
        message: submission.message,
        domain,
        translations: submission.translations.clone(),
        submitter: submission.submitter.clone(),
        origin: submission.origin,
        scope,
    })?;
    tracing::debug!(record = %record.id, scope = ?record.scope, "Created translation record");
    Ok(record.id)
}

/// Activates `target` for the context's side, demoting what it supersedes,
/// then shares it with the other side when asked and allowed.
fn activate<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    slots: Slots,
    target: RecordId,
    propagate: bool,
    journal: &mut Journal,
) -> Result<(), SharingError> {
    let side = context.side;
    let scope =
        tx.get(target).map(|r| r.scope.clone()).ok_or(SharingError::UnknownRecord(target))?;
    if !scope.is_visible_from(&context.id) {
        return Err(SharingError::InvariantViolation(format!(
            "{target} is bound to a context other than '{}'",
            context.id
        )));
    }

    if let Some(diverged) = slots.diverged
        && diverged != target
    {
        journal.flip(tx, diverged, side, false)?;
    }
    if scope.is_domain_wide()
        && let Some(current) = slots.current
        && current != target
    {
        journal.flip(tx, current, side, false)?;
    }
    journal.flip(tx, target, side, true)?;

    if !propagate {
        return Ok(());
    }
    if !scope.is_domain_wide() {
        tracing::debug!(record = %target, "Overrides are never shared with the other side");
        return Ok(());
    }
    match slots.other {
        None => journal.flip(tx, target, side.other(), true)?,
        Some(other) if other == target => {}
        Some(other) => {
            tracing::debug!(
                record = %target,
                existing = %other,
                "Other side keeps its own translation"
            );
        }
    }
    Ok(())
}

/// Merges the context's override into the shared record when both are active
/// with identical text. The earlier record survives as the domain-wide one.
///
/// Returns the id `target` is known by after the merge.
fn converge<Tx: StoreTransaction>(
    tx: &mut Tx,
    context: &ContextInfo,
    target: RecordId,
    journal: &mut Journal,
) -> Result<RecordId, SharingError> {
    let side = context.side;
    let (Some(diverged), Some(current)) =
        (tx.find_active_context_bound(&context.id, side), tx.find_active_domain_wide(side))
    else {
        return Ok(target);
    };
    if !diverged.has_text(&current.translations) {
        return Ok(target);
    }

    let (survivor, superseded) = if diverged.id < current.id {
        (diverged.id, current.id)
    } else {
        (current.id, diverged.id)
    };
    tx.merge(survivor, superseded, Scope::DomainWide)?;

    tracing::info!(
        target: AUDIT_TARGET,
        %survivor,
        %superseded,
        message = %tx.message(),
        context = %context.id,
        "Merged identical translations"
    );
    journal.merged.push(MergeEvent { survivor, superseded, context: context.id.clone() });

    Ok(if target == superseded { survivor } else { target })
}

/// パーティションを検査し、対象レコードの最新状態で結果を組み立てる
fn finish<Tx: StoreTransaction>(
    tx: &Tx,
    context: &ContextInfo,
    target: RecordId,
    created: bool,
    journal: Journal,
) -> Result<SelectionOutcome, SharingError> {
    check_partition(tx, context)?;
    let record = tx.get(target).cloned().ok_or(SharingError::UnknownRecord(target))?;
    Ok(SelectionOutcome { record, created, changes: journal.changes, merged: journal.merged })
}

/// Uniqueness of active records, and no override of this context active on the other side.
fn check_partition<Tx: StoreTransaction>(
    tx: &Tx,
    context: &ContextInfo,
) -> Result<(), SharingError> {
    check_uniqueness(tx.records()).map_err(SharingError::InvariantViolation)?;
    let other = context.side.other();
    if let Some(record) =
        tx.records().find(|r| r.scope.is_bound_to(&context.id) && r.is_active(other))
    {
        return Err(SharingError::InvariantViolation(format!(
            "override {} of '{}' is active on {other}",
            record.id, context.id
        )));
    }
    Ok(())
}
