//! Engine operations as units the retry loop can re-run on a fresh transaction.

use super::error::SharingError;
use super::{
    FlagChange,
    SelectionOutcome,
    Submission,
    selection,
};
use crate::resolver::ContextInfo;
use crate::store::StoreTransaction;
use crate::types::{
    RecordId,
    SubmitterId,
};

/// One engine call, applied to a transaction opened by the retry loop.
///
/// `apply` may run several times. It must not have effects outside `tx`.
pub(super) trait Operation {
    /// Value returned once the transaction commits.
    type Output;

    /// Name used in logs.
    const NAME: &'static str;

    /// Reads and writes the partition through `tx`. Does not commit.
    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<Self::Output, SharingError>;
}

/// [`selection::set_active_translation`]
pub(super) struct SetActive<'a>(pub(super) &'a Submission);

impl Operation for SetActive<'_> {
    type Output = SelectionOutcome;

    const NAME: &'static str = "set_active_translation";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<SelectionOutcome, SharingError> {
        selection::set_active_translation(tx, context, self.0)
    }
}

/// [`selection::set_diverged_translation`]
pub(super) struct SetDiverged<'a>(pub(super) &'a Submission);

impl Operation for SetDiverged<'_> {
    type Output = SelectionOutcome;

    const NAME: &'static str = "set_diverged_translation";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<SelectionOutcome, SharingError> {
        selection::set_diverged_translation(tx, context, self.0)
    }
}

/// [`selection::approve_suggestion`]
pub(super) struct Approve<'a> {
    /// Suggestion being approved.
    pub(super) record: RecordId,
    /// Logged with the approval. Never becomes the record's submitter.
    pub(super) reviewer: &'a SubmitterId,
    /// Also activate on the other side, if that side has no default of its own.
    pub(super) propagate: bool,
}

impl Operation for Approve<'_> {
    type Output = SelectionOutcome;

    const NAME: &'static str = "approve_suggestion";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<SelectionOutcome, SharingError> {
        selection::approve_suggestion(tx, context, self.record, self.reviewer, self.propagate)
    }
}

/// [`selection::submit_suggestion`]
pub(super) struct Suggest<'a>(pub(super) &'a Submission);

impl Operation for Suggest<'_> {
    type Output = SelectionOutcome;

    const NAME: &'static str = "submit_suggestion";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<SelectionOutcome, SharingError> {
        selection::submit_suggestion(tx, context, self.0)
    }
}

/// [`selection::reset_diverged_translation`]
pub(super) struct ResetDiverged;

impl Operation for ResetDiverged {
    type Output = Vec<FlagChange>;

    const NAME: &'static str = "reset_diverged_translation";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<Vec<FlagChange>, SharingError> {
        selection::reset_diverged_translation(tx, context)
    }
}

/// [`selection::clear_current_translation`]
pub(super) struct Clear;

impl Operation for Clear {
    type Output = Vec<FlagChange>;

    const NAME: &'static str = "clear_current_translation";

    fn apply<Tx: StoreTransaction>(
        &self,
        tx: &mut Tx,
        context: &ContextInfo,
    ) -> Result<Vec<FlagChange>, SharingError> {
        selection::clear_current_translation(tx, context)
    }
}
