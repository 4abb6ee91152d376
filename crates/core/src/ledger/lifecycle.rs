//! DRAFT -> POSTED -> VOID lifecycle shared by journal entries and source
//! documents.
//!
//! Drafts are deleted, never voided. A posted record is voided at most once.
//! Source documents layer settlement states (partially paid, paid) on top of
//! the posted stage; a settled document cannot be voided.

use super::error::LedgerError;
use super::types::JournalStatus;

/// Coarse lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Editable and deletable.
    Draft,
    /// In the ledger; may be voided.
    Posted,
    /// Terminal.
    Void,
}

/// A status that follows the posting lifecycle.
pub trait Postable {
    /// Stage the status belongs to.
    fn stage(&self) -> LifecycleStage;

    /// Label used in error messages.
    fn label(&self) -> String;

    /// True when payments or allocations have been applied.
    fn has_settlements(&self) -> bool {
        false
    }

    /// Checks the post transition.
    ///
    /// # Errors
    ///
    /// `PostRequiresDraft` unless the record is a draft.
    fn ensure_can_post(&self) -> Result<(), LedgerError> {
        match self.stage() {
            LifecycleStage::Draft => Ok(()),
            LifecycleStage::Posted | LifecycleStage::Void => {
                Err(LedgerError::PostRequiresDraft(self.label()))
            }
        }
    }

    /// Checks the void transition.
    ///
    /// # Errors
    ///
    /// `CannotVoidDraft` for drafts, `AlreadyVoided` for voided records and
    /// `CannotVoidSettled` for posted records with settlements.
    fn ensure_can_void(&self) -> Result<(), LedgerError> {
        match self.stage() {
            LifecycleStage::Draft => Err(LedgerError::CannotVoidDraft),
            LifecycleStage::Void => Err(LedgerError::AlreadyVoided),
            LifecycleStage::Posted if self.has_settlements() => Err(LedgerError::CannotVoidSettled),
            LifecycleStage::Posted => Ok(()),
        }
    }

    /// Checks deletion.
    ///
    /// # Errors
    ///
    /// `DeleteRequiresDraft` unless the record is a draft.
    fn ensure_can_delete(&self) -> Result<(), LedgerError> {
        match self.stage() {
            LifecycleStage::Draft => Ok(()),
            LifecycleStage::Posted | LifecycleStage::Void => {
                Err(LedgerError::DeleteRequiresDraft(self.label()))
            }
        }
    }
}

impl Postable for JournalStatus {
    fn stage(&self) -> LifecycleStage {
        match self {
            Self::Draft => LifecycleStage::Draft,
            Self::Posted => LifecycleStage::Posted,
            Self::Void => LifecycleStage::Void,
        }
    }

    fn label(&self) -> String {
        self.as_str().to_string()
    }
}

impl JournalStatus {
    /// Returns the status after posting.
    ///
    /// # Errors
    ///
    /// See [`Postable::ensure_can_post`].
    pub fn post(self) -> Result<Self, LedgerError> {
        self.ensure_can_post()?;
        Ok(Self::Posted)
    }

    /// Returns the status after voiding.
    ///
    /// # Errors
    ///
    /// See [`Postable::ensure_can_void`].
    pub fn void(self) -> Result<Self, LedgerError> {
        self.ensure_can_void()?;
        Ok(Self::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_posts() {
        assert_eq!(JournalStatus::Draft.post().unwrap(), JournalStatus::Posted);
    }

    #[test]
    fn test_posted_cannot_post_again() {
        let err = JournalStatus::Posted.post().unwrap_err();
        assert!(matches!(err, LedgerError::PostRequiresDraft(ref s) if s == "POSTED"));
    }

    #[test]
    fn test_void_cannot_post() {
        assert!(matches!(
            JournalStatus::Void.post(),
            Err(LedgerError::PostRequiresDraft(_))
        ));
    }

    #[test]
    fn test_posted_voids_once() {
        let voided = JournalStatus::Posted.void().unwrap();
        assert_eq!(voided, JournalStatus::Void);
        assert!(matches!(voided.void(), Err(LedgerError::AlreadyVoided)));
    }

    #[test]
    fn test_draft_is_deleted_not_voided() {
        assert!(matches!(
            JournalStatus::Draft.void(),
            Err(LedgerError::CannotVoidDraft)
        ));
        assert!(JournalStatus::Draft.ensure_can_delete().is_ok());
    }

    #[test]
    fn test_only_drafts_delete() {
        assert!(matches!(
            JournalStatus::Posted.ensure_can_delete(),
            Err(LedgerError::DeleteRequiresDraft(_))
        ));
        assert!(matches!(
            JournalStatus::Void.ensure_can_delete(),
            Err(LedgerError::DeleteRequiresDraft(_))
        ));
    }
}
