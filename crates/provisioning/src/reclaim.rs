//! Decision tables for the registrar-vs-directory reconciliation that
//! runs when the registrar rejects an add with "already in use".
//!
//! Pure functions: the orchestrator gathers the facts, these decide.
//! The lookup index is the arbiter of ownership; what the registrar
//! believes is advisory only.

use uuid::Uuid;

/// What to do when the registrar says a domain is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimAction {
    /// The directory says the requester already owns it: the add is a
    /// retry, carry on as success.
    ProceedAsOwn,
    /// The directory says someone else owns it: refuse, mutate nothing.
    RejectConflict,
    /// Nobody owns it in the directory — an orphan left behind by a
    /// deleted tenant. Try remove-then-add against the registrar.
    AttemptReclaim,
}

pub fn reclaim_action(owner_in_directory: Option<Uuid>, requester: Uuid) -> ReclaimAction {
    match owner_in_directory {
        Some(owner) if owner == requester => ReclaimAction::ProceedAsOwn,
        Some(_) => ReclaimAction::RejectConflict,
        None => ReclaimAction::AttemptReclaim,
    }
}

/// What to do when the post-reclaim re-add *still* fails, based on
/// whether the status call finds the domain under our project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostReclaimAction {
    /// The domain is attached to our project after all; the failed add
    /// was a duplicate. Treat as success.
    ProceedAttached,
    /// The domain is held somewhere we cannot touch. Give up and ask
    /// for manual removal.
    FailManualRemoval,
}

pub fn post_reclaim_action(attached_to_project: bool) -> PostReclaimAction {
    if attached_to_project {
        PostReclaimAction::ProceedAttached
    } else {
        PostReclaimAction::FailManualRemoval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_domain_proceeds() {
        let me = Uuid::new_v4();
        assert_eq!(reclaim_action(Some(me), me), ReclaimAction::ProceedAsOwn);
    }

    #[test]
    fn test_foreign_owner_rejects() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(reclaim_action(Some(other), me), ReclaimAction::RejectConflict);
    }

    #[test]
    fn test_orphan_attempts_reclaim() {
        let me = Uuid::new_v4();
        assert_eq!(reclaim_action(None, me), ReclaimAction::AttemptReclaim);
    }

    #[test]
    fn test_post_reclaim_table() {
        assert_eq!(post_reclaim_action(true), PostReclaimAction::ProceedAttached);
        assert_eq!(post_reclaim_action(false), PostReclaimAction::FailManualRemoval);
    }
}
