//! Provisioning orchestrators: the workflows that keep the registrar,
//! the email identity provider, and the tenant directory consistent.
//!
//! Each workflow is a single sequential chain of calls with a strict
//! split between mandatory steps (directory mutations, ownership
//! checks — failure aborts the request) and best-effort steps
//! (external cleanup, DNS auto-sync — failure is logged and reported
//! as a warning while the workflow still succeeds).

pub mod dns_sync;
pub mod domain;
pub mod email;
pub mod reclaim;

pub use dns_sync::{DnsSyncReport, DnsSyncWarning, DnsSynchronizer};
pub use domain::{
    AddDomainResponse, DomainOrchestrator, RemoveDomainResponse, VerifyDomainResponse,
};
pub use email::{
    DisableEmailResponse, EmailOrchestrator, ForwardToCalResponse, SetupEmailResponse,
};
