//! Hour-credit ledger and payment-gated marketplace core.
//!
//! Students buy prepaid volunteering hours, log time against opportunities
//! they were accepted to, and pay for internship confirmations and
//! certification courses. Every paid transition takes a
//! [`payment_gateway::VerifiedPayment`] and is applied at most once per
//! gateway order.
//!
//! ```text
//! purchase_package ─▶ gateway order ─▶ client pays ─▶ confirm_package ─▶ ledger credit
//! submit_hours ─▶ ledger debit ─▶ approve_log | reject_log (refund)
//! ```
//!
//! All state lives behind one lock in [`Marketplace`] and is persisted as a
//! single snapshot through a [`Store`].

mod catalog;
mod certification;
mod error;
mod internship;
mod issuance;
mod journal;
pub mod ledger;
mod marketplace;
mod orders;
mod package;
mod pricing;
mod store;
mod types;

pub use error::{MarketplaceError, Result};
pub use issuance::{
    CertificateGrant, CertificateMailer, CertificateRenderer, IssuanceContext, LogMailer,
    RenderedCertificate, TextCertificateRenderer, DEFAULT_ORGANIZATION,
};
pub use marketplace::{Marketplace, MarketplaceStats};
pub use orders::{Checkout, ConfirmationRecord, OrderPurpose, PaymentOutcome, PendingOrder};
pub use pricing::PricingConfig;
pub use store::{EncryptedStore, MarketplaceData, MemoryStore, Store};
pub use types::*;
