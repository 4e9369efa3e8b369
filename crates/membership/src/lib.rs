//! Dynamic cluster membership for Flock nodes
//!
//! This crate provides:
//! - Member descriptor and identity types (MemberId, Member)
//! - A registry of known peers with liveness timestamps
//! - Periodic reconciliation against a pluggable member provider
//! - Single-slot membership and message observers

pub mod config;
pub mod error;
pub mod listener;
pub mod local;
pub mod member;
pub mod provider;
pub mod registry;
pub mod service;

pub use config::MembershipProperties;
pub use error::{MemberProviderError, MemberProviderErrorKind, MembershipError};
pub use listener::{ListenerSet, MembershipListener, MessageListener};
pub use local::LocalMemberManager;
pub use member::{Member, MemberId};
pub use provider::MemberProvider;
pub use registry::MembershipRegistry;
pub use service::MembershipService;
