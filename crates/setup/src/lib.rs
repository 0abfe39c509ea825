//! Credential activation and provider setup: the override store, the
//! validation session state machine, provider probes, and the live service
//! facade consumed by hosts.

pub mod error;
pub mod overrides;
pub mod probe;
pub mod service;
pub mod session;
pub mod validator;

pub use {
    error::ValidationError,
    overrides::OverrideStore,
    probe::{HttpProbe, ProbeRequest, ProviderProbe},
    service::{LiveSetupService, SetupBroadcaster},
    session::{SessionSnapshot, SessionState, ValidationSession},
    validator::{ActivationSink, CredentialValidator},
};
