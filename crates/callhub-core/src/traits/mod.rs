//! Collaborator traits defined in `callhub-core` and implemented by other crates.

pub mod call_store;
pub mod credential;
pub mod directory;

pub use call_store::CallStore;
pub use credential::CredentialService;
pub use directory::UserDirectory;
