//! Core types and the vault walkthrough for kvdemo.
//!
//! The walkthrough ([`KeyVaultSample`]) only talks to two collaborators:
//! [`VaultManagement`] for resource groups and vault lifecycle, and
//! [`VaultData`] for keys and secrets. Real implementations live in
//! `kvdemo-azure`; [`testing`] has in-memory ones.
//!
//! ```rust,ignore
//! use kvdemo_core::{KeyVaultSample, SampleConfig};
//!
//! let sample = KeyVaultSample::new(session, management, data, SampleConfig::default());
//! let succeeded = sample.run().await;
//! ```

pub mod credentials;
pub mod environment;
pub mod error;
pub mod model;
pub mod naming;
pub mod sample;
pub mod scope;
pub mod session;
pub mod testing;
pub mod traits;

pub use credentials::{AUTH_LOCATION_ENV, Credentials};
pub use environment::{CloudEndpoints, CloudEnvironment};
pub use error::{Error, ErrorKind, Result};
pub use model::{
    AccessPolicySpec, KeyBundle, KeyOperation, KeyPermission, KeySpec, KeyType, PolicyGrant,
    ResourceGroup, SecretAttributes, SecretBundle, SecretId, SecretItem, SecretPermission, Sku,
    Vault, VaultSpec, VaultUpdate,
};
pub use naming::SampleNames;
pub use sample::{KeyVaultSample, SampleConfig, SampleReport};
pub use scope::VaultScope;
pub use session::Session;
pub use traits::{VaultData, VaultManagement};
