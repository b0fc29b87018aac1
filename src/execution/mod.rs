pub mod hash_signer;
pub mod near;
pub mod registration;
pub mod signer;
pub mod submitter;
pub mod token;

pub use hash_signer::{HashSigner, HttpHashSigner};
pub use near::{LedgerClient, NearConfig, NearRpcClient};
pub use signer::{LocalKeySigner, RemoteSigner, TransactionSigner};
pub use submitter::TransactionSubmitter;
