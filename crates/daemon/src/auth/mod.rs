pub mod guard;
pub mod pairing;
pub mod token_store;

pub use guard::require_bearer_token;
pub use pairing::PairingManager;
pub use token_store::{TokenFile, TokenPersist, TokenRecord, TokenStore};
