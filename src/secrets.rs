/*!
 * Secret-store collaborator.
 *
 * The translator never stores credentials. It asks a secret store for the
 * plaintext token at the start of each run and drops it when the run ends.
 * Stores report failure by returning an empty string.
 */

use async_trait::async_trait;

/// Source of plaintext API tokens
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Decrypt a stored secret; an empty result means decryption failed
    async fn decrypt(&self, secret: &str) -> String;
}

/// Store whose secrets are already plaintext (CLI flags, environment, config file)
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextSecretStore;

#[async_trait]
impl SecretStore for PlaintextSecretStore {
    async fn decrypt(&self, secret: &str) -> String {
        secret.trim().to_string()
    }
}
