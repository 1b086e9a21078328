//! Keystore for identity persistence
//!
//! Keeps the device identity in the data directory so the same actor id and
//! payload key are used across runs.
//!
//! Stores:
//! - `actor.id`: the actor id as UTF-8 text
//! - `payload.key`: the 32-byte payload key, raw

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use driftdb_core::{ActorId, Identity, KEY_SIZE};

use crate::error::{CliError, CliResult};

/// Filename for the actor id
const ACTOR_FILENAME: &str = "actor.id";

/// Filename for the payload key
const KEY_FILENAME: &str = "payload.key";

/// Loads and saves the device identity
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.to_path_buf(),
        }
    }

    fn actor_path(&self) -> PathBuf {
        self.path.join(ACTOR_FILENAME)
    }

    fn key_path(&self) -> PathBuf {
        self.path.join(KEY_FILENAME)
    }

    /// Load the stored identity or generate and save a new one
    pub fn load_or_generate(&self) -> CliResult<Identity> {
        if self.actor_path().exists() && self.key_path().exists() {
            self.load()
        } else {
            info!("No existing identity found, generating a new one");
            let identity = Identity::generate();
            self.save(&identity)?;
            Ok(identity)
        }
    }

    pub fn load(&self) -> CliResult<Identity> {
        let actor = std::fs::read_to_string(self.actor_path())
            .map_err(|e| CliError::keystore(format!("Failed to read actor file: {}", e)))?;
        let key = std::fs::read(self.key_path())
            .map_err(|e| CliError::keystore(format!("Failed to read key file: {}", e)))?;

        if key.len() != KEY_SIZE {
            return Err(CliError::keystore(format!(
                "Invalid key file: expected {} bytes, got {}",
                KEY_SIZE,
                key.len()
            )));
        }

        let identity = Identity::from_parts(ActorId::from(actor.trim()), &key)
            .map_err(|e| CliError::keystore(e.to_string()))?;
        debug!(actor = %identity.actor(), "Loaded identity from keystore");
        Ok(identity)
    }

    pub fn save(&self, identity: &Identity) -> CliResult<()> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| CliError::keystore(format!("Failed to create keystore dir: {}", e)))?;

        std::fs::write(self.actor_path(), identity.actor().as_str())
            .map_err(|e| CliError::keystore(format!("Failed to write actor file: {}", e)))?;

        Self::write_private(&self.key_path(), identity.key())?;

        info!(
            actor = %identity.actor(),
            path = %self.path.display(),
            "Saved identity to keystore"
        );
        Ok(())
    }

    /// Write key material to a file only the owner can read
    ///
    /// The mode is applied when the file is created, and tightened on an
    /// existing file before any bytes are written.
    fn write_private(path: &Path, bytes: &[u8]) -> CliResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(path)
            .map_err(|e| CliError::keystore(format!("Failed to open key file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    CliError::keystore(format!("Failed to set key file permissions: {}", e))
                })?;
        }

        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| CliError::keystore(format!("Failed to write key file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_then_reload() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = Keystore::new(temp_dir.path());

        let first = keystore.load_or_generate().unwrap();
        let second = keystore.load_or_generate().unwrap();

        assert_eq!(first.actor(), second.actor());
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn test_truncated_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let keystore = Keystore::new(temp_dir.path());
        keystore.load_or_generate().unwrap();

        std::fs::write(temp_dir.path().join(KEY_FILENAME), [0u8; 5]).unwrap();
        assert!(matches!(keystore.load(), Err(CliError::Keystore(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        Keystore::new(temp_dir.path()).load_or_generate().unwrap();

        let mode = std::fs::metadata(temp_dir.path().join(KEY_FILENAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_key_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let key_path = temp_dir.path().join(KEY_FILENAME);
        std::fs::write(&key_path, b"stale").unwrap();
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o644)).unwrap();

        // Only the key exists, so a fresh identity overwrites it
        let identity = Keystore::new(temp_dir.path()).load_or_generate().unwrap();

        let metadata = std::fs::metadata(&key_path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        assert_eq!(std::fs::read(&key_path).unwrap(), identity.key().to_vec());
    }
}
