use anyhow::{Context, Result, bail};
use chacha20poly1305::aead::{Aead, AeadCore, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Key file created next to the token file.
pub const KEY_FILE_NAME: &str = ".token_key";
const SEALED_PREFIX: &str = "ENC:";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Seals individual secret strings with ChaCha20-Poly1305 under a local key
/// file. Sealed values are `ENC:<hex(nonce || ciphertext)>`.
///
/// Opening is independent of `enabled`, so turning encryption off never
/// strands previously sealed values.
#[derive(Debug, Clone)]
pub struct SecretStore {
    key_path: PathBuf,
    enabled: bool,
}

impl SecretStore {
    pub fn new(key_path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            key_path: key_path.into(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn is_sealed(value: &str) -> bool {
        value.starts_with(SEALED_PREFIX)
    }

    /// Seal `plaintext`. Pass-through when disabled, empty or already sealed.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        if !self.enabled || plaintext.is_empty() || Self::is_sealed(plaintext) {
            return Ok(plaintext.to_string());
        }

        let cipher = self.cipher()?;
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("token encryption failed: {e}"))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(format!("{SEALED_PREFIX}{}", hex::encode(sealed)))
    }

    /// Open a sealed value. Plain values are returned unchanged.
    pub fn open(&self, value: &str) -> Result<String> {
        let Some(encoded) = value.strip_prefix(SEALED_PREFIX) else {
            return Ok(value.to_string());
        };

        let sealed = hex::decode(encoded).context("sealed token is not valid hex")?;
        if sealed.len() <= NONCE_LEN {
            bail!("sealed token is truncated");
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let mut plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                anyhow::anyhow!(
                    "token decryption failed; key file {} does not match the stored token",
                    self.key_path.display()
                )
            })?;
        let text = String::from_utf8(plaintext.clone()).context("decrypted token is not UTF-8");
        plaintext.zeroize();
        text
    }

    /// Seal an optional secret in place, trimming it first.
    pub fn seal_option(&self, value: &mut Option<String>) -> Result<()> {
        if let Some(current) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            *value = Some(self.seal(current)?);
        }
        Ok(())
    }

    /// Open an optional secret in place. Returns `true` when the stored value
    /// was plain but should have been sealed.
    pub fn open_option(&self, value: &mut Option<String>) -> Result<bool> {
        let Some(current) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(false);
        };
        let was_plain = !Self::is_sealed(current);
        *value = Some(self.open(current)?);
        Ok(self.enabled && was_plain)
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        let mut key = self.load_or_create_key()?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key).context("invalid token key length");
        key.zeroize();
        cipher
    }

    fn load_or_create_key(&self) -> Result<Vec<u8>> {
        if self.key_path.exists() {
            return self.read_key();
        }

        let mut key = ChaCha20Poly1305::generate_key(&mut OsRng).to_vec();
        let created = self.write_new_key(&key);
        match created {
            Ok(()) => Ok(key),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::AlreadyExists) =>
            {
                // Lost a creation race; the winner's key is authoritative.
                key.zeroize();
                self.read_key()
            }
            Err(e) => {
                key.zeroize();
                Err(e)
            }
        }
    }

    fn read_key(&self) -> Result<Vec<u8>> {
        restrict_to_owner(&self.key_path)?;
        let mut encoded = fs::read_to_string(&self.key_path)
            .with_context(|| format!("Failed to read token key: {}", self.key_path.display()))?;
        let key = hex::decode(encoded.trim());
        encoded.zeroize();
        let key = key.context("token key file is not valid hex")?;
        if key.len() != KEY_LEN {
            bail!("token key file must hold {KEY_LEN} bytes, found {}", key.len());
        }
        Ok(key)
    }

    fn write_new_key(&self, key: &[u8]) -> Result<()> {
        if let Some(parent) = self.key_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token key directory: {}", parent.display())
            })?;
        }

        let mut file = create_owner_only(&self.key_path, true)?;
        file.write_all(hex::encode(key).as_bytes())
            .context("Failed to write token key")?;
        file.sync_all().context("Failed to sync token key")?;
        restrict_to_owner(&self.key_path)
    }
}

/// Open `path` for writing with 0600 applied at creation on Unix. With
/// `exclusive`, an existing file is an `AlreadyExists` error.
pub(crate) fn create_owner_only(path: &Path, exclusive: bool) -> Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if exclusive {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path).map_err(anyhow::Error::from)
}

pub(crate) fn restrict_to_owner(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).with_context(|| {
            format!("Failed to set permissions on '{}': expected 0600", path.display())
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
