//! The forc-wallet keystore a player signs mints with.

use crate::address::AccountId;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    accounts::ViewOnlyAccount,
    crypto::SecretKey,
    prelude::{
        Provider,
        Wallet,
        derivation::DEFAULT_DERIVATION_PATH,
        private_key::PrivateKeySigner,
    },
};
use rpassword::prompt_password;
use std::path::{
    Path,
    PathBuf,
};

const KEYSTORE_EXTENSION: &str = "wallet";
const MIN_MNEMONIC_WORDS: usize = 12;

/// `~/.fuel/wallets` unless a directory is given; `~` is expanded.
pub fn resolve_keystore_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        None => {
            let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(".fuel").join("wallets"))
        }
    }
}

/// An encrypted keystore file, `<dir>/<name>.wallet`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Keystore {
    name: String,
    path: PathBuf,
}

impl Keystore {
    pub fn locate(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name).with_extension(KEYSTORE_EXTENSION);
        if !path.is_file() {
            return Err(eyre!(
                "Wallet '{name}' not found in {}",
                dir.to_string_lossy()
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Asks for the password on the terminal and returns the signing wallet.
    pub fn unlock(&self, provider: &Provider) -> Result<Wallet> {
        let prompt = format!("Enter password for wallet '{}': ", self.name);
        let password = prompt_password(prompt).wrap_err("Failed to read wallet password")?;
        self.unlock_with(&password, provider)
    }

    pub fn unlock_with(&self, password: &str, provider: &Provider) -> Result<Wallet> {
        let material = decrypt_key(&self.path, password.as_bytes())
            .map_err(|_| eyre!("Invalid password for wallet '{}'", self.name))?;
        let secret_key = secret_key_from(&material).ok_or_else(|| {
            eyre!("Wallet '{}' contained unsupported key material", self.name)
        })?;
        let wallet = Wallet::new(PrivateKeySigner::new(secret_key), provider.clone());
        tracing::info!(
            wallet = %self.name,
            account = %signer_account(&wallet),
            "keystore unlocked"
        );
        Ok(wallet)
    }
}

/// forc-wallet stores either a raw 32-byte key or a mnemonic phrase.
fn secret_key_from(material: &[u8]) -> Option<SecretKey> {
    if let Ok(secret_key) = SecretKey::try_from(material) {
        return Some(secret_key);
    }
    let phrase = std::str::from_utf8(material).ok()?;
    if phrase.split_whitespace().count() < MIN_MNEMONIC_WORDS {
        return None;
    }
    SecretKey::new_from_mnemonic_phrase_with_path(phrase, DEFAULT_DERIVATION_PATH).ok()
}

pub fn signer_account(wallet: &Wallet) -> AccountId {
    AccountId(*wallet.address())
}
