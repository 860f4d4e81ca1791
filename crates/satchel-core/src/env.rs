//! Replaces the "active identity store" / "active counterparty store"
//! process globals with an explicit value threaded into bundle and
//! symfile entry points. Constructed once per process (or once per test)
//! from two external collaborators: a profile resolver (paths, password
//! environment variable name) and a password prompt (interactive or
//! environment-backed).

use std::path::PathBuf;

use crate::error::Result;
use crate::stores::{ensure_system_identities, CounterpartyStore, IdentityStore};

/// Resolved filesystem locations and password policy for one profile.
/// Implemented by the CLI's configuration layer; the core only consumes
/// this trait.
pub trait ProfileResolver {
    fn identity_store_path(&self, profile: &str) -> PathBuf;
    fn counterparty_store_path(&self, profile: &str) -> PathBuf;
}

/// Supplies a password non-interactively or by prompting. Implemented by
/// the CLI; the core only consumes this trait so that tests can supply a
/// fixed password without a terminal.
pub trait PasswordPrompt {
    fn prompt(&self, profile: &str) -> Result<Vec<u8>>;
}

/// The environment variable a [`ProfileResolver`] should advertise for a
/// given profile: the profile name filtered to `[A-Za-z0-9._]` with
/// space mapped to `_`, wrapped as `SATCHEL_<SAFE_PROFILE>_KEY`.
pub fn password_env_var(profile: &str) -> String {
    let safe: String = profile
        .chars()
        .map(|c| {
            if c == ' ' {
                '_'
            } else if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("SATCHEL_{}_KEY", safe.to_uppercase())
}

/// An open profile: identity store, counterparty store, and the name
/// used to resolve them. Owns both stores; dropping it wipes their
/// secret contents by dropping the underlying `KeyPairInfo` records.
pub struct Environment {
    pub identity_store: IdentityStore,
    pub counterparty_store: CounterpartyStore,
    pub profile: String,
}

impl Environment {
    /// Open (or initialise) a profile: load the identity store from
    /// disk, creating the `_read`/`_write` system identities if this is
    /// a fresh profile, then load the counterparty store using them.
    pub fn open(
        profile: &str,
        resolver: &dyn ProfileResolver,
        password_prompt: Option<&dyn PasswordPrompt>,
    ) -> Result<Self> {
        let identity_path = resolver.identity_store_path(profile);
        let counterparty_path = resolver.counterparty_store_path(profile);

        let password = resolve_password(profile, password_prompt)?;

        let identity_store = if identity_path.exists() {
            let bytes = std::fs::read(&identity_path)?;
            IdentityStore::load_bytes(&bytes, password.as_deref())?
        } else {
            IdentityStore::new()
        };
        ensure_system_identities(&identity_store)?;

        let counterparty_store = if counterparty_path.exists() {
            let bytes = std::fs::read(&counterparty_path)?;
            CounterpartyStore::load_bytes(&bytes, &identity_store)?
        } else {
            CounterpartyStore::new()
        };

        Ok(Environment {
            identity_store,
            counterparty_store,
            profile: profile.to_string(),
        })
    }

    /// Persist both stores to the paths given by `resolver`.
    pub fn save(&self, resolver: &dyn ProfileResolver, password: Option<&[u8]>) -> Result<()> {
        let identity_path = resolver.identity_store_path(&self.profile);
        let counterparty_path = resolver.counterparty_store_path(&self.profile);

        let identity_bytes = self.identity_store.save_bytes(password)?;
        write_secure(&identity_path, &identity_bytes)?;

        let counterparty_bytes = self.counterparty_store.save_bytes(&self.identity_store)?;
        write_secure(&counterparty_path, &counterparty_bytes)?;

        Ok(())
    }
}

fn resolve_password(profile: &str, prompt: Option<&dyn PasswordPrompt>) -> Result<Option<Vec<u8>>> {
    let var = password_env_var(profile);
    if let Ok(value) = std::env::var(&var) {
        return Ok(Some(value.into_bytes()));
    }
    match prompt {
        Some(p) => Ok(Some(p.prompt(profile)?)),
        None => Ok(None),
    }
}

fn write_secure(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.flush()?;
    let persisted = tmp.persist(path).map_err(|e| e.error)?;
    crate::primitives::wipe::set_secure_permissions(path)?;
    drop(persisted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_env_var_sanitises_profile_name() {
        assert_eq!(password_env_var("work profile"), "SATCHEL_WORK_PROFILE_KEY");
        assert_eq!(password_env_var("a.b-c"), "SATCHEL_A.B_C_KEY");
    }
}
