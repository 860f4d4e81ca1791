//! Resolves a profile name to the two store files under `$HOME/.satchel`.

use std::path::PathBuf;

use satchel_core::env::ProfileResolver;

pub struct FsProfileResolver {
    root: PathBuf,
}

impl FsProfileResolver {
    pub fn new() -> anyhow::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("could not determine home directory"))?;
        Ok(FsProfileResolver { root: home.join(".satchel") })
    }

    fn profile_dir(&self, profile: &str) -> PathBuf {
        self.root.join(profile)
    }
}

impl ProfileResolver for FsProfileResolver {
    fn identity_store_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join("identities.satchel")
    }

    fn counterparty_store_path(&self, profile: &str) -> PathBuf {
        self.profile_dir(profile).join("counterparties.satchel")
    }
}
