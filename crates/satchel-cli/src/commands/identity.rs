use anyhow::{Context, Result};

use satchel_core::env::Environment;
use satchel_core::{export, identity::KeyPairInfo};

use crate::cli::IdentityAction;
use crate::password::InteractivePrompt;
use crate::profile::FsProfileResolver;

pub fn run(action: IdentityAction, env: &Environment, resolver: &FsProfileResolver, prompt: &InteractivePrompt) -> Result<()> {
    match action {
        IdentityAction::New { name } => {
            env.identity_store.insert(KeyPairInfo::new_keypair_with_seeds(&name))?;
            let save_password = prompt.new_password("the identity store")?;
            env.save(resolver, save_password.as_deref())?;
            println!("Generated identity '{name}'.");
        }
        IdentityAction::List => {
            for name in env.identity_store.names() {
                println!("{name}");
            }
        }
        IdentityAction::Remove { name } => {
            env.identity_store.remove(&name)?;
            let save_password = prompt.new_password("the identity store")?;
            env.save(resolver, save_password.as_deref())?;
            println!("Removed identity '{name}'.");
        }
        IdentityAction::Export { name, out } => {
            let password = prompt
                .new_password("this export")?
                .ok_or_else(|| anyhow::anyhow!("identity export requires a password"))?;
            let bytes = env.identity_store.with(&name, |kp| export::export_keypair_info(kp, &password))??;
            std::fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;
            satchel_core::primitives::wipe::set_secure_permissions(&out)
                .with_context(|| format!("restricting permissions on {}", out.display()))?;
            println!("Exported identity '{name}' to {}.", out.display());
        }
        IdentityAction::Import { file } => {
            let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let password = prompt.ask_once("the password this identity was exported with")?;
            let kp = export::import_keypair_info(&bytes, &password)?;
            let name = kp.name().to_string();
            env.identity_store.insert(kp)?;
            let save_password = prompt.new_password("the identity store")?;
            env.save(resolver, save_password.as_deref())?;
            println!("Imported identity '{name}'.");
        }
    }
    Ok(())
}
