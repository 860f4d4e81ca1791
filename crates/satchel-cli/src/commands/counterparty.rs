use anyhow::{Context, Result};

use satchel_core::env::Environment;
use satchel_core::{export, identity::KeyInfo};

use crate::cli::CounterpartyAction;
use crate::password::InteractivePrompt;
use crate::profile::FsProfileResolver;

pub fn run(action: CounterpartyAction, env: &Environment, resolver: &FsProfileResolver, prompt: &InteractivePrompt) -> Result<()> {
    match action {
        CounterpartyAction::Add { name, cipher_pub, signing_pub } => {
            let info = KeyInfo::from_tokens(&name, &cipher_pub, &signing_pub)?;
            env.counterparty_store.insert(info)?;
            save(env, resolver, prompt)?;
            println!("Added counterparty '{name}'.");
        }
        CounterpartyAction::List => {
            for name in env.counterparty_store.names() {
                let info = env.counterparty_store.get(&name)?;
                println!("{name}\n  cipher-pub:  {}\n  signing-pub: {}", info.cipher_pub_token(), info.signing_pub_token());
            }
        }
        CounterpartyAction::Remove { name } => {
            env.counterparty_store.remove(&name)?;
            save(env, resolver, prompt)?;
            println!("Removed counterparty '{name}'.");
        }
        CounterpartyAction::Export { name, out, password } => {
            let info = env.counterparty_store.get(&name)?;
            let pw = if password { Some(prompt.new_password("this export")?.unwrap_or_default()) } else { None };
            let bytes = export::export_key_info(&info, pw.as_deref())?;
            std::fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("Exported counterparty '{name}' to {}.", out.display());
        }
        CounterpartyAction::Import { file } => {
            let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let info = match export::import_key_info(&bytes, None) {
                Ok(info) => info,
                Err(satchel_core::Error::PasswordRequired) => {
                    let password = prompt.ask_once("this counterparty record")?;
                    export::import_key_info(&bytes, Some(&password))?
                }
                Err(e) => return Err(e.into()),
            };
            let name = info.name().to_string();
            env.counterparty_store.insert(info)?;
            save(env, resolver, prompt)?;
            println!("Imported counterparty '{name}'.");
        }
    }
    Ok(())
}

/// `Environment::save` re-persists both stores together, so touching the
/// counterparty store still means re-stating the identity store's
/// password policy.
fn save(env: &Environment, resolver: &FsProfileResolver, prompt: &InteractivePrompt) -> Result<()> {
    let save_password = prompt.new_password("the identity store")?;
    env.save(resolver, save_password.as_deref()).map_err(Into::into)
}
