//! Interactive password collection, kept separate from `satchel-core` so
//! the core crate never touches a terminal.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Password};

use satchel_core::env::PasswordPrompt;
use satchel_core::error::{Error, Result};

pub struct InteractivePrompt {
    theme: ColorfulTheme,
}

impl InteractivePrompt {
    pub fn new() -> Self {
        InteractivePrompt { theme: ColorfulTheme::default() }
    }

    /// Prompt for a new password with confirmation; an empty answer means
    /// "store this profile in cleartext".
    pub fn new_password(&self, what: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entered = Password::with_theme(&self.theme)
            .with_prompt(format!("Password for {what} (leave blank for none)"))
            .allow_empty_password(true)
            .with_confirmation("confirm password", "passwords did not match")
            .interact()?;
        if entered.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entered.into_bytes()))
        }
    }

    pub fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        Ok(Confirm::with_theme(&self.theme).with_prompt(message).default(false).interact()?)
    }

    /// A single password prompt with no confirmation round, for unlocking
    /// something that is already encrypted (an export, a symfile).
    pub fn ask_once(&self, what: &str) -> anyhow::Result<Vec<u8>> {
        let entered = Password::with_theme(&self.theme).with_prompt(format!("Password for {what}")).interact()?;
        Ok(entered.into_bytes())
    }
}

impl Default for InteractivePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordPrompt for InteractivePrompt {
    fn prompt(&self, profile: &str) -> Result<Vec<u8>> {
        let entered = Password::with_theme(&self.theme)
            .with_prompt(format!("Password for profile '{profile}'"))
            .interact()
            .map_err(|e| Error::BadFrame(format!("password prompt: {e}")))?;
        Ok(entered.into_bytes())
    }
}
