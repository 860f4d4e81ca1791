use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use satchel_core::multidir;
use satchel_core::symfile::{self, PayloadKind, SourceFileInfo};

use crate::atomic;
use crate::cli::SymfileAction;
use crate::password::InteractivePrompt;

pub fn run(action: SymfileAction, prompt: &InteractivePrompt) -> Result<()> {
    match action {
        SymfileAction::Encrypt { input, input_dir, output, compress, chunk_size } => {
            encrypt(input, input_dir, &output, compress, chunk_size, prompt)
        }
        SymfileAction::Decrypt { input, output, output_dir, compress, chunk_size } => {
            decrypt(&input, output, output_dir, compress, chunk_size, prompt)
        }
    }
}

fn file_perms(path: &std::path::Path) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).map(|m| m.permissions().mode()).unwrap_or(0o644)
    }
    #[cfg(not(unix))]
    {
        0o644
    }
}

fn encrypt(input: Option<PathBuf>, input_dir: Option<PathBuf>, output: &PathBuf, compress: bool, chunk_size: usize, prompt: &InteractivePrompt) -> Result<()> {
    let password = prompt
        .new_password("this symfile")?
        .ok_or_else(|| anyhow::anyhow!("symfile encryption requires a password"))?;

    let out = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    tracing::debug!(output = %output.display(), chunk_size, "encrypting symfile");

    match (input, input_dir) {
        (Some(_), Some(_)) => bail!("--input and --input-dir are mutually exclusive"),
        (None, None) => bail!("one of --input or --input-dir is required"),
        (Some(path), None) => {
            let metadata = std::fs::metadata(&path).with_context(|| format!("reading metadata for {}", path.display()))?;
            let mtime = DateTime::<Utc>::from(metadata.modified()?).to_rfc3339();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let info = SourceFileInfo::new(name, mtime, file_perms(&path));

            let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
            symfile::encode(&password, PayloadKind::Stream, Some(info), file, out, chunk_size)?;
        }
        (None, Some(dir)) => {
            let reader = multidir::compressing_reader(&[dir], Vec::new(), compress)?;
            symfile::encode(&password, PayloadKind::MultiDir, None, reader, out, chunk_size)?;
        }
    }

    println!("Wrote symfile {}.", output.display());
    Ok(())
}

fn decrypt(input: &PathBuf, output: Option<PathBuf>, output_dir: Option<PathBuf>, compress: bool, chunk_size: usize, prompt: &InteractivePrompt) -> Result<()> {
    let password = prompt.ask_once("this symfile")?;
    let reader = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    tracing::debug!(input = %input.display(), "decrypting symfile");

    let pending_commit: Rc<RefCell<Option<atomic::PendingCommit>>> = Rc::new(RefCell::new(None));
    let pending_commit_for_closure = pending_commit.clone();

    let header = symfile::decode(&password, reader, chunk_size, move |header| {
        let sink: Box<dyn Write> = match header.payload_type() {
            PayloadKind::Stream => {
                let path = output.clone().ok_or_else(|| satchel_core::Error::BadFrame("symfile carries a single file; --output is required".into()))?;
                let (writer, pending) = atomic::create(path).map_err(satchel_core::Error::Io)?;
                *pending_commit_for_closure.borrow_mut() = Some(pending);
                Box::new(writer)
            }
            PayloadKind::MultiDir => {
                let dir = output_dir.clone().ok_or_else(|| satchel_core::Error::BadFrame("symfile carries a directory tree; --output-dir is required".into()))?;
                Box::new(multidir::MaterialisingWriter::new(dir, compress)?)
            }
        };
        Ok(sink)
    })?;

    if let Some(pending) = pending_commit.borrow_mut().take() {
        atomic::commit(pending).context("persisting decrypted output")?;
    }

    if let Some(info) = header.source_file_info() {
        println!("Recovered '{}' (mtime {}).", info.filename, info.mtime);
    } else {
        println!("Recovered directory tree.");
    }
    Ok(())
}
