//! `stash` subcommands — list, lock, unlock, remove entries.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, delete, get_json, post_no_body};

#[derive(Deserialize)]
struct StashEntry {
    entry_id: u64,
    original_filename: String,
    sha1sum: String,
    size: u64,
}

pub async fn cmd_stash_list(port: u16) -> Result<()> {
    let entries: Vec<StashEntry> = get_json(&format!("{}/stash", base_url(port))).await?;

    if entries.is_empty() {
        println!("Stash is empty.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  File Stash ({})", entries.len());
    println!("═══════════════════════════════════════");
    for e in &entries {
        println!("  ┌─ #{} {}", e.entry_id, e.original_filename);
        println!("  │  sha1 : {}", e.sha1sum);
        println!("  └─ size : {} bytes", e.size);
    }
    Ok(())
}

pub async fn cmd_stash_lock(port: u16, entry_id: &str) -> Result<()> {
    post_no_body(&format!("{}/stash/{}/lock", base_url(port), entry_id)).await?;
    println!("Locked entry {entry_id}.");
    Ok(())
}

pub async fn cmd_stash_unlock(port: u16, entry_id: &str) -> Result<()> {
    post_no_body(&format!("{}/stash/{}/unlock", base_url(port), entry_id)).await?;
    println!("Unlocked entry {entry_id}.");
    Ok(())
}

pub async fn cmd_stash_remove(port: u16, entry_id: &str) -> Result<()> {
    delete(&format!("{}/stash/{}", base_url(port), entry_id)).await?;
    println!("Removed entry {entry_id}.");
    Ok(())
}
