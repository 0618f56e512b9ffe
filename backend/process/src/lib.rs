//! # Operator Tasks
//!
//! One-off jobs run against the data directory while the server is stopped,
//! or at least idle. The server's per-collection locks live in its own process,
//! so a concurrent write from here can still be lost.
//!
//! ## Seeding
//! - `create-user`: the first superadmin has to come from here, the web UI only
//!   lets a superadmin create accounts.
//!
//! ## Imports
//! - `import-centers`, `import-signs`, `import-candidates`: read a JSON array of
//!   records (ids as strings or numbers), append them in batches and skip ids
//!   that already exist. Re-running an import is harmless.
use std::path::Path;

use anyhow::{Context, bail};
use registry::{Credentials, Record, Registry, Repository, Role, User, UserDraft};

pub mod utils;

use utils::{progress_bar, read_records};

const BATCH_SIZE: usize = 250;

pub async fn create_user(
    registry: &Registry,
    credentials: Credentials,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<User> {
    let username = username.trim();

    if username.is_empty() || password.is_empty() {
        bail!("username and password must not be empty");
    }

    let user = registry
        .users
        .create_user(UserDraft {
            username: username.to_string(),
            password_hash: credentials.hash_password(password),
            role,
        })
        .await?;

    Ok(user)
}

/// Returns `(inserted, skipped)` over the whole file.
pub async fn import_file<T: Record>(
    repository: &Repository<T>,
    path: &Path,
) -> anyhow::Result<(usize, usize)> {
    let records: Vec<T> = read_records(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    println!("Loaded Records: {}", records.len());

    let pb = progress_bar(records.len() as u64);
    let mut inserted = 0;
    let mut skipped = 0;
    let mut records = records.into_iter().peekable();

    while records.peek().is_some() {
        let batch: Vec<T> = records.by_ref().take(BATCH_SIZE).collect();
        let len = batch.len() as u64;

        let (added, ignored) = repository.import(batch).await?;
        inserted += added;
        skipped += ignored;

        pb.inc(len);
    }

    pb.finish_with_message("done");

    println!("\nTotal Inserted: {inserted}");
    println!("Total Skipped: {skipped}");

    Ok((inserted, skipped))
}
