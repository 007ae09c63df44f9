//! File command handlers.

use super::commands::{Commands, OutputFormat};
use memories::{GIB, MIB, MemoriesConfig, MemoriesResult, StorageManager, StoredFile, build_store};
use std::path::Path;
use std::time::Duration;

/// Result type for command handlers.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Load configuration and build a manager over the configured store.
#[tracing::instrument(skip_all)]
pub fn build_manager(config_path: Option<&Path>) -> MemoriesResult<StorageManager> {
    let config = match config_path {
        Some(path) => MemoriesConfig::from_file(path)?,
        None => MemoriesConfig::load()?,
    };
    let store = build_store(&config.store)?;
    tracing::debug!(backend = store.name(), bucket = %config.store.bucket, "Using object store");
    Ok(StorageManager::new(store, &config))
}

/// Run one command against `manager`.
pub async fn handle_command(command: Commands, manager: &StorageManager) -> CommandResult {
    match command {
        Commands::UploadUrl { event, name, mime } => {
            let ticket = manager.request_upload_url(&event, &name, &mime).await?;
            println!("{}", serde_json::to_string_pretty(&ticket)?);
        }

        Commands::Upload { event, path, mime } => {
            upload(manager, &event, &path, mime).await?;
        }

        Commands::List { event, format } => {
            let files = manager.list_files(&event).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&files)?),
                OutputFormat::Human => print_files(&event, &files),
            }
        }

        Commands::Usage { event } => {
            let quota = manager.usage(&event).await?;
            println!(
                "{}: {} of {} used ({:.2}%)",
                event,
                format_bytes(*quota.used_bytes()),
                format_bytes(*quota.total_bytes()),
                quota.percentage()
            );
        }

        Commands::Share { event, name, ttl } => {
            let link = manager
                .share_file(&event, &name, ttl.map(Duration::from_secs))
                .await?;
            println!("{}", link.url());
            println!("expires {}", link.expires_at().to_rfc3339());
        }

        Commands::Info { event, name } => {
            let metadata = manager.file_metadata(&event, &name).await?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }

        Commands::Delete { event, name } => {
            manager.delete_file(&event, &name).await?;
            println!("Deleted {}/{}", event, name);
        }

        Commands::Purge { event } => {
            manager.delete_namespace(&event).await?;
            println!("Deleted every file of {}", event);
        }
    }

    Ok(())
}

async fn upload(
    manager: &StorageManager,
    event: &str,
    path: &Path,
    mime: Option<String>,
) -> CommandResult {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Not a file path: {}", path.display()))?;
    let mime = mime.unwrap_or_else(|| guess_mime(path));

    let stored = manager.upload_direct(event, file_name, &mime, &data).await?;
    println!("Stored {} ({})", stored.name(), format_bytes(*stored.size()));
    if let Some(link) = stored.access_url() {
        println!("{}", link.url());
    }
    Ok(())
}

fn print_files(event: &str, files: &[StoredFile]) {
    println!("Files in '{}':", event);
    println!("{:-<80}", "");
    for file in files {
        println!(
            "{:<40} {:>10}  {:<16} {}",
            file.name(),
            format_bytes(*file.size()),
            file.mime_type(),
            file.created_at().format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{:-<80}", "");
    println!("Total: {} files", files.len());
}

/// MIME type for a path, from its extension.
fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
