use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use mw_app::usecases::ResyncReport;
use mw_app::LibraryStorage;
use mw_core::entry::{DraftImage, Parameters};
use mw_core::{Entry, EntryDraft, EntryId, EntryPatch, ImageUpload};
use serde::Serialize;
use tracing::{info, warn};

use super::{Cli, Commands, SaveArgs, UpdateArgs};
use crate::bootstrap::AppRuntime;

/// Execute one command against the wired runtime.
///
/// Background revalidation started by a read is awaited before returning,
/// so the process never exits halfway through a cache rebuild.
pub async fn run(cli: Cli, runtime: AppRuntime) -> Result<()> {
    let AppRuntime { storage, admin } = runtime;

    if cli.command.is_mutating() {
        let password = cli
            .password
            .as_deref()
            .ok_or_else(|| anyhow!("This command requires --password"))?;
        if !admin.login(password) {
            bail!("Invalid admin password");
        }
    }

    let outcome = dispatch(&cli, &storage).await;
    storage.wait_for_resync().await;
    outcome
}

impl Commands {
    fn is_mutating(&self) -> bool {
        matches!(
            self,
            Commands::Save(_)
                | Commands::Update(_)
                | Commands::Delete { .. }
                | Commands::ForceResync
                | Commands::Import { .. }
                | Commands::Login
        )
    }
}

async fn dispatch(cli: &Cli, storage: &LibraryStorage) -> Result<()> {
    let json = cli.json;
    match &cli.command {
        Commands::List { featured } => {
            let entries = if *featured {
                storage.list_featured().await?
            } else {
                storage.get_all_entries().await?
            };
            revalidate(storage).await;
            print_entries(&entries, json)
        }
        Commands::Search { query } => {
            let entries = storage.search_entries(query).await?;
            revalidate(storage).await;
            print_entries(&entries, json)
        }
        Commands::Show { id } => {
            let entry = storage
                .get_entry(&EntryId::from(id.as_str()))
                .await?
                .ok_or_else(|| anyhow!("Entry not found: {id}"))?;
            if json {
                print_json(&entry)
            } else {
                print_entry_detail(&entry);
                Ok(())
            }
        }
        Commands::Save(args) => {
            let draft = build_draft(storage, args).await?;
            let id = storage.save_entry(draft).await?;
            println!("{id}");
            Ok(())
        }
        Commands::Update(args) => {
            let entry_id = EntryId::from(args.id.as_str());
            let patch = build_patch(storage, &entry_id, args).await?;
            if patch.is_empty() {
                bail!("Nothing to update");
            }
            let entry = storage.update_entry(&entry_id, patch).await?;
            if json {
                print_json(&entry)
            } else {
                print_entry_line(&entry);
                Ok(())
            }
        }
        Commands::Delete { ids } => {
            let ids: Vec<EntryId> = ids.iter().map(|id| EntryId::from(id.as_str())).collect();
            if let [single] = ids.as_slice() {
                storage.delete_entry(single).await?;
            } else {
                storage.delete_entries(&ids).await?;
            }
            println!("Deleted {} entries", ids.len());
            Ok(())
        }
        Commands::Resync => {
            let report = storage.resync_library().await?;
            print_report(&report, json)
        }
        Commands::ForceResync => {
            let report = storage.force_resync_and_clear_cache().await?;
            print_report(&report, json)
        }
        Commands::Analyze { images } => {
            let uploads = read_uploads(images).await?;
            for result in storage.analyze_images(&uploads).await {
                match result.outcome {
                    Ok(analysis) if json => print_json(&analysis)?,
                    Ok(analysis) => println!("{}: {}", result.file_name, analysis.description),
                    Err(err) => eprintln!("{}: {err}", result.file_name),
                }
            }
            Ok(())
        }
        Commands::Export { out } => {
            let dump = storage.export_cache().await?;
            match out {
                Some(path) => tokio::fs::write(path, dump)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display())),
                None => {
                    println!("{dump}");
                    Ok(())
                }
            }
        }
        Commands::Import { file } => {
            let dump = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let written = storage.import_cache(&dump).await?;
            println!("Imported {written} entries");
            Ok(())
        }
        Commands::Login => {
            println!("Authenticated");
            Ok(())
        }
    }
}

async fn revalidate(storage: &LibraryStorage) {
    match storage.refresh_if_stale().await {
        Ok(true) => info!("Cache is stale; revalidating"),
        Ok(false) => {}
        Err(err) => warn!(error = %err, "Failed to check cache freshness"),
    }
}

async fn read_upload(path: &Path) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Not a file: {}", path.display()))?;
    Ok(ImageUpload::new(file_name, bytes))
}

async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<ImageUpload>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        uploads.push(read_upload(path).await?);
    }
    Ok(uploads)
}

async fn build_draft(storage: &LibraryStorage, args: &SaveArgs) -> Result<EntryDraft> {
    let uploads = read_uploads(&args.images).await?;

    // A failed caption leaves the placeholder analysis in place.
    let ai_analysis = match uploads.first() {
        Some(first) if args.analyze => match storage.analyze_image(first).await {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                warn!(error = %err, "Image analysis failed; saving without it");
                None
            }
        },
        _ => None,
    };

    Ok(EntryDraft {
        title: args.title.clone(),
        description: args.description.clone(),
        images: uploads.into_iter().map(DraftImage::Upload).collect(),
        parameters: Parameters {
            sref: args.sref.clone(),
            prompt: args.prompt.clone(),
            ..Default::default()
        },
        featured: args.featured,
        curator_notes: args.notes.clone(),
        ai_analysis,
    })
}

async fn build_patch(
    storage: &LibraryStorage,
    entry_id: &EntryId,
    args: &UpdateArgs,
) -> Result<EntryPatch> {
    // Parameters are replaced wholesale, so start from the stored ones.
    let parameters = if args.sref.is_some() || args.prompt.is_some() {
        let current = storage
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| anyhow!("Entry not found: {entry_id}"))?;
        let mut parameters = current.parameters;
        if let Some(sref) = &args.sref {
            parameters.sref = sref.clone();
        }
        if let Some(prompt) = &args.prompt {
            parameters.prompt = prompt.clone();
        }
        Some(parameters)
    } else {
        None
    };

    let images = if args.images.is_empty() {
        None
    } else {
        let uploads = read_uploads(&args.images).await?;
        Some(uploads.into_iter().map(DraftImage::Upload).collect())
    };

    Ok(EntryPatch {
        title: args.title.clone(),
        description: args.description.clone(),
        images,
        parameters,
        ai_analysis: None,
        featured: args.featured,
        curator_notes: args.notes.clone(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{text}");
    Ok(())
}

fn print_entries(entries: &[Entry], json: bool) -> Result<()> {
    if json {
        return print_json(&entries);
    }
    for entry in entries {
        print_entry_line(entry);
    }
    Ok(())
}

fn print_entry_line(entry: &Entry) {
    let star = if entry.admin_metadata.featured { "*" } else { " " };
    println!(
        "{star} {:>6}  {:<40}  --sref {}",
        entry.id, entry.title, entry.parameters.sref
    );
}

fn print_entry_detail(entry: &Entry) {
    print_entry_line(entry);
    if !entry.description.is_empty() {
        println!("  {}", entry.description);
    }
    if !entry.parameters.prompt.is_empty() {
        println!("  prompt: {}", entry.parameters.prompt);
    }
    println!(
        "  modified: {}",
        entry.admin_metadata.last_modified.to_rfc3339()
    );
    for image in &entry.images {
        println!("  {}", image.url);
    }
}

fn print_report(report: &ResyncReport, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "remoteEntries": report.remote_entries,
            "cached": report.cached,
            "rejected": report
                .rejected
                .iter()
                .map(|r| serde_json::json!({ "id": r.id, "reason": r.reason.to_string() }))
                .collect::<Vec<_>>(),
            "pruned": report.pruned,
            "finishedAtMs": report.finished_at_ms,
        }));
    }

    println!(
        "Cached {} of {} entries, pruned {} images",
        report.cached,
        report.remote_entries,
        report.pruned.len()
    );
    for rejected in &report.rejected {
        let id = rejected.id.as_deref().unwrap_or("?");
        println!("  rejected {id}: {}", rejected.reason);
    }
    Ok(())
}
