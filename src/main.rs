mod config;
mod embed;
mod error;
mod library;
mod lyrics;
mod objects;
mod quota;
mod storage;

use anyhow::Context;
use clap::{Parser, Subcommand};
use library::Library;
use library::validate::UploadFile;
use objects::FsObjectStore;
use quota::QuotaTracker;
use storage::Storage;
use time::OffsetDateTime;

#[derive(Debug, Parser)]
#[command(name = "refrain", version, about = "Lyrics-synced song library")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a song; storage is only committed when synced lyrics exist.
    Upload {
        file: std::path::PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        owner: String,
    },
    /// Confirm a pending upload, making it part of the library.
    Confirm {
        song_id: String,
        #[arg(long)]
        owner: String,
    },
    /// Discard a pending upload and its stored audio.
    Reject {
        song_id: String,
        #[arg(long)]
        owner: String,
    },
    /// List an owner's confirmed songs.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Delete a confirmed song.
    Delete {
        song_id: String,
        #[arg(long)]
        owner: String,
    },
    /// Adjust frequency weight (1-5) and lyrics sync offset.
    Settings {
        song_id: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        weight: u8,
        #[arg(long, default_value_t = 0)]
        sync_offset_ms: i64,
    },
    /// Background video management.
    Video {
        #[command(subcommand)]
        cmd: VideoCommand,
    },
    /// Look up lyrics without storing anything (headless).
    Lyrics { artist: String, title: String },
    /// Embed API key management.
    Key {
        #[command(subcommand)]
        cmd: KeyCommand,
    },
    /// Embed serving endpoints (headless).
    Embed {
        #[command(subcommand)]
        cmd: EmbedCommand,
    },
}

#[derive(Debug, Subcommand)]
enum VideoCommand {
    /// Attach an MP4 background video to a confirmed song.
    Attach {
        song_id: String,
        file: std::path::PathBuf,
        #[arg(long)]
        owner: String,
    },
    /// Remove a song's background video.
    Remove {
        song_id: String,
        #[arg(long)]
        owner: String,
    },
}

#[derive(Debug, Subcommand)]
enum KeyCommand {
    /// Issue a new API key for an owner.
    New {
        #[arg(long)]
        owner: String,
    },
    /// Print an owner's current API key.
    Show {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Debug, Subcommand)]
enum EmbedCommand {
    /// Report whether the key owner's songs changed.
    Check { key: String },
    /// Print the key owner's songs.
    Songs { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    let storage = Storage::open(&cfg.paths.data_dir.join("library.sqlite3"))?;
    let objects = FsObjectStore::new(&cfg.paths.objects_dir);
    let lrclib = lyrics::LrclibClient::new(&cfg.lrclib)?;
    let library = Library::new(storage, objects, lrclib, cfg.limits.clone());
    let tracker = QuotaTracker::new(cfg.limits.daily_request_limit);

    match cli.command {
        Command::Upload {
            file,
            title,
            artist,
            owner,
        } => {
            let upload = read_upload(&file)?;
            let receipt = library.upload(&owner, upload, &title, &artist).await?;
            println!("Stored pending confirmation: {}", receipt.song_id);
            println!(
                "'{}' by '{}' ({}, {} lines)",
                receipt.title,
                receipt.artist,
                receipt.sync_kind.as_str(),
                receipt.line_count
            );
            println!("--- preview ---\n{}", receipt.lyrics_preview);
            println!("Run `refrain confirm {}` to finish.", receipt.song_id);
        }
        Command::Confirm { song_id, owner } => {
            library.confirm(&owner, &song_id)?;
            println!("Song added to library.");
        }
        Command::Reject { song_id, owner } => {
            library.reject(&owner, &song_id)?;
            println!("Upload cancelled.");
        }
        Command::List { owner } => {
            let songs = library.list(&owner)?;
            if songs.is_empty() {
                println!("No songs.");
            }
            for (i, s) in songs.iter().enumerate() {
                println!(
                    "{:02}. {} - {}  [{} {}B, {} lines, weight {}, offset {}ms]  (id={})",
                    i + 1,
                    s.title,
                    s.artist,
                    s.format,
                    s.byte_size,
                    s.timeline.len(),
                    s.frequency_weight,
                    s.sync_offset_ms,
                    s.id
                );
            }
        }
        Command::Delete { song_id, owner } => {
            library.delete(&owner, &song_id)?;
            println!("Song deleted.");
        }
        Command::Settings {
            song_id,
            owner,
            weight,
            sync_offset_ms,
        } => {
            let view = library.update_settings(&owner, &song_id, weight, sync_offset_ms)?;
            println!(
                "Settings saved: weight={} offset={}ms",
                view.frequency_weight, view.sync_offset_ms
            );
        }
        Command::Video { cmd } => match cmd {
            VideoCommand::Attach {
                song_id,
                file,
                owner,
            } => {
                let upload = read_upload(&file)?;
                let view = library.attach_video(&owner, &song_id, upload)?;
                println!("Video attached: {}", view.video_url.unwrap_or_default());
            }
            VideoCommand::Remove { song_id, owner } => {
                library.remove_video(&owner, &song_id)?;
                println!("Video removed.");
            }
        },
        Command::Lyrics { artist, title } => {
            let client = lyrics::LrclibClient::new(&cfg.lrclib)?;
            let fetched = lyrics::acquire(&client, &artist, &title).await;
            println!("Classification: {}", fetched.kind.as_str());
            if !fetched.timeline.is_empty() {
                println!("{}", lyrics::parser::render(&fetched.timeline));
            } else {
                println!(
                    "{}",
                    lyrics::preview(&fetched.timeline, fetched.raw.as_deref(), cfg.limits.preview_lines)
                );
            }
        }
        Command::Key { cmd } => match cmd {
            KeyCommand::New { owner } => {
                let key = quota::issue(library.storage(), &owner, OffsetDateTime::now_utc())?;
                println!("{}", key.key);
            }
            KeyCommand::Show { owner } => match library.storage().api_key_for_owner(&owner)? {
                Some(key) => println!("{}", key.key),
                None => println!("No API key. Run `refrain key new --owner {owner}`."),
            },
        },
        Command::Embed { cmd } => match cmd {
            EmbedCommand::Check { key } => {
                let result = embed::check(&library, &tracker, &key, OffsetDateTime::now_utc())?;
                println!("has_changes: {}", result.has_changes);
                if let Some(ts) = result.last_update {
                    println!("last_update: {} (unix)", ts.unix_timestamp());
                }
            }
            EmbedCommand::Songs { key } => {
                let result = embed::songs(&library, &tracker, &key, OffsetDateTime::now_utc())?;
                println!("owner: {} ({} songs)", result.owner_id, result.total_songs);
                if let Some(ts) = result.last_update {
                    println!("last_update: {} (unix)", ts.unix_timestamp());
                }
                for (i, s) in result.songs.iter().enumerate() {
                    println!("{:02}. {} - {}", i + 1, s.title, s.artist);
                    println!(
                        "    lyrics: {} ({} lines, offset {}ms)",
                        s.sync_kind.as_str(),
                        s.timeline.len(),
                        s.sync_offset_ms
                    );
                    println!("    audio: {}", s.audio_url);
                    if let Some(video) = &s.video_url {
                        println!("    video: {video}");
                    }
                }
            }
        },
    }

    Ok(())
}

fn read_upload(path: &std::path::Path) -> anyhow::Result<UploadFile> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = match name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "mp3" => Some("audio/mpeg".to_string()),
            "wav" => Some("audio/wav".to_string()),
            "ogg" => Some("audio/ogg".to_string()),
            "flac" => Some("audio/flac".to_string()),
            "mp4" => Some("video/mp4".to_string()),
            _ => None,
        },
        None => None,
    };
    Ok(UploadFile::new(name, content_type, bytes))
}
