// Clipdex CLI

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use clipdex::{ClipdexError, Library, LibraryConfig, ScanEvent, SearchMode, VideoRecord};

#[derive(Parser)]
#[command(name = "clipdex", about = "Personal video library catalog", version)]
struct Cli {
    /// Library root (defaults to the current directory)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty catalog under the library root
    Init,
    /// Scan a directory and catalog every video file found
    Scan {
        /// Directory to scan (defaults to the library root)
        path: Option<PathBuf>,
    },
    /// List all cataloged videos, most recently modified first
    List,
    /// Search the catalog
    Search {
        query: String,
        /// One of: all, filename, extension, tag
        #[arg(long, default_value = "all")]
        mode: String,
    },
    /// Show groups of videos with identical content
    Duplicates,
    /// Rename a cataloged video on disk and in the catalog
    Rename { id: i64, new_name: String },
    /// Manage a video's tags
    Tag {
        id: i64,
        /// Attach a tag
        #[arg(long)]
        add: Vec<String>,
        /// Detach a tag
        #[arg(long)]
        remove: Vec<String>,
    },
    /// Mark records whose files vanished and sweep orphaned thumbnails
    Reconcile,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> clipdex::Result<()> {
    let root = match cli.library {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let config = LibraryConfig::for_root(&root);

    // Every command except init expects an existing catalog.
    if !matches!(cli.command, Command::Init) && !config.db_path.exists() {
        return Err(ClipdexError::InvalidPath(format!(
            "no catalog under {} (run `clipdex init` first)",
            root.display()
        )));
    }

    let library = Library::open(config)?;

    match cli.command {
        Command::Init => {
            println!("Initialized catalog under {}", root.display());
        }
        Command::Scan { path } => cmd_scan(&library, path.unwrap_or(root))?,
        Command::List => print_videos(&library, &library.list_all()?)?,
        Command::Search { query, mode } => {
            let mode = SearchMode::from_str(&mode).map_err(ClipdexError::Other)?;
            print_videos(&library, &library.search(&query, mode)?)?;
        }
        Command::Duplicates => cmd_duplicates(&library)?,
        Command::Rename { id, new_name } => {
            let record = library.rename(id, &new_name)?;
            println!("Renamed to {}", record.file_path);
        }
        Command::Tag { id, add, remove } => {
            for name in &add {
                library.add_tag(id, name)?;
            }
            for name in &remove {
                library.remove_tag(id, name)?;
            }
            println!("Tags: {}", library.display_tags(id)?);
        }
        Command::Reconcile => {
            let report = library.reconcile()?;
            println!(
                "Marked {} missing, restored {}, removed {} orphaned thumbnails",
                report.marked_missing, report.restored, report.orphan_thumbs_removed
            );
        }
    }

    Ok(())
}

fn cmd_scan(library: &Library, path: PathBuf) -> clipdex::Result<()> {
    let handle = library.spawn_scan(path);

    for event in handle.events().iter() {
        match event {
            ScanEvent::Started { total } => println!("Scanning {} video files...", total),
            ScanEvent::FileAdded { path, index, total, .. } => {
                println!("[{}/{}] added {}", index, total, path.display());
            }
            ScanEvent::FileSkipped { .. } => {}
            ScanEvent::FileFailed { path, error, index, total } => {
                println!("[{}/{}] failed {}: {}", index, total, path.display(), error);
            }
            ScanEvent::Completed(report) => {
                println!(
                    "Done: {} added, {} skipped, {} failed{}",
                    report.added,
                    report.skipped,
                    report.failed.len(),
                    if report.cancelled { " (cancelled)" } else { "" }
                );
                break;
            }
        }
    }

    handle.wait()?;
    Ok(())
}

fn cmd_duplicates(library: &Library) -> clipdex::Result<()> {
    let groups = library.duplicate_groups()?;
    if groups.is_empty() {
        println!("No duplicates found");
        return Ok(());
    }
    for group in &groups {
        println!("{} ({} copies):", &group.hash[..12.min(group.hash.len())], group.videos.len());
        for video in &group.videos {
            println!("  [{}] {}", video.id, video.file_path);
        }
    }
    Ok(())
}

fn print_videos(library: &Library, videos: &[VideoRecord]) -> clipdex::Result<()> {
    if videos.is_empty() {
        println!("No videos found");
        return Ok(());
    }
    for video in videos {
        let tags = library.display_tags(video.id)?;
        let missing = if video.missing_at.is_some() { " [missing]" } else { "" };
        println!(
            "[{}] {}  {}  {:.0}s  {}{}{}",
            video.id,
            video.file_name,
            video.mod_date,
            video.duration,
            format_size(video.file_size),
            if tags.is_empty() { String::new() } else { format!("  [{}]", tags) },
            missing
        );
    }
    println!("{} video(s)", videos.len());
    Ok(())
}

fn format_size(bytes: i64) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes >= KIB * KIB * KIB {
        format!("{:.1} GiB", bytes / (KIB * KIB * KIB))
    } else if bytes >= KIB * KIB {
        format!("{:.1} MiB", bytes / (KIB * KIB))
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes / KIB)
    } else {
        format!("{} B", bytes)
    }
}
