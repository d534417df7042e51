//! scrollback binary
//!
//! Create conversations, post messages, and page through them from the
//! command line against a local SQLite feed.
//!
//! ## Usage
//!
//! ```bash
//! scrollback new-conversation --name general
//! scrollback post --conversation <ID> --author amy "hello"
//! scrollback window --conversation <ID> --first 10
//! scrollback window --conversation <ID> --first 10 --after <CURSOR>
//! scrollback browse --conversation <ID> --page-size 5
//! scrollback list
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scrollback_client::{FeedView, MergeOutcome, ViewConfig};
use scrollback_kernel::{Feed, FeedConfig, FeedDb};
use scrollback_server::{LocalSource, paths};
use scrollback_types::{ConversationId, Cursor, Message, WindowArgs};

/// Cursor-paginated conversation feeds.
#[derive(Parser, Debug)]
#[command(name = "scrollback")]
#[command(about = "Cursor-paginated conversation feeds")]
struct Args {
    /// Config file (default: ~/.config/scrollback/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a conversation and print its id
    NewConversation {
        #[arg(long)]
        name: String,
    },

    /// Post a message and print it as JSON
    Post {
        #[arg(long)]
        conversation: ConversationId,

        #[arg(long)]
        author: String,

        body: String,
    },

    /// Resolve one window and print the connection as JSON
    Window {
        #[arg(long)]
        conversation: ConversationId,

        /// Newest-first window size
        #[arg(long, allow_negative_numbers = true)]
        first: Option<i64>,

        /// Continue below this cursor (with --first)
        #[arg(long)]
        after: Option<String>,

        /// Oldest-first window size
        #[arg(long, allow_negative_numbers = true)]
        last: Option<i64>,

        /// Continue above this cursor (with --last)
        #[arg(long)]
        before: Option<String>,
    },

    /// Page through a conversation from newest to oldest
    Browse {
        #[arg(long)]
        conversation: ConversationId,

        /// Messages per page (default: config default_page_size)
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// List conversations, newest first
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let db_path = args
        .database
        .clone()
        .or_else(|| config.database.clone())
        .unwrap_or_else(paths::default_db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let db = FeedDb::open(&db_path).context("opening feed database")?;
    let feed = Arc::new(Feed::new(Arc::new(db), config));

    match args.command {
        Command::NewConversation { name } => {
            let conversation = feed.create_conversation(&name)?;
            info!(id = %conversation.id, name = %conversation.name, "created conversation");
            println!("{}", conversation.id);
        }
        Command::Post { conversation, author, body } => {
            let message = feed.post_message(conversation, &author, &body)?;
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
        Command::Window { conversation, first, after, last, before } => {
            let window_args = WindowArgs {
                first,
                after: after.map(Cursor::new),
                last,
                before: before.map(Cursor::new),
            };
            let connection = feed.window(conversation, window_args)?;
            println!("{}", serde_json::to_string_pretty(&connection)?);
        }
        Command::Browse { conversation, page_size } => {
            let page_size = page_size.unwrap_or(feed.config().default_page_size);
            browse(feed, conversation, page_size).await?;
        }
        Command::List => {
            for conversation in feed.list_conversations()? {
                println!("{}  {}", conversation.id, conversation.name);
            }
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<FeedConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match paths::default_config_path() {
            Some(path) => path,
            None => {
                debug!("no config directory available, using defaults");
                return Ok(FeedConfig::default());
            }
        },
    };
    FeedConfig::load(&path).with_context(|| format!("loading config {}", path.display()))
}

async fn browse(feed: Arc<Feed<FeedDb>>, conversation: ConversationId, page_size: u32) -> Result<()> {
    let source = Arc::new(LocalSource::new(feed));
    let view = FeedView::new(source, conversation, ViewConfig::with_page_size(page_size));

    view.load_first().await?;
    let mut printed = print_new(&view, 0);

    loop {
        match view.load_older().await? {
            MergeOutcome::Extended { .. } => printed = print_new(&view, printed),
            outcome => {
                debug!(?outcome, "reached oldest end");
                break;
            }
        }
    }

    info!(messages = printed, "browse complete");
    Ok(())
}

/// Print edges appended since the last call; returns the new total.
fn print_new(view: &FeedView, already: usize) -> usize {
    let snapshot = view.snapshot();
    for message in snapshot.messages().skip(already) {
        print_message(message);
    }
    snapshot.len()
}

fn print_message(message: &Message) {
    println!("{:>8}  {:<12} {}", message.sequence_id.get(), message.author, message.body);
}
