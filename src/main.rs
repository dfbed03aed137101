use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use syncpress::api::Api;
use syncpress::config::Config;
use syncpress::types::{NotificationDraft, NotificationKind, Post, PostDraft, PostPatch};

#[derive(Parser, Debug)]
#[command(name = "syncpress")]
#[command(about = "Content and broadcast admin for a dual-mode store")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/syncpress/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Manage content posts
  Posts {
    #[command(subcommand)]
    command: PostsCommand,
  },
  /// Manage broadcast notifications
  Notify {
    #[command(subcommand)]
    command: NotifyCommand,
  },
  /// Show aggregate figures
  Stats,
  /// Upload an image and print its public URL
  Upload {
    /// Image file to upload
    file: PathBuf,
  },
}

#[derive(Subcommand, Debug)]
enum PostsCommand {
  /// List all posts, newest first
  List,
  /// Show a single post
  Show { id: String },
  /// Create a post
  Create {
    #[arg(long)]
    title: String,
    #[arg(long)]
    excerpt: String,
    /// Markdown body, read from a file
    #[arg(long)]
    content: PathBuf,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    image_url: String,
    /// Repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    download_url: Option<String>,
    #[arg(long)]
    button_text: Option<String>,
    #[arg(long)]
    button_link: Option<String>,
  },
  /// Update fields of an existing post (absent flags leave fields untouched)
  Update {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    excerpt: Option<String>,
    /// Markdown body, read from a file
    #[arg(long)]
    content: Option<PathBuf>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    /// Repeatable; providing any replaces the whole tag list
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    download_url: Option<String>,
    #[arg(long)]
    button_text: Option<String>,
    #[arg(long)]
    button_link: Option<String>,
  },
  /// Delete a post
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum NotifyCommand {
  /// List notifications (active only unless --all)
  List {
    /// Include deactivated notifications
    #[arg(long)]
    all: bool,
  },
  /// Broadcast a new notification
  Send {
    #[arg(long)]
    message: String,
    #[arg(long, value_enum, default_value_t = KindArg::Info)]
    kind: KindArg,
    #[arg(long)]
    button_text: Option<String>,
    #[arg(long)]
    button_link: Option<String>,
  },
  /// Deactivate (soft-delete, stays in history)
  Deactivate { id: String },
  /// Delete permanently
  Delete { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
  Info,
  Success,
  Warning,
}

impl From<KindArg> for NotificationKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Info => NotificationKind::Info,
      KindArg::Success => NotificationKind::Success,
      KindArg::Warning => NotificationKind::Warning,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let api = Api::open(&config)?;

  match args.command {
    Command::Posts { command } => run_posts(&api, command).await,
    Command::Notify { command } => run_notify(&api, command).await,
    Command::Stats => {
      let stats = api.fetch_stats().await?;
      println!("posts:   {}", stats.total_posts);
      println!("views:   {}", stats.total_views);
      println!("storage: {} MB (estimated)", stats.storage_used_mb);
      Ok(())
    }
    Command::Upload { file } => {
      let bytes = std::fs::read(&file)
        .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
      let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!("Not a usable file name: {}", file.display()))?;
      let url = api.upload_image(name, bytes, content_type_for(&file)).await;
      println!("{}", url);
      Ok(())
    }
  }
}

async fn run_posts(api: &Api<syncpress::store::JsonFileStore>, command: PostsCommand) -> Result<()> {
  match command {
    PostsCommand::List => {
      for post in api.list_posts().await? {
        println!("{}  {:>6} views  {}  {}", post.created_at, post.views, post.id, post.title);
      }
      Ok(())
    }
    PostsCommand::Show { id } => match api.get_post(&id).await? {
      Some(post) => {
        print_post(&post);
        Ok(())
      }
      None => Err(eyre!("No post with id {}", id)),
    },
    PostsCommand::Create {
      title,
      excerpt,
      content,
      category,
      image_url,
      tags,
      download_url,
      button_text,
      button_link,
    } => {
      let body = std::fs::read_to_string(&content)
        .map_err(|e| eyre!("Failed to read {}: {}", content.display(), e))?;
      let post = api
        .create_post(PostDraft {
          title,
          excerpt,
          content: body,
          category,
          image_url,
          tags,
          download_url,
          button_text,
          button_link,
        })
        .await?;
      println!("created {}", post.id);
      Ok(())
    }
    PostsCommand::Update {
      id,
      title,
      excerpt,
      content,
      category,
      image_url,
      tags,
      download_url,
      button_text,
      button_link,
    } => {
      let body = match content {
        Some(path) => Some(
          std::fs::read_to_string(&path)
            .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?,
        ),
        None => None,
      };
      let patch = PostPatch {
        title,
        excerpt,
        content: body,
        category,
        image_url,
        tags: if tags.is_empty() { None } else { Some(tags) },
        download_url,
        button_text,
        button_link,
      };
      let post = api.update_post(&id, &patch).await?;
      println!("updated {}", post.id);
      Ok(())
    }
    PostsCommand::Delete { id } => {
      api.delete_post(&id).await?;
      println!("deleted {}", id);
      Ok(())
    }
  }
}

async fn run_notify(
  api: &Api<syncpress::store::JsonFileStore>,
  command: NotifyCommand,
) -> Result<()> {
  match command {
    NotifyCommand::List { all } => {
      for n in api.list_notifications(!all).await? {
        let state = if n.active { "active" } else { "inactive" };
        println!(
          "{}  {:?}/{:8}  [{:?}]  {}  {}",
          n.created_at, n.kind, state, n.sync_status, n.id, n.message
        );
      }
      Ok(())
    }
    NotifyCommand::Send {
      message,
      kind,
      button_text,
      button_link,
    } => {
      let notif = api
        .save_notification(NotificationDraft {
          message,
          kind: kind.into(),
          button_text,
          button_link,
        })
        .await?;
      println!("broadcast {}", notif.id);
      Ok(())
    }
    NotifyCommand::Deactivate { id } => {
      api.deactivate_notification(&id).await?;
      println!("deactivated {}", id);
      Ok(())
    }
    NotifyCommand::Delete { id } => {
      api.delete_notification(&id).await?;
      println!("deleted {}", id);
      Ok(())
    }
  }
}

fn print_post(post: &Post) {
  println!("id:       {}", post.id);
  println!("title:    {}", post.title);
  println!("category: {}", post.category);
  println!("created:  {}", post.created_at);
  println!("views:    {}", post.views);
  if !post.tags.is_empty() {
    println!("tags:     {}", post.tags.join(", "));
  }
  if !post.image_url.is_empty() {
    println!("image:    {}", post.image_url);
  }
  if let Some(url) = &post.download_url {
    println!("download: {}", url);
  }
  println!("\n{}", post.content);
}

fn content_type_for(path: &std::path::Path) -> &'static str {
  match path.extension().and_then(|e| e.to_str()) {
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("svg") => "image/svg+xml",
    _ => "application/octet-stream",
  }
}
