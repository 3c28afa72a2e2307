use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use nestor::config::Config;
use nestor::paraphrase::OllamaParaphraser;
use nestor::session::Role;
use nestor::{query, report, table, Session};

#[derive(Parser)]
#[command(name = "nestor")]
#[command(
  about = "Nestor - Natural-Language Property Search\nAsk about local property listings in plain words"
)]
#[command(version)]
struct Cli {
  /// Directory holding the listing tables (defaults to NESTOR_DATA_DIR, then config, then cwd)
  #[arg(short, long, global = true)]
  data_dir: Option<PathBuf>,
  /// Configuration file path
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
  /// Show diagnostic logging on stderr
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Commands,
}

/// Free-text query arguments
#[derive(Args)]
struct QueryText {
  /// Query words, e.g. cheapest 2bhk in mumbai under 1cr
  #[arg(required = true)]
  terms: Vec<String>,
}

impl QueryText {
  fn text(&self) -> String {
    self.terms.join(" ")
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Answer a single query
  Search {
    #[command(flatten)]
    query: QueryText,
    /// Print the reply and matched rows as JSON
    #[arg(long)]
    json: bool,
    /// Add a model-written answer from the configured paraphraser
    #[arg(short, long)]
    paraphrase: bool,
  },
  /// Show the filter a query parses to
  Parse {
    #[command(flatten)]
    query: QueryText,
  },
  /// Show the loaded table size and its first rows
  Preview {
    /// Number of rows to show
    #[arg(short, long)]
    rows: Option<usize>,
  },
  /// Ask questions interactively (:reload, :history, :quit)
  Chat {
    /// Add a model-written answer from the configured paraphraser
    #[arg(short, long)]
    paraphrase: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = match &cli.config {
    Some(path) => Config::load_from_file(path)?,
    None => Config::load()?,
  };
  let data_dir = config.resolve_data_dir(cli.data_dir.as_deref());

  match cli.command {
    Commands::Search { query, json, paraphrase } => {
      search(config, &data_dir, &query.text(), json, paraphrase)?;
    }
    Commands::Parse { query } => {
      println!("{}", query::parse_with_limit(&query.text(), config.default_limit));
    }
    Commands::Preview { rows } => {
      let rows = rows.unwrap_or(config.preview_rows);
      preview(config, &data_dir, rows);
    }
    Commands::Chat { paraphrase } => {
      chat(config, &data_dir, paraphrase)?;
    }
  }

  Ok(())
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("nestor=debug,warn")
    } else {
      EnvFilter::new("nestor=warn,error")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();
}

fn build_session(config: Config, data_dir: &Path, paraphrase: bool) -> Session {
  let paraphraser_config = config.paraphraser.clone();
  let session = Session::new(config, data_dir);
  if !paraphrase {
    return session;
  }

  match OllamaParaphraser::new(paraphraser_config) {
    Ok(paraphraser) => session.with_paraphraser(Box::new(paraphraser)),
    Err(e) => {
      report::warn(&format!("Continuing without paraphraser: {e}"));
      session
    }
  }
}

/// Load the table up front so an empty data directory is reported once
fn announce_table(session: &mut Session) -> bool {
  let dir = session.data_dir().to_path_buf();
  match session.table() {
    Ok(table) => {
      report::ready(&format!("Data loaded successfully! {} rows available.", table.len()));
      true
    }
    Err(e) => {
      tracing::debug!("{e}");
      report::empty_state(&dir);
      false
    }
  }
}

fn search(config: Config, data_dir: &Path, text: &str, json: bool, paraphrase: bool) -> Result<()> {
  let mut session = build_session(config, data_dir, paraphrase);
  if !announce_table(&mut session) {
    return Ok(());
  }

  if json {
    let reply = session.search(text)?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
  } else if let Some(answer) = session.ask(text) {
    println!("{answer}");
  }

  Ok(())
}

fn preview(config: Config, data_dir: &Path, rows: usize) {
  let mut session = Session::new(config, data_dir);
  if !announce_table(&mut session) {
    return;
  }

  if let Ok(loaded) = session.table() {
    let columns: Vec<&str> = loaded.columns().iter().map(String::as_str).collect();
    println!("{}", table::render_grid(&columns, loaded.head(rows)));
  }
}

fn chat(config: Config, data_dir: &Path, paraphrase: bool) -> Result<()> {
  let mut session = build_session(config, data_dir, paraphrase);
  announce_table(&mut session);

  println!("{}", "🏠 Nestor - ask me anything about the property listings".purple().bold());
  println!("{}", "e.g. 'Show me 2BHK in Pune under 50L'  (:reload, :history, :quit)".italic());

  let stdin = io::stdin();
  let mut stdout = io::stdout();
  loop {
    print!("{} ", "💬".cyan());
    stdout.flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }

    match line.trim() {
      ":quit" | ":q" | "exit" => break,
      ":reload" => {
        session.reload();
        report::info("Listings will be re-read on the next query");
      }
      ":history" => print_history(&session),
      query => {
        if let Some(answer) = session.ask(query) {
          println!("\n{answer}\n");
        }
      }
    }
  }

  Ok(())
}

fn print_history(session: &Session) {
  for turn in session.transcript().turns() {
    let speaker = match turn.role {
      Role::User => "you".cyan().bold(),
      Role::Assistant => "nestor".green().bold(),
    };
    println!("[{}] {}: {}", turn.at.format("%H:%M:%S"), speaker, turn.text);
  }
}
