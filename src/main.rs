use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use echoleaf::chat::{ChatSession, suggested_questions};
use echoleaf::clients::GeminiClient;
use echoleaf::config::{self, Config, RuntimeConfig};
use echoleaf::error::EchoLeafError;
use echoleaf::export;
use echoleaf::input::{UrlList, load_pdf, read_study_text};
use echoleaf::library::Library;
use echoleaf::models::{FormData, GeneratedContent, SavedStudy};
use echoleaf::options::{
    Audience, Category, Language, Length, OutputFormat, StyleRewrite, TaskTemplate, Tone,
};
use echoleaf::preferences::{Preferences, Theme};
use echoleaf::service::EchoLeaf;
use echoleaf::storage::{FileStore, KeyValueStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn scientific studies into clear, structured explanations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an explanation from study text, a PDF, or URLs
    Synthesize(SynthesizeArgs),
    /// Ask follow-up questions, optionally about a saved study
    Chat {
        /// Library id of the study to use as context
        #[arg(long)]
        study: Option<String>,
    },
    /// Search-grounded overview of a topic
    Research {
        topic: String,
        /// Print raw JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Manage saved studies
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Show or change the theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// List every available style option
    Options,
}

#[derive(Args, Debug)]
struct SynthesizeArgs {
    /// Study text (or a list of topics, one per line)
    #[arg(long, conflicts_with_all = ["text_file", "pdf", "url"])]
    text: Option<String>,
    /// Read study text from a file ("-" for stdin)
    #[arg(long, conflicts_with_all = ["pdf", "url"])]
    text_file: Option<PathBuf>,
    /// PDF of the study
    #[arg(long, conflicts_with = "url")]
    pdf: Option<PathBuf>,
    /// Study URL (repeat for a multi-source synthesis)
    #[arg(long)]
    url: Vec<String>,
    #[arg(long, default_value_t = Tone::default())]
    tone: Tone,
    #[arg(long, default_value_t = OutputFormat::default())]
    format: OutputFormat,
    #[arg(long, default_value_t = Category::default())]
    category: Category,
    #[arg(long, default_value_t = Audience::default())]
    audience: Audience,
    #[arg(long, default_value_t = Length::default())]
    length: Length,
    /// Style rewrite (repeatable)
    #[arg(long)]
    style: Vec<StyleRewrite>,
    #[arg(long, default_value_t = Language::default())]
    language: Language,
    #[arg(long, default_value_t = TaskTemplate::default())]
    template: TaskTemplate,
    /// Use the higher-capability thinking model
    #[arg(long)]
    thinking: bool,
    /// Save the result to the library
    #[arg(long)]
    save: bool,
    /// Print raw JSON instead of Markdown
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    List,
    Search { term: String },
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    Delete { id: String },
    /// Delete every saved study
    Clear {
        #[arg(long)]
        yes: bool,
    },
    Bibtex { id: String },
    Markdown { id: String },
}

#[derive(Subcommand, Debug)]
enum ThemeAction {
    Show,
    Set { theme: Theme },
    Toggle,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| EnvFilter::new("echoleaf=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    let dir = config.storage.resolve_data_dir();
    info!("Using data directory {}", dir.display());
    Arc::new(FileStore::new(dir))
}

fn pipeline(config: &Config) -> echoleaf::Result<EchoLeaf<GeminiClient>> {
    let key = config.require_api_key()?;
    let client = GeminiClient::new(&config.generation, key)?;
    Ok(EchoLeaf::new(client, config.clone()))
}

fn build_form(args: &SynthesizeArgs, config: &Config) -> echoleaf::Result<FormData> {
    let mut form = FormData {
        tone: args.tone,
        output_format: args.format,
        category: args.category,
        audience: args.audience,
        length: args.length,
        style_rewrite: args.style.clone(),
        language: args.language,
        task_template: args.template,
        thinking_mode: args.thinking,
        ..FormData::default()
    };

    if let Some(text) = &args.text {
        form.study_text = text.clone();
    } else if let Some(path) = &args.text_file {
        form.study_text = read_study_text(path)?;
    } else if let Some(path) = &args.pdf {
        form.study_file = Some(load_pdf(path)?);
    } else {
        let mut urls = UrlList::new(config.limits.max_urls);
        for url in &args.url {
            urls.add(url)?;
        }
        form.study_urls = urls.into_vec();
    }
    Ok(form)
}

fn print_content(content: &GeneratedContent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(content)?);
    } else {
        println!("{}", export::to_markdown(content));
    }
    Ok(())
}

fn find_study<'a>(library: &'a Library, id: &str) -> echoleaf::Result<&'a SavedStudy> {
    library
        .get(id)
        .ok_or_else(|| EchoLeafError::validation(format!("No saved study with id {id}")))
}

async fn run_synthesize(args: SynthesizeArgs, config: &Config) -> echoleaf::Result<()> {
    let form = build_form(&args, config)?;
    let app = pipeline(config)?;
    eprintln!("Generating ({})...", app.classify(&form));
    let content = app.synthesize(&form).await?;
    print_content(&content, args.json)?;

    if args.save {
        let mut library = Library::load(open_store(config));
        let saved = library.save(form, content);
        eprintln!("Study saved to your library (id {}).", saved.id);
    }
    Ok(())
}

async fn run_chat(study: Option<String>, config: &Config) -> echoleaf::Result<()> {
    let context = match study {
        Some(id) => {
            let library = Library::load(open_store(config));
            Some(find_study(&library, &id)?.generated_content.clone())
        }
        None => None,
    };
    let app = pipeline(config)?;
    let mut session = ChatSession::new();

    if let Some(ctx) = &context {
        eprintln!("Chatting about \"{}\". Try:", ctx.title);
        for q in suggested_questions(ctx) {
            eprintln!("  - {q}");
        }
    }
    eprintln!("Type a question, or an empty line to quit.");

    let stdin = std::io::stdin();
    let terminal = |e: std::io::Error| EchoLeafError::internal(format!("terminal I/O failed: {e}"));
    loop {
        eprint!("> ");
        std::io::stderr().flush().map_err(terminal)?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).map_err(terminal)? == 0 || line.trim().is_empty() {
            break;
        }
        match app.send_message(&mut session, &line, context.as_ref()).await {
            Ok(reply) => println!("{reply}\n"),
            Err(e) => eprintln!("{}\n", e.user_message()),
        }
    }
    Ok(())
}

async fn run_research(topic: String, json: bool, config: &Config) -> echoleaf::Result<()> {
    let app = pipeline(config)?;
    eprintln!("Researching \"{}\"...", topic.trim());
    let data = app.research(&topic).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", export::research_to_markdown(&data));
    }
    Ok(())
}

fn run_library(action: LibraryAction, config: &Config) -> echoleaf::Result<()> {
    let mut library = Library::load(open_store(config));
    match action {
        LibraryAction::List => list_studies(library.search("")),
        LibraryAction::Search { term } => {
            let hits = library.search(&term);
            if hits.is_empty() && !library.is_empty() {
                println!("No studies found matching your search.");
            }
            list_studies(hits);
        }
        LibraryAction::Show { id, json } => {
            let study = find_study(&library, &id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(study)?);
            } else {
                println!("{}", export::to_markdown(&study.generated_content));
            }
        }
        LibraryAction::Delete { id } => {
            if library.delete(&id) {
                println!("Deleted {id}.");
            } else {
                return Err(EchoLeafError::validation(format!(
                    "No saved study with id {id}"
                )));
            }
        }
        LibraryAction::Clear { yes } => {
            if !yes {
                return Err(EchoLeafError::validation(
                    "This deletes every saved study and cannot be undone. Re-run with --yes.",
                ));
            }
            library.clear_all();
            println!("Library cleared.");
        }
        LibraryAction::Bibtex { id } => {
            println!("{}", export::to_bibtex(&find_study(&library, &id)?.generated_content));
        }
        LibraryAction::Markdown { id } => {
            println!("{}", export::to_markdown(&find_study(&library, &id)?.generated_content));
        }
    }
    Ok(())
}

fn list_studies(studies: Vec<&SavedStudy>) {
    if studies.is_empty() {
        println!("Your library is empty. Save a summary to get started.");
        return;
    }
    for study in studies {
        println!(
            "{}  {}  {}",
            study.id,
            study.saved_at.format("%Y-%m-%d"),
            study.generated_content.title
        );
    }
}

fn run_theme(action: ThemeAction, config: &Config) {
    let mut prefs = Preferences::load(open_store(config));
    let theme = match action {
        ThemeAction::Show => prefs.theme(),
        ThemeAction::Set { theme } => {
            prefs.set_theme(theme);
            theme
        }
        ThemeAction::Toggle => prefs.toggle_theme(),
    };
    println!("{theme}");
}

fn print_options() {
    fn section<T: std::fmt::Display>(name: &str, all: &[T]) {
        println!("{name}:");
        for item in all {
            println!("  {item}");
        }
    }
    section("Tones", Tone::ALL);
    section("Formats", OutputFormat::ALL);
    section("Categories", Category::ALL);
    section("Audiences", Audience::ALL);
    section("Lengths", Length::ALL);
    section("Style rewrites", StyleRewrite::ALL);
    section("Languages", Language::ALL);
    section("Task templates", TaskTemplate::ALL);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::load_env_file();
    init_tracing(&RuntimeConfig::load_from_env().log_level);
    let config = Config::load().context("failed to load configuration")?;

    let outcome = match cli.command {
        Command::Synthesize(args) => run_synthesize(args, &config).await,
        Command::Chat { study } => run_chat(study, &config).await,
        Command::Research { topic, json } => run_research(topic, json, &config).await,
        Command::Library { action } => run_library(action, &config),
        Command::Theme { action } => {
            run_theme(action, &config);
            Ok(())
        }
        Command::Options => {
            print_options();
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
