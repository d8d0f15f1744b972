//! meteor CLI - bibliographic metadata extraction tool

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use meteor::{
    detect_input, Backend, Document, DocumentOptions, InputFormat, LlmConfig, Meteor,
    MeteorOptions, SqliteRegistry,
};

#[derive(Parser)]
#[command(name = "meteor")]
#[command(version)]
#[command(about = "Extract bibliographic metadata from PDF files and ALTO directories", long_about = None)]
struct Cli {
    /// PDF files or directories of ALTO pages
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// SQLite publisher registry
    #[arg(long, env = "METEOR_REGISTRY_FILE", value_name = "FILE")]
    registry: Option<PathBuf>,

    /// Comma-separated label languages (e.g. "nob,nno,eng,mul")
    #[arg(long, env = "METEOR_LANGUAGES", value_delimiter = ',')]
    languages: Option<Vec<String>>,

    /// Extraction backend
    #[arg(long, env = "METEOR_BACKEND", value_enum, default_value = "finder")]
    backend: BackendArg,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "METEOR_LLM_API_URL")]
    llm_api_url: Option<String>,

    /// API key for the LLM service
    #[arg(long, env = "METEOR_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Model name for the LLM service
    #[arg(long, env = "METEOR_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    /// Print every candidate instead of the chosen values
    #[arg(long)]
    candidates: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        /// PDF file or directory of ALTO pages
        #[arg(value_name = "PATH")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// Layout and pattern heuristics
    Finder,
    /// OpenAI-compatible chat-completions service
    Llm,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Finder => Backend::Finder,
            BackendArg::Llm => Backend::Llm,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Info { input }) => cmd_info(input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None if cli.paths.is_empty() => {
            println!("{}", "Usage: meteor <PATH>...".yellow());
            println!("       meteor --help for more information");
            Ok(())
        }
        None => cmd_extract(&cli),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_meteor(cli: &Cli) -> Result<Meteor, Box<dyn std::error::Error>> {
    let mut options = MeteorOptions::new().with_backend(cli.backend.into());
    if let Some(languages) = &cli.languages {
        options = options.with_languages(languages.iter().map(|l| l.trim().to_string()));
    }
    if let Some(url) = &cli.llm_api_url {
        let mut config = LlmConfig::new(url.as_str(), cli.llm_model.as_str());
        if let Some(key) = &cli.llm_api_key {
            config = config.with_api_key(key.as_str());
        }
        options = options.with_llm(config);
    }

    let mut meteor = Meteor::new(options)?;
    if let Some(path) = &cli.registry {
        meteor = meteor.with_registry(SqliteRegistry::open(path)?);
    }
    Ok(meteor)
}

fn to_json(value: &serde_json::Value, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}

fn cmd_extract(cli: &Cli) -> CliResult {
    let meteor = build_meteor(cli)?;

    if cli.candidates {
        for path in &cli.paths {
            let metadata = meteor.candidates(path)?;
            println!("{}", to_json(&serde_json::to_value(&metadata)?, cli.compact)?);
        }
        return Ok(());
    }

    if let [path] = cli.paths.as_slice() {
        let results = meteor.run(path)?;
        println!("{}", to_json(&serde_json::to_value(&results)?, cli.compact)?);
        return Ok(());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Extracting {} documents...", cli.paths.len()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let all = meteor.run_many(&cli.paths);
    pb.finish_and_clear();

    let mut output = serde_json::Map::new();
    let mut failed = 0;
    for (path, result) in cli.paths.iter().zip(all) {
        match result {
            Ok(results) => {
                output.insert(path.display().to_string(), serde_json::to_value(&results)?);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "Failed".red().bold(), path.display(), e);
            }
        }
    }
    println!("{}", to_json(&serde_json::Value::Object(output), cli.compact)?);

    if failed > 0 {
        return Err(format!("{} of {} documents failed", failed, cli.paths.len()).into());
    }
    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let format = detect_input(input)?;
    let doc = Document::open(input, &DocumentOptions::default())?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Path".bold(), input.display());
    match &format {
        InputFormat::Pdf(pdf) => println!("{}: PDF {}", "Format".bold(), pdf.version),
        InputFormat::Alto(files) => println!("{}: ALTO ({} files)", "Format".bold(), files.len()),
    }
    println!("{}: {}", "Pages".bold(), doc.page_count());
    let window: Vec<String> = doc.pages().keys().map(u32::to_string).collect();
    println!("{}: {}", "Window".bold(), window.join(", "));

    if let Some(info) = doc.pdf_info() {
        println!();
        println!("{}", "Embedded Metadata".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        for (key, value) in info.fields() {
            println!("{}: {}", key.bold(), value);
        }
    }

    doc.close();
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "meteor".green().bold(), env!("CARGO_PKG_VERSION"));
}
