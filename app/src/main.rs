use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use tutor::ChatConsole;
use tutor_core::{telemetry, AiRuntimeSettings, AppState, LlmProviderKind};

#[derive(Parser, Debug)]
#[command(name = "tutor", version, about = "Chat with an Obsidian tutor from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Provider to start with (`openai` or `huggingface`).
    #[arg(long)]
    provider: Option<LlmProviderKind>,
    /// Read settings from this file instead of searching for tutor.yaml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Start in deep research mode.
    #[arg(long)]
    research: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question and print the answer.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    telemetry::init_tracing(telemetry::default_filter("info"))?;
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let state = AppState::from_settings(&settings)?;
    if cli.research {
        state.toggle_research_mode();
    }
    info!(provider = state.provider().id(), "tutor ready");

    let runtime = Runtime::new()?;
    match cli.command {
        Some(Command::Ask { question }) => {
            let outcome = runtime.block_on(state.send_user_message(&question.join(" ")));
            if !outcome.success {
                bail!(outcome.response);
            }
            println!("{}", outcome.response);
            Ok(())
        }
        None => run_interactive(&runtime, ChatConsole::new(state)),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<AiRuntimeSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let mut settings =
                AiRuntimeSettings::load_from(path).map_err(|err| anyhow!(err.user_message()))?;
            settings
                .apply_env(|key| std::env::var(key).ok())
                .map_err(|err| anyhow!(err.user_message()))?;
            settings
        }
        None => AiRuntimeSettings::load().map_err(|err| anyhow!(err.user_message()))?,
    };
    if let Some(provider) = cli.provider {
        settings.provider = provider;
    }
    Ok(settings)
}

fn run_interactive(runtime: &Runtime, console: ChatConsole) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("Obsidian tutor. Type /help for commands, /quit to leave.");

    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", console.prompt());
        stdout.flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let reply = runtime.block_on(console.handle_line(&line));
        if !reply.text.is_empty() {
            println!("{}\n", reply.text);
        }
        if reply.exit {
            break;
        }
    }
    Ok(())
}
