//! `cmdlineai`: ask Claude something from the shell.
//!
//! Uses blocking terminal reads on the main task. The only other task waits
//! for SIGINT/SIGTERM and exits the process.

use std::{num::NonZeroU16, path::PathBuf, process::ExitCode};

use clap::Parser;
use cmdlineai::{Claude, Client, Config, Console, KeyStore, Mode, Model, Prompt, Session};

/// Ask Claude questions from your terminal. The api key is read from disk or
/// asked for, checked, and optionally saved for next time.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Where the api key is kept between runs.
    #[arg(long, env = "CMDLINEAI_KEY_PATH", default_value = KeyStore::DEFAULT_PATH)]
    key_path: PathBuf,
    /// Model that answers.
    #[arg(short, long, env = "CMDLINEAI_MODEL", default_value_t = Model::default())]
    model: Model,
    /// Model used to check the api key.
    #[arg(long, default_value_t = Model::Haiku30_20240307)]
    check_model: Model,
    /// Maximum tokens per answer.
    #[arg(long, default_value_t = Prompt::DEFAULT_MAX_TOKENS)]
    max_tokens: NonZeroU16,
    /// Wait for complete answers instead of streaming them.
    #[arg(long)]
    no_stream: bool,
    /// Skip the menu and go straight to the prompt.
    #[arg(long)]
    no_menu: bool,
    /// Messages API endpoint.
    #[arg(long, env = "ANTHROPIC_API_URL", default_value = Client::DEFAULT_URL)]
    url: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            key_path: args.key_path,
            model: args.model,
            check_model: args.check_model,
            max_tokens: args.max_tokens,
            mode: if args.no_stream {
                Mode::Whole
            } else {
                Mode::Stream
            },
            menu: !args.no_menu,
            url: args.url,
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                log::error!("Failed to install SIGTERM handler: {}", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run(config: Config) -> cmdlineai::session::Result<()> {
    let mut session = Session::open(
        config.store(),
        Console::default(),
        config.mode,
        |key| Ok(Claude::new(Client::new(key)?.with_url(config.url.clone()), &config)),
    )
    .await?;

    session.run(config.start()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = Config::from(Args::parse());
    log::debug!("{:?}", config);

    tokio::spawn(async {
        shutdown_signal().await;
        println!("\nExiting...");
        std::process::exit(0);
    });

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{:?}", error);
            eprintln!("{}", console::style(error).red());
            ExitCode::FAILURE
        }
    }
}
