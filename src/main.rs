use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use roadvoice::chat::ChatClient;
use roadvoice::config::Config;
use roadvoice::sanitize;
use roadvoice::session::{SessionHandle, VoiceSession};
use roadvoice::speech::{ConsoleInput, ConsoleOutput, SoloFocus, SpeechOutput};

/// Roadvoice - hands-free voice assistant
#[derive(Parser)]
#[command(name = "roadvoice", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive voice session (default)
    Run,
    /// Ask a single question and print the answer
    Ask {
        /// Question text
        text: String,
    },
    /// Push text through the speech output path
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the speech output.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,roadvoice=info",
        1 => "info,roadvoice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_session(config).await,

        Command::Ask { text } => {
            let client = ChatClient::new(config.chat)?;
            let answer = client.send_message(&text).await?;
            println!("{}", sanitize::sanitize(&answer));
            Ok(())
        }

        Command::Say { text } => {
            let spoken = sanitize::cap_for_speech(
                &sanitize::sanitize(&text),
                config.speech.spoken_length_cap,
                config.speech.spoken_truncate_to,
            );
            ConsoleOutput.speak(&spoken).await?;
            Ok(())
        }
    }
}

/// Run the interactive session until interrupted
async fn run_session(config: Config) -> anyhow::Result<()> {
    let client = Arc::new(ChatClient::new(config.chat)?);
    let input = Arc::new(ConsoleInput::new(config.speech.capture_window));
    let output = Arc::new(ConsoleOutput);
    let focus = Arc::new(SoloFocus::default());

    let (session, handle) = VoiceSession::new(client, input, output, focus, config.speech);
    let session_task = tokio::spawn(session.run());

    handle.announce("Voice assistant ready. Type your question and press enter.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received");
        }
        result = interact(&handle) => {
            if let Err(e) = result {
                tracing::debug!(error = %e, "interaction loop ended");
            }
        }
    }

    handle.shutdown();
    let _ = session_task.await;

    Ok(())
}

/// Drive listen/answer cycles back to back
async fn interact(handle: &SessionHandle) -> anyhow::Result<()> {
    let mut busy = handle.watch_busy();

    loop {
        // Wait out the greeting or any feedback still playing
        while *busy.borrow_and_update() {
            busy.changed().await?;
        }

        print!("you> ");
        std::io::stdout().flush()?;
        handle.start();

        // Cycle begins...
        while !*busy.borrow_and_update() {
            busy.changed().await?;
        }
        // ...and runs to completion
        while *busy.borrow_and_update() {
            busy.changed().await?;
        }
    }
}
