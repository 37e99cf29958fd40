use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tictac_session_cli::infrastructure::export_schemas;
use tictac_session_cli::presentation::HELP;
use tictac_session_cli::{parse_command, CliError, LogConfig, Result, SessionView};
use tictac_session_p2p::{
    DirectorySignaling, ManualSignaling, SessionConfig, SessionError, SessionFsm, SessionPhase,
    SignalingChannel, SignalingToken, UserAction,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(name = "tictac")]
#[command(version, about = "Peer-to-peer tic-tac-toe over a direct TCP link")]
struct Cli {
    /// Debug logging with spans
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a game and print an offer for the opponent
    Host(NetworkArgs),

    /// Join a game from a host's offer
    Join {
        #[command(flatten)]
        network: NetworkArgs,

        /// Offer token (read from stdin when omitted)
        #[arg(short = 't', long)]
        token: Option<String>,
    },

    /// Write JSON Schemas for the wire formats
    Schema {
        /// Output directory
        #[arg(short = 'o', long, default_value = "schemas")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SignalKind {
    /// Copy and paste base64 tokens
    Manual,
    /// Exchange files through a shared directory
    Dir,
}

#[derive(Args)]
struct NetworkArgs {
    /// Local address for the listener
    #[arg(short = 'b', long, default_value = "0.0.0.0:0")]
    bind: SocketAddr,

    /// Extra address or host name to advertise (repeatable)
    #[arg(short = 'a', long)]
    advertise: Vec<String>,

    /// Do not offer the loopback address
    #[arg(long)]
    no_loopback: bool,

    /// How offers and answers travel
    #[arg(short = 's', long, value_enum, default_value_t = SignalKind::Manual)]
    signal: SignalKind,

    /// Shared directory for `--signal dir`
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Seconds to wait for the other side during the handshake
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::dev()
    } else {
        LogConfig::quiet()
    };
    if cli.json_logs {
        log_config = log_config.with_json();
    }
    log_config.init().map_err(CliError::Logging)?;

    match cli.command {
        Commands::Host(network) => {
            let (config, signaling) = build_config(&network)?;
            let mut session = SessionFsm::with_boxed_signaling(config, signaling);
            host_game(&mut session, network.signal).await?;
        }
        Commands::Join { network, token } => {
            let (config, signaling) = build_config(&network)?;
            let mut session = SessionFsm::with_boxed_signaling(config, signaling);
            join_game(&mut session, network.signal, token).await?;
        }
        Commands::Schema { out } => {
            for path in export_schemas(&out)? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn build_config(args: &NetworkArgs) -> Result<(SessionConfig, Box<dyn SignalingChannel>)> {
    if args.timeout == 0 {
        return Err(CliError::InvalidConfig(
            "--timeout must be at least one second".to_string(),
        ));
    }

    let timeout = Duration::from_secs(args.timeout);
    let mut config = SessionConfig::new(args.bind)
        .with_loopback(!args.no_loopback)
        .with_answer_timeout(timeout)
        .with_signaling_timeout(timeout);
    for name in &args.advertise {
        config = config.with_advertised(name.clone());
    }

    let signaling: Box<dyn SignalingChannel> = match (args.signal, &args.dir) {
        (SignalKind::Manual, None) => Box::new(ManualSignaling::new()),
        (SignalKind::Manual, Some(_)) => {
            return Err(CliError::InvalidConfig(
                "--dir requires --signal dir".to_string(),
            ));
        }
        (SignalKind::Dir, Some(dir)) => {
            info!("Using signaling directory {}", dir.display());
            Box::new(DirectorySignaling::new(dir.clone()).with_retrieve_timeout(timeout))
        }
        (SignalKind::Dir, None) => {
            return Err(CliError::InvalidConfig(
                "--signal dir requires --dir <path>".to_string(),
            ));
        }
    };

    Ok((config, signaling))
}

async fn host_game(session: &mut SessionFsm, signal: SignalKind) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let offer = session.host().await?;
    match signal {
        SignalKind::Manual => {
            println!("Send this offer to your opponent:");
            println!();
            println!("{}", offer);
            println!();
        }
        SignalKind::Dir => println!("Offer published as {}", offer),
    }

    loop {
        let answer = match session.expected_answer_token().cloned() {
            Some(token) => {
                println!("Waiting for the answer ({})...", token);
                token
            }
            None => match prompt(&mut lines, "Paste the answer:").await? {
                Some(line) => SignalingToken::new(line),
                None => return Ok(()),
            },
        };

        let applied = tokio::select! {
            result = session.accept_answer(&answer) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        match applied {
            None => return Ok(()),
            Some(Ok(())) => break,
            // A bad paste keeps the offer open
            Some(Err(SessionError::InvalidHandshake(_))) if signal == SignalKind::Manual => {
                println!("{}", session.status());
            }
            Some(Err(e)) => return Err(e.into()),
        }
    }

    run_session(session, &mut lines).await
}

async fn join_game(
    session: &mut SessionFsm,
    signal: SignalKind,
    mut token: Option<String>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    session.open_join_entry()?;

    let answer = loop {
        let (offer, interactive) = match token.take() {
            Some(offer) => (offer, false),
            None => match prompt(&mut lines, "Paste the host's offer:").await? {
                Some(line) => (line, true),
                None => return Ok(()),
            },
        };

        match session.join(&SignalingToken::new(offer)).await {
            Ok(answer) => break answer,
            Err(_) if interactive && session.phase() == SessionPhase::JoinEntry => {
                println!("{}", session.status());
            }
            Err(e) => return Err(e.into()),
        }
    };

    match signal {
        SignalKind::Manual => {
            println!("Send this answer back to the host:");
            println!();
            println!("{}", answer);
            println!();
        }
        SignalKind::Dir => println!("Answer published as {}", answer),
    }

    run_session(session, &mut lines).await
}

/// Print `message`, then read one non-empty line. `None` on end of input.
async fn prompt(lines: &mut InputLines, message: &str) -> Result<Option<String>> {
    println!("{}", message);
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
    Ok(None)
}

async fn run_session(session: &mut SessionFsm, lines: &mut InputLines) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_millis(50));
    let mut last_screen = String::new();
    let mut help_shown = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            line = lines.next_line() => match line? {
                Some(line) => match parse_command(&line) {
                    Some(action) => session.submit(action)?,
                    None => println!("{}", HELP),
                },
                None => session.submit(UserAction::Leave)?,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                session.submit(UserAction::Leave)?;
            }
        }

        session.poll();

        let screen = SessionView::new(session).to_string();
        if screen != last_screen {
            println!("{}", screen);
            if session.phase() == SessionPhase::Connected && !help_shown {
                println!("{}", HELP);
                help_shown = true;
            }
            last_screen = screen;
        }

        if session.phase() == SessionPhase::Menu {
            return Ok(());
        }
    }
}
