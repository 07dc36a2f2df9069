use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{ActionOutcome, HostAction, SessionSnapshot};
use dialogue_api::{serve, HostConfig, SessionApi, StaticCredentialProvider};
use dialogue_core::{CapabilityToken, Catalog, Roster, Session, SteppedClock};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("rehearsal <command>");
    println!("commands:");
    println!("  serve [addr]");
    println!("    default addr: REHEARSAL_BIND_ADDR or 127.0.0.1:8080");
    println!("  play");
    println!("    interactive session on stdin; /advance /end /restart /status /quit");
    println!("  replay <script>");
    println!("    runs a script of play-style lines with a stepped clock and prints the transcript");
    println!("  classify <text>");
    println!("  catalog");
    println!("  transcript <snapshot.json>");
}

enum Input {
    Action(HostAction),
    Status,
    Quit,
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let input = match trimmed {
        "/advance" => Input::Action(HostAction::Advance),
        "/end" => Input::Action(HostAction::EndSimulation),
        "/restart" => Input::Action(HostAction::Restart),
        "/status" => Input::Status,
        "/quit" => Input::Quit,
        other if other.starts_with('/') => return Err(format!("unknown command: {other}")),
        text => Input::Action(HostAction::SubmitText {
            text: text.to_string(),
        }),
    };
    Ok(Some(input))
}

fn load_catalog(config: &HostConfig) -> Result<Arc<Catalog>, String> {
    config
        .load_catalog()
        .map(Arc::new)
        .map_err(|err| format!("failed to load catalog: {err}"))
}

fn print_outcome(roster: &Roster, outcome: &ActionOutcome) {
    for turn in &outcome.appended {
        println!("{}: {}", roster.label(turn.speaker), turn.text);
    }
    if outcome.transitioned() {
        println!("[{} -> {}]", outcome.previous_stage, outcome.stage);
    }
    if let Some(diagnostic) = &outcome.diagnostic {
        eprintln!("ignored {}: {}", outcome.action, diagnostic.message);
    }
}

fn run_play(config: &HostConfig) -> Result<(), String> {
    let catalog = load_catalog(config)?;
    let roster = catalog.roster().clone();
    let session =
        Session::new("cli", catalog).with_progress_threshold(config.progress_threshold);
    let provider = StaticCredentialProvider::new(config.access_token.clone());
    let mut api = SessionApi::new(session, Arc::new(provider));

    println!("{}", api.status());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().map_err(|err| err.to_string())?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|err| format!("failed to read stdin: {err}"))?;
        if read == 0 {
            break;
        }

        match parse_input(&line) {
            Ok(Some(Input::Action(action))) => print_outcome(&roster, &api.submit(action)),
            Ok(Some(Input::Status)) => println!("{}", api.status()),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(err) => eprintln!("{err}"),
        }
    }
    Ok(())
}

fn run_replay(config: &HostConfig, path: Option<&String>) -> Result<(), String> {
    let path = path.ok_or_else(|| "missing script path".to_string())?;
    let script = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let catalog = load_catalog(config)?;
    let mut session = Session::new("replay", catalog)
        .with_clock(SteppedClock::default())
        .with_progress_threshold(config.progress_threshold)
        .with_credential(CapabilityToken::new("replay"));

    for (number, line) in script.lines().enumerate() {
        match parse_input(line).map_err(|err| format!("line {}: {err}", number + 1))? {
            Some(Input::Action(action)) => {
                let outcome = session.apply(action);
                if let Some(diagnostic) = outcome.diagnostic {
                    eprintln!("line {}: ignored: {}", number + 1, diagnostic.message);
                }
            }
            Some(Input::Status) => eprintln!("line {}: {}", number + 1, session.status()),
            Some(Input::Quit) => break,
            None => {}
        }
    }

    println!("{}", session.transcript_markdown());
    Ok(())
}

fn run_classify(config: &HostConfig, args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("missing text".to_string());
    }
    let text = args.join(" ");
    let catalog = load_catalog(config)?;
    let category = catalog.classifier().classify(&text, catalog.bank());
    println!("{category}");
    Ok(())
}

fn run_catalog(config: &HostConfig) -> Result<(), String> {
    let catalog = load_catalog(config)?;
    let summary = serde_json::to_string_pretty(&catalog.summary())
        .map_err(|err| format!("failed to encode catalog summary: {err}"))?;
    println!("{summary}");
    Ok(())
}

fn run_transcript(config: &HostConfig, path: Option<&String>) -> Result<(), String> {
    let path = path.ok_or_else(|| "missing snapshot path".to_string())?;
    let raw = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let snapshot: SessionSnapshot =
        serde_json::from_str(&raw).map_err(|err| format!("invalid snapshot: {err}"))?;
    let catalog = load_catalog(config)?;
    let restored = Session::restore(catalog, snapshot).map_err(|err| err.to_string())?;
    if let Some(diagnostic) = &restored.diagnostic {
        warn!(message = %diagnostic.message, "snapshot restored with a recovered stage");
    }
    println!("{}", restored.session.transcript_markdown());
    Ok(())
}

fn parse_socket_addr(value: Option<&String>, default: SocketAddr) -> Result<SocketAddr, String> {
    match value {
        Some(raw) => raw
            .parse::<SocketAddr>()
            .map_err(|_| format!("invalid addr: {raw}")),
        None => Ok(default),
    }
}

fn exit_with_usage(err: String) -> ! {
    eprintln!("error: {err}");
    print_usage();
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    let mut config = match HostConfig::from_env() {
        Ok(config) => config,
        Err(err) => exit_with_usage(err.to_string()),
    };

    let result = match command {
        Some("serve") => match parse_socket_addr(args.get(2), config.bind_addr) {
            Ok(addr) => {
                config.bind_addr = addr;
                println!("serving api on http://{addr}");
                if let Err(err) = serve(config).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
                Ok(())
            }
            Err(err) => Err(err),
        },
        Some("play") => run_play(&config),
        Some("replay") => run_replay(&config, args.get(2)),
        Some("classify") => run_classify(&config, &args[2..]),
        Some("catalog") => run_catalog(&config),
        Some("transcript") => run_transcript(&config, args.get(2)),
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(err) = result {
        exit_with_usage(err);
    }
}
