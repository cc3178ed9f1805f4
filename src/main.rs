use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use voicechat_gateway::config::{DEFAULT_GEOCODE_URL, DEFAULT_SERVER_URL};
use voicechat_gateway::location::FixedPosition;
use voicechat_gateway::voice::{SessionState, TerminalCapture, TerminalSpeaker};
use voicechat_gateway::{
    ApiServerBuilder, Config, LocationLookup, NewUser, Position, RecordClient, SessionClient,
    UserPatch, VoiceSessionController, db, locate,
};

/// Voicechat - voice assistant chat server and terminal client
#[derive(Parser)]
#[command(name = "voicechat", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP and session channel server (default)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start a terminal voice session against a running server
    Chat {
        /// Server base URL
        #[arg(long, env = "VOICECHAT_SERVER", default_value = DEFAULT_SERVER_URL)]
        server: String,
    },
    /// Manage user records on a running server
    Users {
        /// Server base URL
        #[arg(long, env = "VOICECHAT_SERVER", default_value = DEFAULT_SERVER_URL, global = true)]
        server: String,

        #[command(subcommand)]
        action: UsersCommand,
    },
    /// Look up city, country and postal code for a position
    Locate {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Reverse-geocoding base URL
        #[arg(long, env = "GEOCODE_URL", default_value = DEFAULT_GEOCODE_URL)]
        geocode_url: String,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List all records, newest first
    List,
    /// Show one record
    Get { id: String },
    /// Create a record
    Create {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
    },
    /// Update fields of a record
    Update {
        id: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Delete a record
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voicechat_gateway=info",
        1 => "info,voicechat_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
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
    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::Chat { server } => chat(&server).await,
        Command::Users { server, action } => users(&server, action).await,
        Command::Locate {
            lat,
            lon,
            geocode_url,
        } => {
            let position = lat
                .zip(lon)
                .map(|(latitude, longitude)| Position {
                    latitude,
                    longitude,
                });
            let lookup = LocationLookup::new(&geocode_url)?;
            match locate(&FixedPosition(position), &lookup).await {
                Ok(details) => {
                    println!("City:    {}", details.city);
                    println!("Country: {}", details.country);
                    println!("Pincode: {}", details.pincode);
                }
                Err(message) => println!("{message}"),
            }
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }

    tracing::info!(
        port = config.port,
        database = ?config.database,
        cors_origin = %config.cors_origin,
        "starting voicechat gateway"
    );

    let pool = db::open(&config.database)?;
    ApiServerBuilder::from_config(pool, &config)
        .build()?
        .run()
        .await?;

    tracing::info!("voicechat gateway stopped");
    Ok(())
}

async fn chat(server: &str) -> anyhow::Result<()> {
    let (client, mut incoming) = SessionClient::connect(server).await?;
    let mut controller = VoiceSessionController::new(
        TerminalCapture::new(),
        TerminalSpeaker::new(std::io::stdout()),
        client.sender(),
    );

    println!("Connected to {server}");
    println!("Commands: /start /stop /pause /resume /quit; other lines are spoken input");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_error: Option<String> = None;

    loop {
        let deadline = controller.synthesizer().deadline();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line {
                    "" => {}
                    "/quit" => break,
                    "/start" => {
                        if controller.start() {
                            controller.on_capture_started();
                            println!("(recording)");
                        }
                    }
                    "/stop" => {
                        controller.stop();
                        println!("(stopped)");
                    }
                    "/pause" => {
                        if !controller.has_response() {
                            println!("(no response yet)");
                        } else if !controller.interrupt() {
                            println!("(nothing is playing)");
                        }
                    }
                    "/resume" => {
                        if !controller.resume() {
                            println!("(nothing is paused)");
                        }
                    }
                    text => {
                        if controller.state() == SessionState::Idle {
                            println!("(not recording; type /start first)");
                        } else {
                            controller.on_capture_result(text, true);
                        }
                    }
                }
            }
            message = incoming.recv() => {
                let Some(message) = message else {
                    println!("Disconnected from server");
                    break;
                };
                controller.on_server_message(message);
            }
            () = speech_finished(deadline) => {
                controller.synthesizer_mut().finish();
                controller.on_speech_end();
            }
        }

        let current = controller.error().map(str::to_string);
        if current != shown_error {
            if let Some(error) = &current {
                eprintln!("error: {error}");
            }
            shown_error = current;
        }
    }

    controller.stop();
    Ok(())
}

async fn speech_finished(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn users(server: &str, action: UsersCommand) -> anyhow::Result<()> {
    let client = RecordClient::new(server)?;

    match action {
        UsersCommand::List => {
            let records = client.list().await?;
            if records.is_empty() {
                println!("No users found");
            }
            for record in records {
                println!(
                    "{}  {}  <{}>  {}",
                    record.id, record.full_name, record.email, record.phone
                );
            }
        }
        UsersCommand::Get { id } => {
            let record = client.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        UsersCommand::Create {
            full_name,
            email,
            phone,
            address,
        } => {
            let record = client
                .create(&NewUser {
                    full_name,
                    email,
                    phone,
                    address,
                })
                .await?;
            println!("User saved successfully");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        UsersCommand::Update {
            id,
            full_name,
            email,
            phone,
            address,
        } => {
            let patch = UserPatch {
                full_name,
                email,
                phone,
                address,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update; pass at least one field");
            }
            let record = client.update(&id, &patch).await?;
            println!("User updated successfully");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        UsersCommand::Delete { id } => {
            let message = client.delete(&id).await?;
            println!("{message}");
        }
    }

    Ok(())
}
