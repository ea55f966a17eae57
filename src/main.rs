use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speech_buddy::ai::AiServices;
use speech_buddy::audio::AudioSinkFactory;
use speech_buddy::conversation::{RoomEvent, Speaker};
use speech_buddy::session::{SessionData, SpeechRoom};
use speech_buddy::{create_router, AppState, Config, GeminiClient};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speech-buddy")]
#[command(about = "Vietnamese speech-practice companion for children")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/speech-buddy")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API for the browser front end
    Serve,

    /// Practice from the terminal; type `/end` to finish
    Chat {
        /// Conversation topic
        #[arg(short, long, default_value = "Động vật")]
        topic: String,

        /// Comma-separated vocabulary
        #[arg(short, long, default_value = "con chó, con mèo, con chim")]
        vocabulary: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Speech Buddy v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let client = GeminiClient::from_config(&cfg.gemini)?;
    let ai = AiServices::from_provider(Arc::new(client));

    match args.command {
        Command::Serve => serve(cfg, ai).await,
        Command::Chat { topic, vocabulary } => chat(cfg, ai, &topic, &vocabulary).await,
    }
}

async fn serve(cfg: Config, ai: AiServices) -> Result<()> {
    let state = AppState::new(ai, cfg.audio.clone(), cfg.conversation.streaming);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn chat(cfg: Config, ai: AiServices, topic: &str, vocabulary: &str) -> Result<()> {
    let data = SessionData::parse(topic, vocabulary)?;
    let audio = cfg.audio.for_run("chat");
    let sink = AudioSinkFactory::create(&audio)?;
    info!("Playing through {} sink", sink.name());

    let room = SpeechRoom::open(
        data,
        ai.clone(),
        sink,
        audio.sample_rate,
        cfg.conversation.streaming,
    );

    let printer = tokio::spawn(print_events(room.subscribe()));

    room.start().await;
    room.playback().wait_idle().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/end" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        if let Err(e) = room.submit_text(line).await {
            warn!("Message refused: {}", e);
            continue;
        }
        room.playback().wait_idle().await;
    }

    let report = room.end().await;
    room.drain_playback().await;
    printer.abort();

    println!("\n=== {} ({}) ===", report.topic, report.date);
    println!("Thời gian: {} phút", report.duration);
    println!("Độ chính xác: {:.0}%", report.accuracy);
    println!("Mức độ tham gia: {}", report.engagement);
    for note in &report.psychological_notes {
        println!("- {}", note);
    }

    let request = speech_buddy::ai::SummaryRequest {
        topic: report.topic.clone(),
        conversation: report.conversation.clone(),
        notes: report.psychological_notes.clone(),
    };
    println!("\n{}", ai.summarize(&request).await);

    Ok(())
}

/// Echo the transcript to the terminal as it grows
async fn print_events(mut events: broadcast::Receiver<RoomEvent>) {
    let mut shown = String::new();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Terminal missed {} room events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            RoomEvent::MessageAppended { message, .. } => {
                if message.sender == Speaker::Ai {
                    print!("\nAI: {}", message.text);
                    shown = message.text;
                }
            }
            RoomEvent::MessageUpdated { text, .. } => {
                match text.strip_prefix(shown.as_str()) {
                    Some(rest) => print!("{}", rest),
                    None => print!("\nAI: {}", text),
                }
                shown = text;
            }
            RoomEvent::Distress { .. } => println!("\n[!] Bé có vẻ buồn hoặc căng thẳng"),
            RoomEvent::CaptureHint { message } => println!("\n{}", message),
            RoomEvent::ClipReady { .. } => {}
        }
        let _ = std::io::stdout().flush();
    }
}
