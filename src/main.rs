use std::env;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use meetwatch::api::ApiClient;
use meetwatch::bot;
use meetwatch::live::discovery::discover_active;
use meetwatch::live::{MonitorEvent, MonitorHandle};
use meetwatch::{LiveFlag, LiveMonitor, Settings};

fn print_usage() {
    eprintln!("Usage: meetwatch <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  watch                      follow the active session's transcript");
    eprintln!("  dispatch <meeting-url>     send a bot into a meeting, then watch it");
    eprintln!("  sessions                   list active bot and live sessions");
    eprintln!("  name <speaker> <name>      map a speaker label to a real name");
    eprintln!();
    eprintln!("The backend URL comes from ~/.config/meetwatch/config.toml or the");
    eprintln!("MEETWATCH_API_URL environment variable (default http://localhost:8000).");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(2);
    }

    let settings = Settings::load();
    match args[1].as_str() {
        "watch" => watch(settings).await,
        "dispatch" => {
            let Some(meeting_url) = args.get(2) else {
                eprintln!("dispatch needs a meeting URL");
                print_usage();
                std::process::exit(2);
            };
            dispatch(settings, meeting_url).await
        }
        "sessions" => sessions(settings).await,
        "name" => {
            let (Some(speaker), Some(name)) = (args.get(2), args.get(3)) else {
                eprintln!("name needs a speaker label and a name");
                print_usage();
                std::process::exit(2);
            };
            name_speaker(settings, speaker, name).await
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

/// Follow the active session until it ends or Ctrl-C.
async fn watch(settings: Settings) -> Result<()> {
    let client = ApiClient::new(&settings.api_base_url);
    let monitor = LiveMonitor::with_config(client, settings.monitor_config()).start();
    let mut events = monitor.subscribe();
    let flag = monitor.live_flag();

    println!("watching {} (Ctrl-C to stop)", settings.api_base_url);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if flag.is_live() {
                    println!("leaving the live session");
                }
                log::info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if render_event(&monitor, &flag, event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    log::warn!("renderer fell behind, dropped {} events", n)
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    monitor.stop();
    Ok(())
}

/// Print one monitor event. Returns true once the session is over.
fn render_event(monitor: &MonitorHandle, flag: &LiveFlag, event: MonitorEvent) -> bool {
    match event {
        MonitorEvent::Discovered { session } => {
            println!("session {} ({})", session.session_id(), session.kind());
        }
        MonitorEvent::NewSegments { segments } => {
            let mapping = monitor.mapping();
            for segment in segments {
                let speaker = mapping
                    .get(&segment.speaker)
                    .unwrap_or(&segment.speaker);
                println!("[{}] {}: {}", segment.time, speaker, segment.text);
            }
        }
        MonitorEvent::SpeakersChanged { mapping } => {
            println!("speaker names updated ({} mapped)", mapping.len());
        }
        MonitorEvent::Clock { elapsed } => {
            // One status line per minute, and only while a session is live
            if flag.is_live() && elapsed.ends_with(":00") {
                println!("-- {} elapsed --", elapsed);
            }
        }
        MonitorEvent::ConnectionLost { message } => {
            println!("! backend unreachable, retrying: {}", message);
        }
        MonitorEvent::SessionLost { session_id } => {
            println!("session {} is gone, looking for a new one", session_id);
        }
        MonitorEvent::Ended { session_id, reason } => {
            println!("session {} ended: {}", session_id, reason);
            return true;
        }
    }
    false
}

/// Dispatch a bot, wait for it to reach the meeting, then watch it.
async fn dispatch(settings: Settings, meeting_url: &str) -> Result<()> {
    let client = ApiClient::new(&settings.api_base_url);
    let session_id = bot::dispatch(&client, meeting_url).await?;
    println!("bot session {} dispatched, waiting for it to join...", session_id);
    bot::wait_until_ready(&client, &session_id, settings.join_poll()).await?;
    println!("bot is in the meeting");
    watch(settings).await
}

async fn sessions(settings: Settings) -> Result<()> {
    let client = ApiClient::new(&settings.api_base_url);
    let bots = client.list_bot_sessions().await?;
    let lives = client.list_live_sessions().await?;

    if bots.is_empty() && lives.is_empty() {
        println!("no active sessions");
        return Ok(());
    }
    for session in bots {
        let status = session.status.map(|s| s.as_str()).unwrap_or("unknown");
        println!(
            "bot   {}  status={}  meeting={}",
            session.id,
            status,
            session.meeting_id.as_deref().unwrap_or("-")
        );
    }
    for session in lives {
        println!(
            "live  {}  topic={}",
            session.session_id,
            session.meeting_topic.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Set one speaker's display name on the active session.
async fn name_speaker(settings: Settings, speaker: &str, name: &str) -> Result<()> {
    let client = ApiClient::new(&settings.api_base_url);
    let session = discover_active(&client).await?;
    let session_id = session.session_id();

    let current = client.fetch_speakers(session_id).await?;
    let mut mapping = current.mapping;
    mapping.insert(speaker.to_string(), name.to_string());
    client.save_speaker_mapping(session_id, &mapping).await?;

    println!("{}: {} -> {}", session_id, speaker, name);
    Ok(())
}
