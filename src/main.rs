use std::io::{self, Write};

use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use docchat::api::ApiClient;
use docchat::chat::{ChatController, ChatEvent, Notification, NotificationKind};
use docchat::cli::{parse_command, Args, Command, HELP_TEXT};
use docchat::clipboard::{Clipboard, Osc52Clipboard, SystemClipboard};
use docchat::config::{ClientConfig, FileConfig, API_BASE_ENV};
use docchat::history::HistoryOutcome;
use docchat::location::session_from_location;
use docchat::render::{self, terminal_width, Transcript};
use docchat::transport::ChannelEvent;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "docchat", &mut io::stdout());
        return Ok(());
    }
    if args.no_color {
        colored::control::set_override(false);
    }

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let env_base_url = std::env::var(API_BASE_ENV).ok();
    let config = ClientConfig::resolve(
        args.api_base_url.as_deref(),
        args.collection.as_deref(),
        env_base_url.as_deref(),
        file,
    );
    init_tracing(&config.log_filter);

    let api = ApiClient::new(config.rest_base_url());

    // One-off REST actions
    if args.list_collections {
        for name in api.list_collections().await? {
            println!("{}", name);
        }
        return Ok(());
    }
    if args.list_docs {
        for doc in api.list_documents().await? {
            println!("{}  {}", doc.file_id.bright_blue(), doc.file_name);
        }
        return Ok(());
    }
    if let Some(file_id) = &args.delete_doc {
        let resp = api.delete_document(file_id).await?;
        match (resp.message, resp.error) {
            (_, Some(error)) => eprintln!("{}", error.bright_red()),
            (Some(message), None) => println!("{}", message.bright_green()),
            (None, None) => println!("{}", "Deleted.".bright_green()),
        }
        return Ok(());
    }
    if let Some(path) = &args.upload {
        if !path.is_file() {
            eprintln!("{}", "Please select a file to upload.".bright_red());
            return Ok(());
        }
        match api.upload_document(path).await {
            Ok(resp) => println!("{} ({})", resp.message.bright_green(), resp.file_id),
            Err(e) => {
                tracing::warn!(error = %e, "upload failed");
                eprintln!("{}", "Failed to upload document.".bright_red());
            }
        }
        return Ok(());
    }
    if args.recent {
        print!("{}", render::render_recent(&api.latest_application_logs().await?));
        return Ok(());
    }

    let resumed = args.session.as_deref().and_then(session_from_location);
    let (mut chat, mut events) =
        ChatController::new(config.ws_endpoint(), config.collection.clone(), resumed);
    let mut transcript = Transcript::new(terminal_width());

    if chat.mount() {
        let outcome = chat.load_history(&api).await;
        report_history(outcome.as_ref(), &chat);
    }

    if let Some(prompt) = &args.prompt {
        run_once(&mut chat, &mut events, &mut transcript, prompt).await;
    } else {
        let mut clipboard: Box<dyn Clipboard> = if args.osc52 {
            Box::new(Osc52Clipboard::new(io::stdout()))
        } else {
            Box::new(SystemClipboard::new())
        };
        run_interactive(&mut chat, &mut events, &mut transcript, &api, clipboard.as_mut()).await?;
    }
    chat.close();
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn flush_view(transcript: &mut Transcript, chat: &ChatController) {
    print!("{}", transcript.drain(chat.messages()));
    let _ = io::stdout().flush();
}

fn print_status(text: &str) {
    println!("{}", text.dimmed());
}

fn print_notification(note: &Notification) {
    match note.kind {
        NotificationKind::Success => println!("{}", note.text.bright_green()),
        NotificationKind::Failure => println!("{}", note.text.bright_red()),
    }
}

fn print_location(chat: &ChatController) {
    if let Some(location) = chat.location() {
        print_status(&format!("session {}", location));
    }
}

fn report_history(outcome: Option<&HistoryOutcome>, chat: &ChatController) {
    match outcome {
        Some(HistoryOutcome::Seeded(n)) => print_status(&format!("loaded {} messages", n)),
        Some(HistoryOutcome::StaleSession) => {
            print_status("session has no history, started a new one");
            print_location(chat);
        }
        _ => {}
    }
}

/// `--prompt`: one question, stream the answer, done.
async fn run_once(
    chat: &mut ChatController,
    events: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    transcript: &mut Transcript,
    prompt: &str,
) {
    chat.send(prompt, true);
    flush_view(transcript, chat);
    if !chat.is_loading() {
        return;
    }

    while let Some(event) = events.recv().await {
        let update = chat.handle_channel_event(event);
        flush_view(transcript, chat);
        match update {
            ChatEvent::Frame(outcome) if outcome.completed || outcome.error.is_some() => break,
            ChatEvent::Disconnected { .. } => break,
            _ => {}
        }
    }
    // An interrupted answer never gets its completion frame.
    print!("{}", transcript.finish(chat.messages()));
    let _ = io::stdout().flush();
}

async fn run_interactive(
    chat: &mut ChatController,
    events: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    transcript: &mut Transcript,
    api: &ApiClient,
    clipboard: &mut dyn Clipboard,
) -> Result<(), BoxError> {
    println!("{}", "DOCCHAT".bright_cyan().bold());
    print_location(chat);
    if let Some(collection) = chat.collection() {
        print_status(&format!("collection {}", collection));
    }
    print_status("type /help for commands");
    println!();
    flush_view(transcript, chat);

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    loop {
        tokio::select! {
            line = lines.next() => {
                match line {
                    Some(Ok(line)) => {
                        if !dispatch(parse_command(&line), chat, transcript, api, clipboard).await {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                if let ChatEvent::Disconnected { reason, .. } = chat.handle_channel_event(event) {
                    tracing::info!(%reason, "disconnected; next send reconnects");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
        flush_view(transcript, chat);
    }
    Ok(())
}

/// Run one command. Returns false when the user asked to quit.
async fn dispatch(
    command: Command,
    chat: &mut ChatController,
    transcript: &mut Transcript,
    api: &ApiClient,
    clipboard: &mut dyn Clipboard,
) -> bool {
    match command {
        Command::Send(text) => {
            chat.set_input(text);
            chat.send_input();
            flush_view(transcript, chat);
            if chat.is_loading() {
                print!("{}", render::loading_line());
            }
        }
        Command::Stop => {
            if chat.stop() {
                print_status("stop requested");
            }
        }
        Command::New => {
            chat.start_new_session();
            transcript.reset();
            print_location(chat);
        }
        Command::Regenerate => {
            if chat.regenerate() {
                print!("{}", render::loading_line());
            } else if chat.messages().iter().all(|m| !m.is_user) {
                print_status("nothing to regenerate");
            }
        }
        Command::Copy(n) => {
            match n.map(|n| n - 1).or_else(|| chat.last_response_index()) {
                Some(index) => print_notification(&chat.copy(index, clipboard)),
                None => print_status("nothing to copy"),
            }
        }
        Command::Collection(name) => {
            chat.select_collection(name);
            match chat.collection() {
                Some(c) => print_status(&format!("collection {}", c)),
                None => print_status("collection none"),
            }
        }
        Command::Collections => match api.list_collections().await {
            Ok(names) if names.is_empty() => print_status("no collections"),
            Ok(names) => names.iter().for_each(|n| println!("{}", n)),
            Err(e) => eprintln!("{}", format!("Failed to fetch collections: {}", e).bright_red()),
        },
        Command::Recent => match api.latest_application_logs().await {
            Ok(logs) => print!("{}", render::render_recent(&logs)),
            Err(e) => eprintln!("{}", format!("Failed to fetch recent chats: {}", e).bright_red()),
        },
        Command::Open(target) => match session_from_location(&target) {
            Some(id) => {
                chat.open_session(id);
                transcript.reset();
                print_location(chat);
                let outcome = chat.load_history(api).await;
                report_history(outcome.as_ref(), chat);
            }
            None => print_status("no session id in that location"),
        },
        Command::Delete(id) => match api.delete_application_logs(&id).await {
            Ok(_) => {
                print_status(&format!("deleted session {}", id));
                if chat.forget_session(&id) {
                    transcript.reset();
                    print_location(chat);
                }
            }
            Err(e) => eprintln!("{}", format!("Failed to delete session: {}", e).bright_red()),
        },
        Command::Where => print_location(chat),
        Command::Help => println!("{}", HELP_TEXT),
        Command::Quit => return false,
        Command::Empty => {}
        Command::Unknown(line) => print_status(&format!("unknown command: {} (try /help)", line)),
    }
    true
}
