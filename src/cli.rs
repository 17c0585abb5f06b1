use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "docchat")]
#[command(version)]
#[command(about = "Chat with your document collections from the terminal")]
pub struct Args {
    /// Backend base URL (e.g. http://localhost:8000). Overrides CHAT_API_BASE_URL
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// TOML config file with api_base_url / collection / log_filter
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resume a session: a bare id or a location such as "http://host/?sessionId=ID"
    #[arg(long)]
    pub session: Option<String>,

    /// Collection (topic) to ask questions against
    #[arg(long, short)]
    pub collection: Option<String>,

    /// Ask a single question, print the streamed answer and exit
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Upload a document (.pdf, .docx, .html) and exit
    #[arg(long)]
    pub upload: Option<PathBuf>,

    /// List available collections and exit
    #[arg(long)]
    pub list_collections: bool,

    /// List uploaded documents and exit
    #[arg(long)]
    pub list_docs: bool,

    /// Delete an uploaded document by file id and exit
    #[arg(long)]
    pub delete_doc: Option<String>,

    /// Show recent chat sessions and exit
    #[arg(long)]
    pub recent: bool,

    /// Copy through the terminal (OSC 52) instead of the system clipboard,
    /// e.g. over SSH
    #[arg(long)]
    pub osc52: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<clap_complete::Shell>,
}

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Stop,
    New,
    Regenerate,
    /// Copy message N (1-based as shown to the user); `None` means the latest
    /// response.
    Copy(Option<usize>),
    Collection(Option<String>),
    Collections,
    Recent,
    Open(String),
    Delete(String),
    Where,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  <text>               send a message
  /stop                stop the current response
  /new                 start a new session
  /regen               ask the last question again
  /copy [N]            copy message N (default: latest response)
  /collection [NAME]   ask against NAME (no name: none)
  /collections         list collections
  /recent              list recent sessions
  /open <ID|URL>       switch to a session
  /delete <ID>         delete a session's history
  /where               show the current session location
  /help                this text
  /quit                exit";

/// Parse one input line. Anything not starting with `/` is a message.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Send(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let arg_opt = if arg.is_empty() { None } else { Some(arg.to_string()) };

    match name.to_lowercase().as_str() {
        "stop" => Command::Stop,
        "new" => Command::New,
        "regen" | "regenerate" => Command::Regenerate,
        "copy" => match arg_opt {
            None => Command::Copy(None),
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Copy(Some(n)),
                _ => Command::Unknown(trimmed.to_string()),
            },
        },
        "collection" => Command::Collection(arg_opt),
        "collections" => Command::Collections,
        "recent" | "history" => Command::Recent,
        "open" => arg_opt.map(Command::Open).unwrap_or_else(|| Command::Unknown(trimmed.to_string())),
        "delete" => arg_opt.map(Command::Delete).unwrap_or_else(|| Command::Unknown(trimmed.to_string())),
        "where" => Command::Where,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["docchat"]);
        assert!(args.api_base_url.is_none());
        assert!(args.session.is_none());
        assert!(args.prompt.is_none());
        assert!(!args.list_collections);
        assert!(!args.no_color);
        assert!(!args.osc52);
    }

    #[test]
    fn test_args_osc52_flag() {
        let args = Args::parse_from(["docchat", "--osc52"]);
        assert!(args.osc52);
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "docchat",
            "--api-base-url",
            "http://localhost:8000",
            "--session",
            "abc",
            "-c",
            "manuals",
            "-p",
            "what is in the manual?",
            "--no-color",
        ]);
        assert_eq!(args.api_base_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(args.session.as_deref(), Some("abc"));
        assert_eq!(args.collection.as_deref(), Some("manuals"));
        assert_eq!(args.prompt.as_deref(), Some("what is in the manual?"));
        assert!(args.no_color);
    }

    #[test]
    fn test_args_upload_path() {
        let args = Args::parse_from(["docchat", "--upload", "docs/guide.pdf"]);
        assert_eq!(args.upload, Some(PathBuf::from("docs/guide.pdf")));
    }

    #[test]
    fn test_args_completions() {
        let args = Args::parse_from(["docchat", "--completions", "bash"]);
        assert_eq!(args.completions, Some(clap_complete::Shell::Bash));
    }

    #[rstest]
    #[case("hello there", Command::Send("hello there".into()))]
    #[case("   ", Command::Empty)]
    #[case("/stop", Command::Stop)]
    #[case("/NEW", Command::New)]
    #[case("/regen", Command::Regenerate)]
    #[case("/copy", Command::Copy(None))]
    #[case("/copy 3", Command::Copy(Some(3)))]
    #[case("/copy 0", Command::Unknown("/copy 0".into()))]
    #[case("/collection", Command::Collection(None))]
    #[case("/collection  hr policies ", Command::Collection(Some("hr policies".into())))]
    #[case("/collections", Command::Collections)]
    #[case("/recent", Command::Recent)]
    #[case("/open ?sessionId=x", Command::Open("?sessionId=x".into()))]
    #[case("/open", Command::Unknown("/open".into()))]
    #[case("/delete s1", Command::Delete("s1".into()))]
    #[case("/where", Command::Where)]
    #[case("/help", Command::Help)]
    #[case("/q", Command::Quit)]
    #[case("/bogus", Command::Unknown("/bogus".into()))]
    fn test_parse_command(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse_command(line), expected);
    }
}
