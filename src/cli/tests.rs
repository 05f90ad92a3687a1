use super::*;
use crate::api::{FileItem, ModelInfo};
use crate::cli::agents::format_agent;
use crate::cli::chat::{read_attachment, ReplyPrinter};
use crate::cli::exec::LogPrinter;
use crate::cli::history::format_summary;
use crate::cli::server::format_item;
use crate::core::agents::AgentRoster;
use crate::core::exec_log::ExecLog;
use crate::core::stream::{ChatEvent, ExecEvent, StreamStore};
use crate::core::transcript::{Message, Transcript};
use tempfile::TempDir;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }

    pub(super) fn render_chat(printer: &mut ReplyPrinter, transcript: &Transcript) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        printer
            .render(transcript, &mut out, &mut err)
            .expect("writing to memory");
        (
            String::from_utf8(out).expect("utf8"),
            String::from_utf8(err).expect("utf8"),
        )
    }
}

use test_helpers::{parse_args, render_chat};

#[test]
fn chat_joins_prompt_and_collects_attachments() {
    let argv = [
        "flames", "chat", "hello", "there", "--attach", "a.txt", "-a", "b.png", "--log", "out.log",
    ];
    match parse_args(&argv).command {
        Commands::Chat {
            prompt,
            attachments,
            log,
        } => {
            assert_eq!(prompt, ["hello", "there"]);
            assert_eq!(
                attachments,
                [PathBuf::from("a.txt"), PathBuf::from("b.png")]
            );
            assert_eq!(log, Some(PathBuf::from("out.log")));
        }
        _ => panic!("expected chat subcommand for argv={argv:?}"),
    }
}

#[test]
fn exec_keeps_hyphenated_arguments() {
    let argv = ["flames", "exec", "ls", "-la", "/tmp"];
    match parse_args(&argv).command {
        Commands::Exec { command } => assert_eq!(command, ["ls", "-la", "/tmp"]),
        _ => panic!("expected exec subcommand"),
    }
    assert!(Args::try_parse_from(["flames", "exec"]).is_err());
}

#[test]
fn global_flags_parse_after_subcommand() {
    let argv = [
        "flames",
        "models",
        "--backend",
        "http://dev:9000",
        "-p",
        "openai",
        "-m",
        "gpt-4o",
        "--verbose",
        "--config",
        "/tmp/flames.toml",
    ];
    let args = parse_args(&argv);
    assert!(matches!(args.command, Commands::Models));
    assert_eq!(args.backend.as_deref(), Some("http://dev:9000"));
    assert_eq!(args.provider.as_deref(), Some("openai"));
    assert_eq!(args.model.as_deref(), Some("gpt-4o"));
    assert!(args.verbose);
    assert_eq!(args.config, Some(PathBuf::from("/tmp/flames.toml")));
}

#[test]
fn files_defaults_to_root() {
    match parse_args(&["flames", "files"]).command {
        Commands::Files { path } => assert_eq!(path, "/"),
        _ => panic!("expected files subcommand"),
    }
}

#[test]
fn agent_and_config_subcommands() {
    match parse_args(&["flames", "agents", "add", "Critic", "--temperature", "1.5"]).command {
        Commands::Agents {
            command:
                AgentCommands::Add {
                    name, temperature, ..
                },
        } => {
            assert_eq!(name, "Critic");
            assert_eq!(temperature, Some(1.5));
        }
        _ => panic!("expected agents add"),
    }

    match parse_args(&["flames", "config", "set", "server.name", "my", "box"]).command {
        Commands::Config {
            command: ConfigCommands::Set { key, value },
        } => {
            assert_eq!(key, "server.name");
            assert_eq!(value.join(" "), "my box");
        }
        _ => panic!("expected config set"),
    }
}

#[test]
fn reply_printer_emits_only_new_text() {
    let mut transcript = Transcript::default();
    transcript.push_user(Message::user("hi", Vec::new()));
    let mut printer = ReplyPrinter::new(1);

    transcript.apply(ChatEvent::Chunk {
        text: "Hel".to_string(),
    });
    assert_eq!(render_chat(&mut printer, &transcript).0, "Hel");

    transcript.apply(ChatEvent::Chunk {
        text: "lo ✨".to_string(),
    });
    assert_eq!(render_chat(&mut printer, &transcript).0, "lo ✨");
    assert_eq!(render_chat(&mut printer, &transcript).0, "");

    transcript.apply(ChatEvent::Error {
        message: "quota exceeded".to_string(),
    });
    let (out, err) = render_chat(&mut printer, &transcript);
    assert_eq!(out, "");
    assert_eq!(err, "\n❌ Error: quota exceeded\n");
}

#[test]
fn log_printer_renders_each_entry_once() {
    let mut log = ExecLog::default();
    log.begin_run();
    log.apply(ExecEvent::Start {
        command: "ls".to_string(),
    });
    log.apply(ExecEvent::Output {
        data: "a.txt".to_string(),
    });

    let mut printer = LogPrinter::default();
    let mut out = Vec::new();
    let mut err = Vec::new();
    printer.render(&log, &mut out, &mut err).expect("render");

    log.apply(ExecEvent::Error {
        message: "boom".to_string(),
    });
    printer.render(&log, &mut out, &mut err).expect("render");

    assert_eq!(String::from_utf8(out).expect("utf8"), "> ls\na.txt\n");
    assert_eq!(String::from_utf8(err).expect("utf8"), "error: boom\n");
}

#[test]
fn attachment_records_name_and_size() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("notes.md");
    std::fs::write(&path, "hello").expect("write");

    let attachment = read_attachment(&path).expect("metadata");
    assert_eq!(attachment.name, "notes.md");
    assert_eq!(attachment.size, 5);
    assert!(read_attachment(&dir.path().join("missing")).is_err());
}

#[test]
fn listing_formats() {
    let dir = FileItem {
        name: "src".to_string(),
        kind: "dir".to_string(),
        size: None,
    };
    let file = FileItem {
        name: "main.rs".to_string(),
        kind: "file".to_string(),
        size: Some(42),
    };
    assert_eq!(format_item(&dir), "📁 src/");
    assert_eq!(format_item(&file), "📄 main.rs (42 bytes)");

    let summary: crate::api::ConversationSummary = serde_json::from_value(serde_json::json!({
        "id": 3,
        "title": null,
        "mode": "chat",
        "provider": "openrouter",
        "updated_at": "2024-05-01T10:00:00Z",
    }))
    .expect("summary parses");
    let line = format_summary(&summary);
    assert!(line.contains("#3  Untitled"));
    assert!(line.ends_with("[chat · OpenRouter]"));

    let undated: crate::api::ConversationSummary = serde_json::from_value(serde_json::json!({
        "id": "c2",
        "title": "Plans",
        "mode": "chat",
        "provider": "openai",
    }))
    .expect("summary without timestamp parses");
    assert_eq!(format_summary(&undated), "#c2  Plans  [chat · OpenAI]");

    let roster = AgentRoster::default();
    assert_eq!(
        format_agent(&roster.agents[0]),
        "agent  Agent  openrouter/openrouter/openai/gpt-4o  t=0.7"
    );
}

#[test]
fn model_info_names_are_optional() {
    let info: ModelInfo = serde_json::from_str(r#"{"id":"gpt-4o"}"#).expect("parses");
    assert_eq!(info.name, None);
}
