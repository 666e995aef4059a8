// Tests for session log extraction

use std::fs;
use std::path::{Path, PathBuf};

use claude_indicator::monitor::parser::{
    decode_project_dir, extract, read_tail, scan_lines, ExtractOptions,
};
use claude_indicator::monitor::{QuestionKind, SessionState};
use serde_json::json;
use tempfile::TempDir;

fn assistant(items: serde_json::Value) -> String {
    json!({
        "type": "assistant",
        "message": { "role": "assistant", "content": items },
        "sessionId": "sess-1234567890",
        "cwd": "/work/app",
        "timestamp": "2025-01-01T00:00:00Z"
    })
    .to_string()
}

fn user_prompt(text: &str) -> String {
    json!({
        "type": "user",
        "message": { "role": "user", "content": text },
        "sessionId": "sess-1234567890",
        "cwd": "/work/app"
    })
    .to_string()
}

fn tool_result(tool_use_id: &str) -> String {
    json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{ "type": "tool_result", "tool_use_id": tool_use_id, "content": "ok" }]
        }
    })
    .to_string()
}

fn ask_question() -> String {
    assistant(json!([
        { "type": "text", "text": "Which one?" },
        { "type": "tool_use", "id": "toolu_q", "name": "AskUserQuestion", "input": {} }
    ]))
}

fn run_tool(name: &str) -> String {
    assistant(json!([{ "type": "tool_use", "id": "toolu_1", "name": name, "input": {} }]))
}

fn reply(text: &str) -> String {
    assistant(json!([{ "type": "text", "text": text }]))
}

fn options() -> ExtractOptions {
    ExtractOptions {
        home_dir: Some(PathBuf::from("/home/alice")),
        ..ExtractOptions::default()
    }
}

fn write_log(dir: &Path, lines: &[String]) -> PathBuf {
    let project = dir.join("-home-alice-code-app");
    fs::create_dir_all(&project).unwrap();
    let path = project.join("session.jsonl");
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content).unwrap();
    path
}

fn scan(lines: &[String]) -> SessionState {
    scan_lines(lines.iter().map(String::as_str), "AskUserQuestion").state
}

#[test]
fn test_empty_file_needs_no_attention() {
    let temp = TempDir::new().unwrap();
    let path = write_log(temp.path(), &[]);

    let info = extract(&path, &options()).unwrap();

    assert!(!info.needs_attention);
    assert_eq!(info.question_kind, None);
    assert_eq!(info.session_id, "");
    assert_eq!(info.project_path, "~/code/app");
}

#[test]
fn test_only_ignored_kinds_needs_no_attention() {
    let lines = vec![
        json!({ "type": "summary", "summary": "Refactor", "leafUuid": "x" }).to_string(),
        json!({ "type": "system", "cwd": "/srv/other", "sessionId": "meta-1" }).to_string(),
    ];
    let temp = TempDir::new().unwrap();
    let path = write_log(temp.path(), &lines);

    let info = extract(&path, &options()).unwrap();

    assert!(!info.needs_attention);
    assert_eq!(info.question_kind, None);
    // Metadata is still picked up from ignored kinds
    assert_eq!(info.project_path, "/srv/other");
    assert_eq!(info.session_id, "meta-1");
}

#[test]
fn test_malformed_lines_are_skipped() {
    let lines = vec![
        "not json at all".to_string(),
        "{\"type\": \"assistant\", \"message\": ".to_string(),
        "[1, 2, 3]".to_string(),
        run_tool("Bash"),
    ];

    let state = scan(&lines);

    assert!(state.tool_pending);
    assert_eq!(state.question_kind(), Some(QuestionKind::ToolPending));
}

#[test]
fn test_unanswered_question() {
    let temp = TempDir::new().unwrap();
    let path = write_log(temp.path(), &[user_prompt("help"), ask_question()]);

    let info = extract(&path, &options()).unwrap();

    assert!(info.needs_attention);
    assert_eq!(info.question_kind, Some(QuestionKind::AskUserQuestion));
}

#[test]
fn test_tool_result_answers_question() {
    let temp = TempDir::new().unwrap();
    let path = write_log(
        temp.path(),
        &[user_prompt("help"), ask_question(), tool_result("toolu_q")],
    );

    let info = extract(&path, &options()).unwrap();

    assert!(!info.needs_attention);
    assert_eq!(info.question_kind, None);
}

#[test]
fn test_fresh_prompt_awaits_reply() {
    let temp = TempDir::new().unwrap();
    let path = write_log(
        temp.path(),
        &[user_prompt("first"), reply("done"), user_prompt("next")],
    );

    let info = extract(&path, &options()).unwrap();

    assert!(info.needs_attention);
    assert_eq!(info.question_kind, Some(QuestionKind::UserPrompt));
}

#[test]
fn test_pending_tool_call() {
    let temp = TempDir::new().unwrap();
    let path = write_log(temp.path(), &[user_prompt("build it"), run_tool("Bash")]);

    let info = extract(&path, &options()).unwrap();

    assert!(info.needs_attention);
    assert_eq!(info.question_kind, Some(QuestionKind::ToolPending));
}

#[test]
fn test_tool_result_then_reply_is_idle() {
    let state = scan(&[
        user_prompt("build it"),
        run_tool("Bash"),
        tool_result("toolu_1"),
        reply("Built."),
    ]);

    assert_eq!(state, SessionState::default());
    assert!(!state.needs_attention());
}

#[test]
fn test_assistant_answers_prompt_and_resets_tool() {
    let state = scan(&[run_tool("Read"), user_prompt("stop"), reply("ok")]);

    assert!(!state.prompt_unanswered);
    assert!(!state.tool_pending);
}

#[test]
fn test_question_survives_later_assistant_turns() {
    // Only a user turn clears a pending question
    let state = scan(&[ask_question(), reply("still thinking")]);

    assert!(state.unanswered_question);
    assert!(!state.tool_pending);
    assert_eq!(state.question_kind(), Some(QuestionKind::AskUserQuestion));
}

#[test]
fn test_fresh_prompt_does_not_clear_question() {
    let state = scan(&[ask_question(), user_prompt("what do you mean?")]);

    assert!(state.unanswered_question);
    assert!(state.prompt_unanswered);
    assert_eq!(state.question_kind(), Some(QuestionKind::AskUserQuestion));
}

#[test]
fn test_custom_question_tool() {
    let lines = [run_tool("AskHuman")];
    let scan = scan_lines(lines.iter().map(String::as_str), "AskHuman");

    assert!(scan.state.unanswered_question);
    assert!(scan.state.tool_pending);
}

#[test]
fn test_metadata_first_value_wins() {
    let lines = vec![
        json!({ "type": "user", "cwd": "/first", "sessionId": "one", "message": { "content": "hi" } })
            .to_string(),
        json!({ "type": "assistant", "cwd": "/second", "sessionId": "two", "message": { "content": [] } })
            .to_string(),
    ];
    let scan = scan_lines(lines.iter().map(String::as_str), "AskUserQuestion");

    assert_eq!(scan.cwd.as_deref(), Some("/first"));
    assert_eq!(scan.session_id.as_deref(), Some("one"));
}

#[test]
fn test_extraction_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = write_log(temp.path(), &[user_prompt("go"), ask_question()]);

    let first = extract(&path, &options()).unwrap();
    let second = extract(&path, &options()).unwrap();

    assert_eq!(first.needs_attention, second.needs_attention);
    assert_eq!(first.question_kind, second.question_kind);
    assert_eq!(first.session_id, second.session_id);
    assert_eq!(first.project_path, second.project_path);
    assert_eq!(first.file_path, second.file_path);
}

#[test]
fn test_missing_file_is_absent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nope.jsonl");

    assert!(extract(&path, &options()).is_none());
}

#[test]
fn test_tail_window_starting_mid_record() {
    let temp = TempDir::new().unwrap();
    let question = ask_question();
    let lines = vec![user_prompt("padding ".repeat(50).as_str()), question.clone()];
    let path = write_log(temp.path(), &lines);

    // Cap falls in the middle of the question line
    let cap = (question.len() / 2) as u64 + 1;
    let window = read_tail(&path, cap).unwrap();
    assert!(window.starts_mid_record);
    assert_eq!(window.lines().count(), 0);

    // Cap falls in the middle of the first line; the question survives
    let total = fs::metadata(&path).unwrap().len();
    let cap = total - 10;
    let window = read_tail(&path, cap).unwrap();
    assert!(window.starts_mid_record);
    assert_eq!(window.lines().collect::<Vec<_>>(), vec![question.as_str()]);

    let tail_info = extract(
        &path,
        &ExtractOptions {
            tail_bytes: cap,
            ..options()
        },
    )
    .unwrap();
    let full_info = extract(&path, &options()).unwrap();
    assert_eq!(tail_info.needs_attention, full_info.needs_attention);
    assert_eq!(tail_info.question_kind, Some(QuestionKind::AskUserQuestion));
}

#[test]
fn test_tail_window_on_line_boundary_keeps_first_line() {
    let temp = TempDir::new().unwrap();
    let first = user_prompt("first");
    let second = run_tool("Bash");
    let path = write_log(temp.path(), &[first.clone(), second.clone()]);

    // Exactly the second line plus its newline
    let cap = second.len() as u64 + 1;
    let window = read_tail(&path, cap).unwrap();

    assert!(!window.starts_mid_record);
    assert_eq!(window.lines().collect::<Vec<_>>(), vec![second.as_str()]);
}

#[test]
fn test_tail_window_starting_on_previous_newline_keeps_record() {
    let temp = TempDir::new().unwrap();
    let first = user_prompt("first");
    let second = run_tool("Bash");
    let path = write_log(temp.path(), &[first.clone(), second.clone()]);

    // Window opens on the newline that ends the first record
    let cap = second.len() as u64 + 2;
    let window = read_tail(&path, cap).unwrap();

    assert!(window.starts_mid_record);
    assert_eq!(window.lines().collect::<Vec<_>>(), vec![second.as_str()]);

    let tail_info = extract(
        &path,
        &ExtractOptions {
            tail_bytes: cap,
            ..options()
        },
    )
    .unwrap();
    let full_info = extract(&path, &options()).unwrap();
    assert!(tail_info.needs_attention);
    assert_eq!(tail_info.needs_attention, full_info.needs_attention);
    assert_eq!(tail_info.question_kind, Some(QuestionKind::ToolPending));
}

#[test]
fn test_large_log_matches_full_read() {
    let temp = TempDir::new().unwrap();
    let mut lines = Vec::new();
    for i in 0..400 {
        lines.push(user_prompt(&format!("prompt number {}", i)));
        lines.push(run_tool("Read"));
        lines.push(tool_result("toolu_1"));
        lines.push(reply("done"));
    }
    lines.push(user_prompt("last one"));
    lines.push(run_tool("Edit"));
    let path = write_log(temp.path(), &lines);
    assert!(fs::metadata(&path).unwrap().len() > 50_000);

    let tail_info = extract(&path, &options()).unwrap();
    let full_info = extract(
        &path,
        &ExtractOptions {
            tail_bytes: u64::MAX,
            ..options()
        },
    )
    .unwrap();

    assert_eq!(tail_info.needs_attention, full_info.needs_attention);
    assert_eq!(tail_info.question_kind, Some(QuestionKind::ToolPending));
}

#[test]
fn test_decode_project_dir() {
    let home = Path::new("/Users/red");

    assert_eq!(decode_project_dir("-Users-red-code-app", Some(home)), "~/code/app");
    assert_eq!(decode_project_dir("-Users-red", Some(home)), "~");
    assert_eq!(decode_project_dir("-opt-work-site", Some(home)), "/opt/work/site");
    assert_eq!(decode_project_dir("-Users-redmond-x", Some(home)), "/Users/redmond/x");
    assert_eq!(decode_project_dir("-srv-api", None), "/srv/api");
}
