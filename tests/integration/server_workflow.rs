/// End-to-end JSON-RPC sessions against a real database file
use chrono::{Duration, TimeZone, Utc};
use habit_tracker_server::mcp::protocol::JsonRpcResponse;
use habit_tracker_server::mcp::McpServer;
use habit_tracker_server::*;
use serde_json::{json, Value};
use tempfile::tempdir;

fn request(id: u64, method: &str, params: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string()
}

fn tool_call(id: u64, name: &str, arguments: Value) -> String {
    request(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

fn tool_output(response: &JsonRpcResponse) -> Value {
    let result = response.result.as_ref().expect("tool call returned a JSON-RPC error");
    assert_eq!(result["isError"], json!(false), "tool failed: {}", result);
    let text = result["content"][0]["text"].as_str().expect("text content");
    serde_json::from_str(text).expect("tool output is JSON")
}

#[tokio::test]
async fn test_stdio_session() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(temp_dir.path().join("habits.db")).expect("Failed to open storage");
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let tracker = HabitTrackerServer::with_clock(storage, Box::new(clock), UserId::new("alice"))
        .expect("Failed to create server");
    let mut server = McpServer::new(tracker);

    let input = [
        request(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }),
        ),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        request(2, "tools/list", json!({})),
        tool_call(3, "habit_create", json!({ "name": "Read", "category": "learning" })),
        String::new(),
        "garbage".to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    server
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("Server loop failed");

    let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // The notification and the blank line get no response
    assert_eq!(responses.len(), 4);

    let init = responses[0].result.as_ref().unwrap();
    assert_eq!(init["protocolVersion"], json!("2024-11-05"));
    assert!(init["capabilities"]["tools"].is_object());

    let tools = responses[1].result.as_ref().unwrap()["tools"].as_array().unwrap().clone();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in ["habit_create", "habit_complete", "habit_stats", "action_use", "command_palette"] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
    assert!(tools.iter().all(|t| t["inputSchema"].is_object()));

    let created = tool_output(&responses[2]);
    assert_eq!(created["habit"]["name"], json!("Read"));
    assert_eq!(created["habit"]["category"], json!("learning"));

    assert_eq!(responses[3].error.as_ref().unwrap().code, -32700);
}

#[tokio::test]
async fn test_habit_lifecycle_over_several_days() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(temp_dir.path().join("habits.db")).expect("Failed to open storage");
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();
    let clock = std::sync::Arc::new(FixedClock::new(start));
    let tracker = HabitTrackerServer::with_clock(storage, Box::new(SharedClock(clock.clone())), UserId::new("alice"))
        .expect("Failed to create server");
    let mut server = McpServer::new(tracker);

    let created = tool_output(
        &server
            .handle_line(&tool_call(1, "habit_create", json!({ "name": "Stretch", "frequency": "daily" })))
            .unwrap(),
    );
    let habit_id = created["habit"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["habit"]["streak"], json!(0));

    for day in 0..3 {
        let completed = tool_output(
            &server
                .handle_line(&tool_call(10 + day, "habit_complete", json!({ "habit_id": habit_id })))
                .unwrap(),
        );
        assert_eq!(completed["habit"]["streak"], json!(day + 1));
        clock.advance(Duration::days(1));
    }

    let stats = tool_output(
        &server
            .handle_line(&tool_call(20, "habit_stats", json!({ "habit_id": habit_id })))
            .unwrap(),
    );
    assert_eq!(stats["current_streak"], json!(3));
    assert_eq!(stats["longest_streak"], json!(3));
    assert_eq!(stats["total_completions"], json!(3));
    assert_eq!(stats["completions_by_day"]["0"], json!(1));

    // Skip a day: the streak restarts, the record stays
    clock.advance(Duration::days(1));
    let completed = tool_output(
        &server
            .handle_line(&tool_call(21, "habit_complete", json!({ "habit_id": habit_id })))
            .unwrap(),
    );
    assert_eq!(completed["habit"]["streak"], json!(1));
    assert_eq!(completed["habit"]["longest_streak"], json!(3));

    // Switch to a weekly schedule on Mondays; streak untouched
    let updated = tool_output(
        &server
            .handle_line(&tool_call(
                22,
                "habit_update",
                json!({ "habit_id": habit_id, "frequency": "weekly", "target_days": [0] }),
            ))
            .unwrap(),
    );
    assert_eq!(updated["habit"]["streak"], json!(1));
    assert_eq!(updated["habit"]["next_due_at"], json!("2024-03-11T00:00:00Z"));

    let deleted = tool_output(
        &server
            .handle_line(&tool_call(23, "habit_delete", json!({ "habit_id": habit_id })))
            .unwrap(),
    );
    assert_eq!(deleted["habit_id"], json!(habit_id));

    let listed = tool_output(&server.handle_line(&tool_call(24, "habit_list", json!({}))).unwrap());
    assert_eq!(listed["count"], json!(0));
}

/// Lets a test keep a handle on the clock it gave the server
struct SharedClock(std::sync::Arc<FixedClock>);

impl Clock for SharedClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        self.0.now()
    }
}
