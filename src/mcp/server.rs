/// Tool server that handles JSON-RPC communication
///
/// This module implements the server loop that:
/// 1. Reads newline-delimited JSON-RPC requests
/// 2. Routes tool calls to the habit tracker tools
/// 3. Writes JSON-RPC responses back, one per line
///
/// Requests are handled one at a time, so the single storage connection is
/// never written from two places at once.

use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools::{self, ToolError};
use crate::{HabitTrackerServer, ServerError};

/// JSON-RPC front end for a [`HabitTrackerServer`]
pub struct McpServer {
    habit_tracker: HabitTrackerServer,
    initialized: bool,
}

impl McpServer {
    pub fn new(habit_tracker: HabitTrackerServer) -> Self {
        Self {
            habit_tracker,
            initialized: false,
        }
    }

    /// Serve requests from stdin, writing responses to stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve requests from any line-oriented reader until it is exhausted
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Server ready, waiting for JSON-RPC requests...");

        let mut line = String::new();
        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("Input closed, shutting down");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.handle_line(&line) {
                        let response_str = serde_json::to_string(&response)?;

                        writer.write_all(response_str.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                        writer.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read request: {}", e);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Handle one line of input; notifications and blank lines produce no response
    pub fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version '{}'", request.jsonrpc),
                None,
            ));
        }

        Some(self.handle_request(id, request))
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                debug!("Client finished initialization");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    fn handle_request(&mut self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "initialized" => {
                self.initialized = true;
                JsonRpcResponse::success(id, Value::Null)
            }
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        match params.client_info {
            Some(client) => info!(
                "Client connected: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            ),
            None => info!("Client connected"),
        }
        if let Some(version) = params.protocol_version.filter(|v| v != MCP_VERSION) {
            debug!("Client asked for protocol {}, offering {}", version, MCP_VERSION);
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Habit Tracker".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        match tool_definitions() {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => internal_error(id, e),
        }
    }

    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing parameters for tools/call".to_string(),
                None,
            );
        };

        let call: ToolCallParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                )
            }
        };

        if !self.initialized {
            debug!("Tool call '{}' before the client sent 'initialized'", call.name);
        }

        match self.call_tool(&call.name, Value::Object(call.arguments)) {
            Ok(result) => to_response(id, &result),
            Err(e) => JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                format!("Invalid arguments for '{}': {}", call.name, e),
                None,
            ),
        }
    }

    /// Route a tool call; `Err` means the arguments didn't match the tool's parameters
    fn call_tool(&self, name: &str, args: Value) -> Result<ToolCallResult, serde_json::Error> {
        let tracker = &self.habit_tracker;
        let storage = tracker.storage();
        let clock = tracker.clock();
        let user = tracker.user();

        debug!("Calling tool '{}' for {}", name, user);

        let result = match name {
            "habit_create" => respond(tools::create_habit(storage, clock, user, from_args(args)?)),
            "habit_get" => respond(tools::get_habit(storage, user, from_args(args)?)),
            "habit_list" => respond(tools::list_habits(storage, clock, user, from_args(args)?)),
            "habit_update" => respond(tools::update_habit(storage, clock, user, from_args(args)?)),
            "habit_delete" => respond(tools::delete_habit(storage, user, from_args(args)?)),
            "habit_complete" => respond(tools::complete_habit(storage, clock, user, from_args(args)?)),
            "habit_stats" => respond(tools::habit_stats(storage, clock, user, from_args(args)?)),
            "habit_seed_starters" => {
                respond(tools::seed_starter_habits(storage, clock, user, from_args(args)?))
            }
            "action_list" => respond(tools::list_actions(storage, user, from_args(args)?)),
            "action_create" => respond(tools::create_action(storage, clock, user, from_args(args)?)),
            "action_update" => respond(tools::update_action(storage, clock, user, from_args(args)?)),
            "action_delete" => respond(tools::delete_action(storage, user, from_args(args)?)),
            "action_favorite" => respond(tools::toggle_favorite(storage, user, from_args(args)?)),
            "action_use" => respond(tools::record_action_usage(storage, clock, user, from_args(args)?)),
            "command_palette" => respond(tools::command_palette(storage, user, from_args(args)?)),
            _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        Ok(result)
    }
}

fn from_args<P: DeserializeOwned>(args: Value) -> Result<P, serde_json::Error> {
    serde_json::from_value(args)
}

/// Turn a tool outcome into a tool result with pretty-printed JSON text
fn respond<T: Serialize>(outcome: Result<T, ToolError>) -> ToolCallResult {
    match outcome {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => ToolCallResult::success(text),
            Err(e) => {
                error!("Failed to serialize tool output: {}", e);
                ToolCallResult::error(format!("Failed to serialize result: {}", e))
            }
        },
        Err(e) => {
            debug!("Tool failed: {}", e);
            ToolCallResult::error(e.to_string())
        }
    }
}

fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => internal_error(id, e),
    }
}

fn internal_error(id: Value, e: serde_json::Error) -> JsonRpcResponse {
    error!("Failed to build response: {}", e);
    JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None)
}

fn definition<P: JsonSchema>(name: &str, description: &str) -> Result<ToolDefinition, serde_json::Error> {
    let schema = SchemaGenerator::default().into_root_schema_for::<P>();
    Ok(ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema)?,
    })
}

/// Every tool the server offers, with schemas generated from the parameter types
pub fn tool_definitions() -> Result<Vec<ToolDefinition>, serde_json::Error> {
    Ok(vec![
        definition::<tools::CreateHabitParams>(
            "habit_create",
            "Create a new habit. Frequency is daily, weekly, monthly or custom; weekly habits can target weekdays (0 = Monday).",
        )?,
        definition::<tools::GetHabitParams>("habit_get", "Get a habit with its streak and next due date")?,
        definition::<tools::ListHabitsParams>(
            "habit_list",
            "List your habits, optionally filtered by category and sorted",
        )?,
        definition::<tools::UpdateHabitParams>(
            "habit_update",
            "Change a habit. Changing frequency or target days reschedules it; streaks are kept.",
        )?,
        definition::<tools::DeleteHabitParams>(
            "habit_delete",
            "Permanently delete a habit and its completion history",
        )?,
        definition::<tools::CompleteHabitParams>(
            "habit_complete",
            "Record a completion of a habit, now or at a past time, and update its streak",
        )?,
        definition::<tools::HabitStatsParams>(
            "habit_stats",
            "Completion rate, streaks and completions per weekday for a habit",
        )?,
        definition::<tools::SeedStartersParams>(
            "habit_seed_starters",
            "Create five recommended daily starter habits",
        )?,
        definition::<tools::ListActionsParams>(
            "action_list",
            "List command palette actions: the built-in ones plus your own",
        )?,
        definition::<tools::CreateActionParams>("action_create", "Create a command palette action")?,
        definition::<tools::UpdateActionParams>(
            "action_update",
            "Change one of your command palette actions; built-in actions stay as they are",
        )?,
        definition::<tools::ActionIdParams>(
            "action_delete",
            "Delete one of your command palette actions",
        )?,
        definition::<tools::ActionIdParams>(
            "action_favorite",
            "Toggle an action in or out of your favorites",
        )?,
        definition::<tools::ActionIdParams>(
            "action_use",
            "Record that an action was used, moving it to the top of your recents",
        )?,
        definition::<tools::CommandPaletteParams>(
            "command_palette",
            "Quick actions, habits by category, recent and favorite actions in one view",
        )?,
    ])
}
