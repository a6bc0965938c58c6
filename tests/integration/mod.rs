/// Integration tests driving the server end to end
mod persistence;
mod server_workflow;
