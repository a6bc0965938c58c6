/// Unit tests for the engine and the command palette through the public API
mod engine_tests;
mod palette_tests;
