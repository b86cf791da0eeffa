// Library root
// -----------
// The binary (`main.rs`) only parses arguments and picks a sink; everything
// it runs lives here so it can be tested without a process.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the token, import and status endpoints.
// - `poller`: the status polling loop and its terminal `Outcome`.
// - `status`: status payload model and field extraction.
// - `ui`: human-readable report rendering to an explicit sink.
// - `commands`: one handler per subcommand, input validation first.
// - `config`, `bundle`, `ci`, `redact`, `error`: supporting pieces.
pub mod api;
pub mod bundle;
pub mod ci;
pub mod commands;
pub mod config;
pub mod error;
pub mod poller;
pub mod redact;
pub mod status;
pub mod ui;
