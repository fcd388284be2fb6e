// Composition root for the package_updates bounded context.
//
// Responsibilities:
// - Read flags and handler options from the command line and environment.
// - Instantiate the sync databases, the failure log source and the handlers.
// - Wire them into the dispatch engine.
// - Spawn the background workers (polling loop, status endpoint).

pub mod config;
pub mod http;
pub mod state;
pub mod workers;
