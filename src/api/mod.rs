pub mod routes;
mod server;
pub use server::{app, initialize, serve};
pub mod public;
mod state;
pub use state::{AppState, RelayState};
