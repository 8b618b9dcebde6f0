pub mod errors;
pub mod state;
pub mod routes;
pub mod openapi;
pub mod startup;

pub use startup::{build_app, build_state, run, serve};
pub use state::AppState;
