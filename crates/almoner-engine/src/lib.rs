// crates/almoner-engine/src/lib.rs
//
// almoner-engine: The host-facing Almoner engine.
//
// `Almoner` wires the stake ledger, the proposal registry, and the treasury
// to a credential ledger and a swap router supplied by the host. Every
// entry point is atomic and appends to a typed event journal.

pub mod config;
pub mod engine;
pub mod events;
pub mod telemetry;

pub use config::AlmonerConfig;
pub use engine::{Almoner, Deployment, EngineState};
pub use events::{AlmonerEvent, Parameter, ResolutionKind};
pub use telemetry::init_tracing;
