#![doc = "Pulse counting and frequency sampling engine for pin-speed."]

pub mod counter;
pub mod edge_counter;
pub mod monitor;
pub mod output;
pub mod sampler;
pub mod stop;

pub use counter::*;
pub use edge_counter::*;
pub use monitor::*;
pub use output::*;
pub use sampler::*;
pub use stop::*;
