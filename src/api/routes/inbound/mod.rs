pub mod public;
mod router;

pub use router::{handle_inbound, router};
