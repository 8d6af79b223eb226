mod abc;
mod cli;
mod config;
mod error;
mod events;
mod histogram;
mod key;
mod matcher;
mod notes;
mod report;
mod sampler;
mod scan;
mod template;

pub use abc::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use histogram::*;
pub use key::*;
pub use matcher::*;
pub use notes::*;
pub use report::*;
pub use sampler::*;
pub use scan::*;
pub use template::*;
