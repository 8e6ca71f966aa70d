//! Process execution and output parsing for the download tool.

mod cancel;
mod classifier;
mod error;
mod events;
mod media;
mod output;
mod process;
mod session;
mod stream;

pub use cancel::*;
pub use classifier::*;
pub use error::*;
pub use events::*;
pub use media::*;
pub use output::*;
pub use process::*;
pub use session::*;
pub use stream::*;
