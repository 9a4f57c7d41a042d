pub mod runner;
pub mod video;

pub use runner::{spawn_session, SessionCommand, SessionHandle};
pub use video::{AspectRatioConsumer, DomHost, VideoSession};
