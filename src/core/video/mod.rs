pub mod error;
pub mod frame;
pub mod sampler;

pub use error::VideoError;
pub use frame::Frame;
pub use sampler::{FrameSampler, FrameSource, MockFrameSource, SampleGrid};
