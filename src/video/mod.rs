//! # Video Assembly Module
//!
//! Frame storage, codec selection and FFmpeg encoding.

pub mod assembler;
pub mod codec;
pub mod types;

pub use assembler::{EncodedVideo, VideoAssembler};
pub use codec::{plan_output, CodecProfile, Container, OutputPlan};
pub use types::{Frame, Sequence, TimedFrame};
