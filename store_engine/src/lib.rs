pub mod command;
pub mod dispatcher;
pub mod errors;
pub mod framing;

pub use command::{Command, SaveCommand};
pub use dispatcher::{Cycle, Envelope, Outcome, run_once};
pub use framing::{FrameCodec, FrameReader, FrameWriter, MAX_FRAME_LEN};
