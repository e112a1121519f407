//! Generation event stream decoding

pub mod event;
pub mod parser;

pub use event::{
    CompleteEvent, ErrorEvent, FileCommand, FileEvent, Stage, StageEvent, StageStatus,
    StreamEvent,
};
pub use parser::{parse_all, SseParser};
