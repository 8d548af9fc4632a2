//! Wire protocol: framing, request parsing and response records.

pub mod codec;
pub mod command;
pub mod response;

pub use codec::{FramingError, MAX_PAYLOAD};
pub use command::{Command, ParseError};
pub use response::{Response, Status};
