//! Wire protocol between the judge and sandbox workers: one length-prefixed
//! JSON request and one response per connection.

pub mod frame;
pub mod messages;

pub use frame::{read_frame, read_raw_frame, write_frame, ProtocolError, MAX_FRAME_LEN};
pub use messages::{TestingRequest, TestingResponse};
