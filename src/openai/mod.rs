mod core;
pub use self::core::{
    Message, Role, StreamError, completion_stream, open_completion_stream, relay_completion,
};
