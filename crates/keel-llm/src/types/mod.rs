//! Internal canonical types for chat requests and responses
//!
//! The wire format converts into these on the way in and back out of them
//! on the way out; backends and strategies only ever see these.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;

pub use message::{Message, Role};
pub use request::{CompletionRequest, DEFAULT_TEMPERATURE, TEMPERATURE_RANGE};
pub use response::{Choice, ChoiceMessage, CompletionResponse, FinishReason, Usage};
pub use stream::{StreamDelta, StreamEvent};
