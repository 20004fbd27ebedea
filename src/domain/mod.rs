pub mod email;
pub mod sender;

pub use email::{BodyRef, Header, MessageId, MessageList, MessageRef, MessageSummary};
pub use sender::Sender;
