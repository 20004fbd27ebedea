use serde::Serialize;

/// A sender observed in the sampled window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sender {
    /// Normalized address, unique among senders.
    pub address: String,
    pub name: String,
    pub count: u32,
}
