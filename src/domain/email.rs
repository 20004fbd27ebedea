use serde::Serialize;

pub type MessageId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Where a message body can be fetched from. Metadata fetches only carry the
/// size; the data itself is never requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyRef {
    pub size: u64,
    pub attachment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub snippet: String,
    /// Epoch milliseconds.
    pub internal_date: i64,
    pub headers: Option<Vec<Header>>,
    pub body: Option<BodyRef>,
}

impl MessageSummary {
    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_deref()?
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn from(&self) -> Option<&str> {
        self.header("From")
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn date(&self) -> Option<&str> {
        self.header("Date")
    }
}

/// An entry of a listing: identifiers only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: MessageId,
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageList {
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    pub total_estimate: u64,
}
