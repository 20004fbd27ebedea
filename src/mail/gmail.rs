use std::sync::Arc;

use log::{debug, info};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::auth::handle::TokenHandle;
use crate::domain::email::{BodyRef, Header, MessageList, MessageRef, MessageSummary};
use crate::error::{Error, Result};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Headers requested with every metadata fetch.
pub const METADATA_HEADERS: [&str; 4] = ["From", "Subject", "Date", "To"];

/// The two provider calls the rest of the crate relies on.
pub trait MailApi: Sync {
    /// Lists inbox messages, optionally narrowed by a provider search query.
    fn list_messages(
        &self,
        max_results: u32,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<MessageList>;

    /// Metadata view of one message (headers from [`METADATA_HEADERS`]).
    fn get_message_details(&self, id: &str) -> Result<MessageSummary>;
}

pub struct GmailClient {
    handle: Arc<dyn TokenHandle>,
    client: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new(handle: Arc<dyn TokenHandle>) -> Self {
        Self::with_base_url(handle, GMAIL_API_BASE)
    }

    pub fn with_base_url(handle: Arc<dyn TokenHandle>, base_url: &str) -> Self {
        Self {
            handle,
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn bearer(&self) -> Result<String> {
        if !self.handle.is_loaded() {
            return Err(Error::NotAuthenticated);
        }
        self.handle.token().ok_or(Error::NotAuthenticated)
    }

    fn messages_url(&self) -> String {
        format!("{}/users/me/messages", self.base_url)
    }
}

fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let detail = serde_json::from_str::<WireErrorEnvelope>(&body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    Err(Error::Provider(format!("{what} failed ({status}): {detail}")))
}

impl MailApi for GmailClient {
    fn list_messages(
        &self,
        max_results: u32,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<MessageList> {
        let token = self.bearer()?;

        let mut params: Vec<(&str, String)> = vec![
            ("labelIds", "INBOX".to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(pt) = page_token {
            params.push(("pageToken", pt.to_string()));
        }
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }

        debug!("listing messages (max {max_results}, query {query:?})");
        let resp = self
            .client
            .get(self.messages_url())
            .bearer_auth(&token)
            .query(&params)
            .send()
            .map_err(|e| Error::Provider(format!("could not load messages: {e}")))?;
        let resp = check_status(resp, "list messages")?;

        let wire: WireMessageList = resp
            .json()
            .map_err(|e| Error::Provider(format!("malformed message list: {e}")))?;
        let list = wire.validate()?;
        info!("listed {} messages", list.messages.len());
        Ok(list)
    }

    fn get_message_details(&self, id: &str) -> Result<MessageSummary> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(Error::Provider(format!("invalid message id: {id:?}")));
        }
        let token = self.bearer()?;

        let mut params: Vec<(&str, &str)> = vec![("format", "metadata")];
        params.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", *h)));

        debug!("fetching details for {id}");
        let resp = self
            .client
            .get(format!("{}/{}", self.messages_url(), id))
            .bearer_auth(&token)
            .query(&params)
            .send()
            .map_err(|e| Error::Provider(format!("could not load message {id}: {e}")))?;
        let resp = check_status(resp, "get message")?;

        let wire: WireMessage = resp
            .json()
            .map_err(|e| Error::Provider(format!("malformed message {id}: {e}")))?;
        wire.validate()
    }
}

// Wire format. Everything is optional here; `validate` decides what is
// required.

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessageList {
    #[serde(default)]
    messages: Vec<WireMessageRef>,
    next_page_token: Option<String>,
    #[serde(default)]
    result_size_estimate: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessageRef {
    id: Option<String>,
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    id: Option<String>,
    thread_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    snippet: String,
    internal_date: Option<String>,
    payload: Option<WirePayload>,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    headers: Option<Vec<WireHeader>>,
    body: Option<WireBody>,
}

#[derive(Debug, Deserialize)]
struct WireHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBody {
    #[serde(default)]
    size: u64,
    attachment_id: Option<String>,
}

fn required(field: Option<String>, what: &str) -> Result<String> {
    field
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Provider(format!("malformed response: missing {what}")))
}

impl WireMessageList {
    fn validate(self) -> Result<MessageList> {
        let messages = self
            .messages
            .into_iter()
            .map(|m| {
                Ok(MessageRef {
                    id: required(m.id, "message id")?,
                    thread_id: m.thread_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MessageList {
            messages,
            next_page_token: self.next_page_token,
            total_estimate: self.result_size_estimate,
        })
    }
}

impl WireMessage {
    fn validate(self) -> Result<MessageSummary> {
        let id = required(self.id, "message id")?;
        let thread_id = required(self.thread_id, "thread id")?;

        let internal_date = match self.internal_date {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                Error::Provider(format!("malformed response: internalDate {raw:?} for {id}"))
            })?,
            None => 0,
        };

        let (headers, body) = match self.payload {
            Some(p) => (
                p.headers.map(|hs| {
                    hs.into_iter()
                        .map(|h| Header {
                            name: h.name,
                            value: h.value,
                        })
                        .collect()
                }),
                p.body.map(|b| BodyRef {
                    size: b.size,
                    attachment_id: b.attachment_id,
                }),
            ),
            None => (None, None),
        };

        Ok(MessageSummary {
            id,
            thread_id,
            label_ids: self.label_ids,
            snippet: self.snippet,
            internal_date,
            headers,
            body,
        })
    }
}
