use std::collections::HashMap;
use std::thread;

use log::{debug, info, warn};

use crate::domain::email::MessageSummary;
use crate::domain::sender::Sender;
use crate::error::{Error, Result};
use crate::mail::address::{normalize_address, parse_from_header};
use crate::mail::gmail::MailApi;

/// Upper bound on messages inspected per aggregation run, whatever sample
/// size is asked for. Each inspected message costs one detail call.
pub const SAMPLE_CAP: usize = 20;

/// Largest page Gmail serves for `messages.list`.
pub const LIST_MAX_RESULTS: u32 = 500;

/// Detail fetches in flight at once for one sender view.
const FETCH_BATCH: usize = 16;

pub struct SenderAggregator<'a> {
    api: &'a dyn MailApi,
}

impl<'a> SenderAggregator<'a> {
    pub fn new(api: &'a dyn MailApi) -> Self {
        Self { api }
    }

    /// Samples the inbox and ranks senders by message count, most frequent
    /// first. Detail fetches run one after another; a failing message is
    /// skipped.
    pub fn get_senders(&self, sample_size: u32) -> Result<Vec<Sender>> {
        info!("loading senders (sample {sample_size})");
        let list = self.api.list_messages(sample_size, None, None)?;
        if list.messages.is_empty() {
            info!("inbox is empty");
            return Ok(vec![]);
        }

        let limit = list.messages.len().min(SAMPLE_CAP);
        let mut senders: Vec<Sender> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (i, msg) in list.messages.iter().take(limit).enumerate() {
            debug!("processing message {}/{}", i + 1, limit);

            let details = match self.api.get_message_details(&msg.id) {
                Ok(d) => d,
                Err(e) => {
                    warn!("skipping message {}: {e}", msg.id);
                    continue;
                }
            };

            let Some(from) = details.from() else {
                debug!("message {} has no From header", msg.id);
                continue;
            };

            let parsed = parse_from_header(from);
            let key = normalize_address(&parsed.address);
            if key.is_empty() {
                debug!("message {} has a blank sender", msg.id);
                continue;
            }
            debug!("sender found: {} <{}>", parsed.name, key);

            match index.get(&key) {
                Some(&pos) => senders[pos].count += 1,
                None => {
                    index.insert(key.clone(), senders.len());
                    senders.push(Sender {
                        address: key,
                        name: parsed.name,
                        count: 1,
                    });
                }
            }
        }

        // Stable: equal counts keep first-encounter order.
        senders.sort_by(|a, b| b.count.cmp(&a.count));

        info!("{} senders found", senders.len());
        Ok(senders)
    }

    /// All listed messages from one address, details fetched concurrently
    /// a small batch at a time. Any failed fetch fails the whole call.
    /// `max_results` is clamped to [`LIST_MAX_RESULTS`].
    pub fn get_emails_by_sender(
        &self,
        address: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>> {
        let query = format!("from:{address}");
        let max = max_results.min(LIST_MAX_RESULTS);
        let list = self.api.list_messages(max, None, Some(&query))?;
        info!("{} messages from {address}", list.messages.len());

        let api = self.api;
        let mut out = Vec::with_capacity(list.messages.len());
        for batch in list.messages.chunks(FETCH_BATCH) {
            let fetched: Result<Vec<_>> = thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|m| s.spawn(move || api.get_message_details(&m.id)))
                    .collect();

                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            Err(Error::Provider("detail fetch panicked".into()))
                        })
                    })
                    .collect()
            });
            out.extend(fetched?);
        }
        Ok(out)
    }
}
