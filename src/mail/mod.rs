pub mod address;
pub mod aggregator;
pub mod gmail;

pub use aggregator::{LIST_MAX_RESULTS, SAMPLE_CAP, SenderAggregator};
pub use gmail::{GmailClient, MailApi};
