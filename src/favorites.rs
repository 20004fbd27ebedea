use log::{debug, warn};

use crate::domain::sender::Sender;
use crate::mail::address::normalize_address;
use crate::store::KeyValueStore;

pub const FAVORITES_KEY: &str = "mailhub-favorites";

/// Favorite sender addresses, kept in the order they were starred.
///
/// Persisted as a JSON array under [`FAVORITES_KEY`]. The set is independent
/// of the sampled senders: a favorite stays even when its sender drops out
/// of the sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    addresses: Vec<String>,
}

impl FavoriteSet {
    /// Missing or unreadable data yields an empty set.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!("could not read favorites: {e}");
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(list) => {
                let mut set = Self::default();
                for a in list {
                    set.insert(&a);
                }
                debug!("{} favorites loaded", set.len());
                set
            }
            Err(e) => {
                warn!("ignoring corrupt favorites: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        let json = match serde_json::to_string(&self.addresses) {
            Ok(j) => j,
            Err(e) => {
                warn!("could not encode favorites: {e}");
                return;
            }
        };
        if let Err(e) = store.set(FAVORITES_KEY, &json) {
            warn!("could not save favorites: {e}");
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        let key = normalize_address(address);
        self.addresses.iter().any(|a| *a == key)
    }

    fn insert(&mut self, address: &str) {
        let key = normalize_address(address);
        if !key.is_empty() && !self.addresses.contains(&key) {
            self.addresses.push(key);
        }
    }

    /// Flips membership and returns whether `address` is now a favorite.
    pub fn toggle(&mut self, address: &str) -> bool {
        let key = normalize_address(address);
        if let Some(pos) = self.addresses.iter().position(|a| *a == key) {
            self.addresses.remove(pos);
            false
        } else {
            self.insert(&key);
            self.addresses.contains(&key)
        }
    }

    /// Removes the stored set. Failures are logged only.
    pub fn clear(store: &dyn KeyValueStore) {
        if let Err(e) = store.remove(FAVORITES_KEY) {
            warn!("could not clear favorites: {e}");
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// The favorites among `senders`, in the senders' order.
    pub fn filter_senders(&self, senders: &[Sender]) -> Vec<Sender> {
        senders
            .iter()
            .filter(|s| self.contains(&s.address))
            .cloned()
            .collect()
    }
}
