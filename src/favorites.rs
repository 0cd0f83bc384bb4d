//! Favorite channels, titles and series

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::Listing;
use crate::models::StreamDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    /// Played directly
    Stream,
    /// Opens the episode list
    Series,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub kind: FavoriteKind,
    pub stream: StreamDescriptor,
}

impl Favorite {
    pub fn stream(stream: StreamDescriptor) -> Self {
        Self { kind: FavoriteKind::Stream, stream }
    }

    pub fn from_listing(listing: &Listing) -> Self {
        let kind = if listing.is_playable() { FavoriteKind::Stream } else { FavoriteKind::Series };
        Self { kind, stream: listing.to_descriptor() }
    }

    fn same_item(&self, other: &Favorite) -> bool {
        self.kind == other.kind
            && self.stream.content_type == other.stream.content_type
            && self.stream.id == other.stream.id
    }
}

/// Favorites in the order they were added. Stored as JSON in the app config.
#[derive(Debug, Default)]
pub struct Favorites {
    items: Vec<Favorite>,
}

impl Favorites {
    pub fn from_json(json: &str) -> Self {
        if json.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(json) {
            Ok(items) => Self { items },
            Err(e) => {
                warn!("Ignoring unreadable favorites: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_default()
    }

    pub fn items(&self) -> &[Favorite] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &Favorite) -> bool {
        self.items.iter().any(|f| f.same_item(item))
    }

    /// Returns false if it was already a favorite
    pub fn add(&mut self, item: Favorite) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: &Favorite) -> bool {
        let before = self.items.len();
        self.items.retain(|f| !f.same_item(item));
        self.items.len() != before
    }

    /// Add or remove `item`; returns whether it is a favorite afterwards
    pub fn toggle(&mut self, item: Favorite) -> bool {
        if self.remove(&item) {
            false
        } else {
            self.add(item)
        }
    }

    /// Playable favorites, used as the zapping list when playing from favorites
    pub fn streams(&self) -> Vec<StreamDescriptor> {
        self.items
            .iter()
            .filter(|f| f.kind == FavoriteKind::Stream)
            .map(|f| f.stream.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn channel(id: i64, name: &str) -> Favorite {
        Favorite::stream(StreamDescriptor::new(id, name, ContentType::Live))
    }

    #[test]
    fn test_toggle_add_and_remove() {
        let mut favorites = Favorites::default();
        assert!(favorites.toggle(channel(1, "News")));
        assert!(favorites.add(channel(2, "Sports")));
        assert!(!favorites.add(channel(1, "News (renamed)")));
        assert_eq!(favorites.items().len(), 2);

        assert!(!favorites.toggle(channel(1, "News")));
        assert_eq!(favorites.items().len(), 1);
        assert_eq!(favorites.items()[0].stream.name, "Sports");
        assert!(!favorites.remove(&channel(1, "News")));
    }

    #[test]
    fn test_identity_includes_kind_and_content_type() {
        let mut favorites = Favorites::default();
        favorites.add(channel(7, "Channel 7"));

        let movie = Favorite::stream(StreamDescriptor::new(7, "Movie 7", ContentType::Movie));
        let series = Favorite {
            kind: FavoriteKind::Series,
            stream: StreamDescriptor::new(7, "Series 7", ContentType::Series),
        };
        assert!(!favorites.contains(&movie));
        assert!(favorites.add(movie));
        assert!(favorites.add(series));
        assert_eq!(favorites.streams().len(), 2);
    }

    #[test]
    fn test_json_round_trip_and_bad_input() {
        let mut favorites = Favorites::default();
        favorites.add(channel(1, "News"));
        favorites.add(Favorite {
            kind: FavoriteKind::Series,
            stream: StreamDescriptor::new(9, "Drama", ContentType::Series),
        });

        let restored = Favorites::from_json(&favorites.to_json());
        assert_eq!(restored.items(), favorites.items());
        assert!(Favorites::from_json("").is_empty());
        assert!(Favorites::from_json("{not json").is_empty());
    }
}
