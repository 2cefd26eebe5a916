//! Bookmark state of one signed-in user.
use std::collections::BTreeSet;

use crate::auth::Identity;
use crate::bookmarks::Bookmarks;
use crate::error::ServiceError;

/// Loaded once per sign-in and handed to whatever renders the user's view. The local set only
/// changes after the backing store confirmed the change.
#[derive(Clone, Debug)]
pub struct UserSession {
    identity:   Identity,
    bookmarked: BTreeSet<String>,
}

impl UserSession {
    pub async fn load(bookmarks: &Bookmarks, identity: Identity) -> Result<Self, ServiceError> {
        let bookmarked = bookmarks.list(&identity).await?.into_iter().collect();
        Ok(Self { identity, bookmarked })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn bookmarked(&self) -> impl Iterator<Item = &str> {
        self.bookmarked.iter().map(String::as_str)
    }

    pub fn is_bookmarked(&self, coin_id: &str) -> bool {
        self.bookmarked.contains(coin_id)
    }

    /// Add or remove `coin_id`. Returns whether it is bookmarked afterwards.
    pub async fn toggle(&mut self, bookmarks: &Bookmarks, coin_id: &str) -> Result<bool, ServiceError> {
        if self.is_bookmarked(coin_id) {
            bookmarks.remove(&self.identity, coin_id).await?;
            self.bookmarked.remove(coin_id);
            Ok(false)
        }
        else {
            bookmarks.add(&self.identity, coin_id).await?;
            self.bookmarked.insert(coin_id.to_string());
            Ok(true)
        }
    }
}
