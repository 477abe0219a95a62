//! One-shot toast messages.

use tower_sessions::Session;

use crate::models::{Flash, keys};

/// Queue a message for the next rendered page.
///
/// Failures are logged; a lost toast never fails the request.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(keys::FLASH, flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(keys::FLASH)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read flash message");
            None
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_flash(&session, Flash::success("Welcome back!")).await;

        assert_eq!(
            take_flash(&session).await,
            Some(Flash::success("Welcome back!"))
        );
        assert_eq!(take_flash(&session).await, None);
    }

    #[tokio::test]
    async fn test_newer_flash_replaces_older() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        set_flash(&session, Flash::info("first")).await;
        set_flash(&session, Flash::error("second")).await;

        assert_eq!(take_flash(&session).await, Some(Flash::error("second")));
    }
}
