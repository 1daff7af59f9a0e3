//! Turning raw `getUpdates` results into [`FeedItem`]s.
//!
//! Parsing is per update: one malformed update never fails the batch. An
//! update whose attachments cannot be read is still returned (with the bad
//! attachment dropped) so the cursor moves past it instead of stalling on it
//! forever. Only an update without a usable `update_id` is dropped outright,
//! since it has no position in the feed.

use serde_json::Value;

use gallery_core::{AttachmentRef, FeedError, FeedItem};

/// Parse the `result` array of a `getUpdates` response.
///
/// Returns items with `update_id > since`, ascending, one per update id.
/// When `chat_id` is set, updates from other chats come back without
/// attachments.
pub fn parse_updates(updates: &[Value], since: Option<u64>, chat_id: Option<i64>) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = Vec::with_capacity(updates.len());
    for update in updates {
        let Some(cursor_id) = update.get("update_id").and_then(Value::as_u64) else {
            tracing::warn!("skipping update without a numeric update_id: {update}");
            continue;
        };
        if since.is_some_and(|since| cursor_id <= since) {
            continue;
        }
        let attachments = match parse_attachments(update, chat_id) {
            Ok(attachments) => attachments,
            Err(err) => {
                tracing::warn!("update {cursor_id}: {err}; skipping its attachments");
                vec![]
            }
        };
        items.push(FeedItem {
            cursor_id,
            attachments,
        });
    }
    items.sort_by_key(|item| item.cursor_id);
    items.dedup_by_key(|item| item.cursor_id);
    items
}

fn parse_attachments(update: &Value, chat_id: Option<i64>) -> Result<Vec<AttachmentRef>, FeedError> {
    let Some(message) = update.get("message").or_else(|| update.get("channel_post")) else {
        return Ok(vec![]);
    };

    if let Some(wanted) = chat_id {
        let chat = message
            .get("chat")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64);
        if chat != Some(wanted) {
            tracing::debug!("ignoring message from chat {chat:?}");
            return Ok(vec![]);
        }
    }

    let mut attachments = Vec::new();

    if let Some(photo) = message.get("photo") {
        // Telegram lists every resolution of a photo; the last is the largest.
        let largest = photo
            .as_array()
            .and_then(|sizes| sizes.last())
            .ok_or_else(|| FeedError::Validation("photo is not a non-empty array".into()))?;
        attachments.push(AttachmentRef::new(file_id(largest, "photo")?));
    }

    if let Some(doc) = message.get("document") {
        let is_image = doc
            .get("mime_type")
            .and_then(Value::as_str)
            .is_some_and(|m| m.starts_with("image/"));
        if is_image {
            attachments.push(AttachmentRef {
                remote_id: file_id(doc, "document")?,
                file_name: doc
                    .get("file_name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
    }

    Ok(attachments)
}

fn file_id(v: &Value, what: &str) -> Result<String, FeedError> {
    v.get("file_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FeedError::Validation(format!("{what} has no file_id")))
}
