//! # gallery-feed
//!
//! Feed reader over the Telegram Bot API.
//!
//! [`TelegramFeed`] implements [`FeedSource`](gallery_core::FeedSource):
//! `getUpdates` supplies the items (the update id is the cursor) and
//! `getFile` plus a file download resolve each attachment.

pub mod parse;
pub mod telegram;

pub use parse::parse_updates;
pub use telegram::TelegramFeed;
