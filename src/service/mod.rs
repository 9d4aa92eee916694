//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database, media store, and notification operations.

mod account;
mod engagement;
mod feed;
mod notification;

pub use account::{AccountService, Profile, ProfileUpdate, Registration};
pub use engagement::{EngagementService, FollowState};
pub use feed::{CommentView, FeedService, PostView};
#[cfg(test)]
pub use notification::MockNotificationSink;
pub use notification::{NotificationLog, NotificationSink, NotificationView};
