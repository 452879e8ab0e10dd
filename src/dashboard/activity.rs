//! Recent-activity feed
//!
//! Users become signups, posts become orders and comments become reviews. The
//! order amount and review rating have no upstream source and are drawn from
//! the injected generator.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::model::{ActivityEvent, ActivityKind};
use super::source::{Comment, DataSource, Page, Post, User, UpstreamError};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 1440;

/// Format the distance from `then` to `now` as "N minutes/hours/days ago".
///
/// Timestamps in the future count as zero minutes.
pub fn format_relative_time(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes().max(0);

    if minutes < MINUTES_PER_HOUR {
        format!("{} minutes ago", minutes)
    } else if minutes < MINUTES_PER_DAY {
        format!("{} hours ago", minutes / MINUTES_PER_HOUR)
    } else {
        format!("{} days ago", minutes / MINUTES_PER_DAY)
    }
}

/// Random order amount in [50, 500) with cents precision
pub fn random_amount<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let raw: f64 = rng.gen_range(50.0..500.0);
    (raw * 100.0).round() / 100.0
}

/// Random review rating in 1..=5
pub fn random_rating<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=5)
}

/// Merge upstream records into one feed, newest first, at most `limit` long.
///
/// Records without a timestamp are treated as happening at `now`.
pub fn build_activity<R: Rng + ?Sized>(
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    now: DateTime<Utc>,
    rng: &mut R,
    limit: usize,
) -> Vec<ActivityEvent> {
    let mut timed: Vec<(DateTime<Utc>, ActivityEvent)> =
        Vec::with_capacity(users.len() + posts.len() + comments.len());

    for user in users {
        let at = user.register_date.unwrap_or(now);
        timed.push((
            at,
            ActivityEvent {
                id: format!("signup-{}", user.id),
                kind: ActivityKind::Signup,
                user: user.full_name(),
                time: format_relative_time(now, at),
            },
        ));
    }

    for post in posts {
        let at = post.publish_date.unwrap_or(now);
        timed.push((
            at,
            ActivityEvent {
                id: format!("order-{}", post.id),
                kind: ActivityKind::Order {
                    amount: random_amount(rng),
                },
                user: post.owner.full_name(),
                time: format_relative_time(now, at),
            },
        ));
    }

    for comment in comments {
        let at = comment.publish_date.unwrap_or(now);
        timed.push((
            at,
            ActivityEvent {
                id: format!("review-{}", comment.id),
                kind: ActivityKind::Review {
                    rating: random_rating(rng),
                },
                user: comment.owner.full_name(),
                time: format_relative_time(now, at),
            },
        ));
    }

    // Stable: equal timestamps keep signup, order, review order
    timed.sort_by(|a, b| b.0.cmp(&a.0));
    timed.into_iter().take(limit).map(|(_, event)| event).collect()
}

/// Static feed served when the upstream is unavailable
pub fn fallback_activity(limit: usize) -> Vec<ActivityEvent> {
    let entries: [(ActivityKind, &str, &str); 8] = [
        (ActivityKind::Order { amount: 125.99 }, "John Doe", "10 minutes ago"),
        (ActivityKind::Signup, "Jane Smith", "25 minutes ago"),
        (ActivityKind::Order { amount: 349.50 }, "Robert Johnson", "1 hour ago"),
        (ActivityKind::Review { rating: 5 }, "Emily Davis", "2 hours ago"),
        (ActivityKind::Order { amount: 78.25 }, "Michael Brown", "3 hours ago"),
        (ActivityKind::Signup, "Sarah Wilson", "4 hours ago"),
        (ActivityKind::Order { amount: 199.99 }, "David Miller", "5 hours ago"),
        (ActivityKind::Review { rating: 4 }, "Jennifer Taylor", "6 hours ago"),
    ];

    entries
        .into_iter()
        .enumerate()
        .take(limit)
        .map(|(i, (kind, user, time))| ActivityEvent {
            id: (i + 1).to_string(),
            kind,
            user: user.to_string(),
            time: time.to_string(),
        })
        .collect()
}

/// Fetch users, posts and comments in parallel.
///
/// A failure in any of the three fails the whole batch.
pub async fn fetch_sources(
    source: &dyn DataSource,
    limit: usize,
) -> Result<(Page<User>, Page<Post>, Page<Comment>), UpstreamError> {
    tokio::try_join!(source.users(limit), source.posts(limit), source.comments(limit))
}

/// Fetch and build the feed; any upstream failure yields the static feed
pub async fn fetch_activity(
    source: &dyn DataSource,
    rng: &Mutex<StdRng>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ActivityEvent> {
    match fetch_sources(source, limit).await {
        Ok((users, posts, comments)) => {
            let mut rng = rng.lock().await;
            let events = build_activity(users.data, posts.data, comments.data, now, &mut *rng, limit);
            info!(count = events.len(), "Built activity feed");
            events
        }
        Err(e) => {
            warn!(error = %e, "Activity fetch failed, using fallback activity");
            fallback_activity(limit)
        }
    }
}
