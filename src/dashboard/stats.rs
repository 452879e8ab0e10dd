//! Business stats derived from the upstream user count

use tracing::{info, warn};

use super::model::Stats;
use super::source::DataSource;

/// User count assumed when the upstream reports none
pub const DEFAULT_USER_COUNT: u64 = 1254;

/// Returned when the upstream cannot be reached or answers garbage.
///
/// These constants are independent of the multipliers below: deriving from
/// `DEFAULT_USER_COUNT` gives revenue 87780, orders 351, visitors 9781.
pub const FALLBACK_STATS: Stats = Stats {
    users: 1254,
    revenue: 87500,
    orders: 356,
    visitors: 9821,
};

const REVENUE_PER_USER: u64 = 70;
const ORDERS_PER_USER: f64 = 0.28;
const VISITORS_PER_USER: f64 = 7.8;

/// Derive the full stats set from a user count.
///
/// The count comes from the upstream, so out-of-range products saturate.
pub fn derive_stats(users: u64) -> Stats {
    Stats {
        users,
        revenue: users.saturating_mul(REVENUE_PER_USER),
        orders: (users as f64 * ORDERS_PER_USER).floor() as u64,
        visitors: (users as f64 * VISITORS_PER_USER).floor() as u64,
    }
}

/// Fetch the user count and derive stats, falling back on any failure
pub async fn fetch_stats(source: &dyn DataSource) -> Stats {
    match source.users(1).await {
        Ok(page) => {
            let users = page.total.filter(|t| *t > 0).unwrap_or(DEFAULT_USER_COUNT);
            let stats = derive_stats(users);
            info!(?stats, "Derived stats from upstream user count");
            stats
        }
        Err(e) => {
            warn!(error = %e, "Stats fetch failed, using fallback stats");
            FALLBACK_STATS
        }
    }
}
