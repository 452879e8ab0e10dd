//! Dashboard aggregation over a `DataSource`

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::activity::fetch_activity;
use super::charts::{build_chart_data, fallback_chart_data};
use super::model::{ActivityEvent, ChartData, DashboardData, Stats};
use super::source::DataSource;
use super::stats::fetch_stats;
use crate::types::Result;

/// Events shown in the dashboard's recent-activity panel
pub const DASHBOARD_ACTIVITY_LIMIT: usize = 8;

/// Events sampled for the activity-by-type chart
pub const CHART_ACTIVITY_SAMPLE: usize = 20;

pub struct DashboardService {
    source: Arc<dyn DataSource>,
    rng: Mutex<StdRng>,
}

impl DashboardService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self::with_rng(source, StdRng::from_entropy())
    }

    /// Build with a fixed generator (seeded in tests)
    pub fn with_rng(source: Arc<dyn DataSource>, rng: StdRng) -> Self {
        Self {
            source,
            rng: Mutex::new(rng),
        }
    }

    pub async fn stats(&self) -> Stats {
        fetch_stats(self.source.as_ref()).await
    }

    pub async fn activity(&self, limit: usize) -> Vec<ActivityEvent> {
        fetch_activity(self.source.as_ref(), &self.rng, Utc::now(), limit).await
    }

    /// Chart series; any failure while building yields the full fallback set
    pub async fn chart_data(&self) -> ChartData {
        let (stats, activity) = tokio::join!(self.stats(), self.activity(CHART_ACTIVITY_SAMPLE));

        let built = {
            let mut rng = self.rng.lock().await;
            build_chart_data(&stats, &activity, Utc::now(), &mut *rng)
        };

        match built {
            Ok(chart) => chart,
            Err(e) => {
                warn!(error = %e, "Chart synthesis failed, using fallback chart data");
                fallback_chart_data()
            }
        }
    }

    /// Stats, recent activity and charts, fetched concurrently.
    ///
    /// Each branch absorbs its own upstream failures; only a panicked task
    /// makes this fail.
    pub async fn dashboard(self: &Arc<Self>) -> Result<DashboardData> {
        let stats = tokio::spawn({
            let service = Arc::clone(self);
            async move { service.stats().await }
        });
        let activity = tokio::spawn({
            let service = Arc::clone(self);
            async move { service.activity(DASHBOARD_ACTIVITY_LIMIT).await }
        });
        let charts = tokio::spawn({
            let service = Arc::clone(self);
            async move { service.chart_data().await }
        });

        let (stats, recent_activity, chart_data) = tokio::try_join!(stats, activity, charts)?;
        debug!(activity = recent_activity.len(), "Dashboard data assembled");

        Ok(DashboardData {
            stats,
            recent_activity,
            chart_data,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dashboard::model::ActivityKind;
    use crate::dashboard::source::{Comment, Owner, Page, Post, UpstreamError, User};
    use crate::dashboard::stats::{derive_stats, FALLBACK_STATS};
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory data source
    pub(crate) struct FakeSource {
        users: Vec<User>,
        posts: Vec<Post>,
        comments: Vec<Comment>,
        total: Option<u64>,
        fail_posts: bool,
        fail_all: bool,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeSource {
        fn blank() -> Self {
            Self {
                users: vec![],
                posts: vec![],
                comments: vec![],
                total: None,
                fail_posts: false,
                fail_all: false,
                calls: AtomicUsize::new(0),
            }
        }

        /// No records and no total
        pub(crate) fn empty() -> Self {
            Self::blank()
        }

        pub(crate) fn with_user_total(total: u64) -> Self {
            Self {
                total: Some(total),
                ..Self::blank()
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail_all: true,
                ..Self::blank()
            }
        }

        /// Users and comments succeed, posts fail
        pub(crate) fn failing_posts() -> Self {
            Self {
                fail_posts: true,
                ..Self::sample()
            }
        }

        /// Two users, two posts, two comments spread over the last few hours
        pub(crate) fn sample() -> Self {
            let now = Utc::now();
            let owner = |first: &str| Owner {
                first_name: first.into(),
                last_name: "Doe".into(),
            };

            Self {
                users: vec![
                    User {
                        id: "u1".into(),
                        first_name: "Ann".into(),
                        last_name: "Lee".into(),
                        register_date: Some(now - Duration::minutes(5)),
                    },
                    User {
                        id: "u2".into(),
                        first_name: "Bo".into(),
                        last_name: "Kim".into(),
                        register_date: Some(now - Duration::minutes(90)),
                    },
                ],
                posts: vec![
                    Post {
                        id: "p1".into(),
                        owner: owner("Cy"),
                        publish_date: Some(now - Duration::minutes(15)),
                    },
                    Post {
                        id: "p2".into(),
                        owner: owner("Di"),
                        publish_date: Some(now - Duration::days(2)),
                    },
                ],
                comments: vec![
                    Comment {
                        id: "c1".into(),
                        owner: owner("Ed"),
                        publish_date: Some(now - Duration::minutes(30)),
                    },
                    Comment {
                        id: "c2".into(),
                        owner: owner("Fa"),
                        publish_date: Some(now - Duration::hours(5)),
                    },
                ],
                total: Some(1000),
                ..Self::blank()
            }
        }

        fn check(&self) -> std::result::Result<(), UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                Err(UpstreamError::Network("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn page<T: Clone>(items: &[T], limit: usize, total: Option<u64>) -> Page<T> {
        Page {
            data: items.iter().take(limit).cloned().collect(),
            total,
        }
    }

    #[async_trait::async_trait]
    impl DataSource for FakeSource {
        async fn users(&self, limit: usize) -> std::result::Result<Page<User>, UpstreamError> {
            self.check()?;
            Ok(page(&self.users, limit, self.total))
        }

        async fn posts(&self, limit: usize) -> std::result::Result<Page<Post>, UpstreamError> {
            self.check()?;
            if self.fail_posts {
                return Err(UpstreamError::Status {
                    status: 500,
                    url: "fake://post".into(),
                });
            }
            Ok(page(&self.posts, limit, None))
        }

        async fn comments(&self, limit: usize) -> std::result::Result<Page<Comment>, UpstreamError> {
            self.check()?;
            Ok(page(&self.comments, limit, None))
        }
    }

    fn service(source: FakeSource) -> Arc<DashboardService> {
        Arc::new(DashboardService::with_rng(
            Arc::new(source),
            StdRng::seed_from_u64(42),
        ))
    }

    #[tokio::test]
    async fn test_activity_from_sample() {
        let service = service(FakeSource::sample());
        let events = service.activity(6).await;

        assert_eq!(events.len(), 6);
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["signup-u1", "order-p1", "review-c1", "signup-u2", "review-c2", "order-p2"]
        );

        let signups = events.iter().filter(|e| e.kind == ActivityKind::Signup).count();
        let orders = events
            .iter()
            .filter(|e| matches!(e.kind, ActivityKind::Order { amount } if (50.0..=500.0).contains(&amount)))
            .count();
        let reviews = events
            .iter()
            .filter(|e| matches!(e.kind, ActivityKind::Review { rating } if (1..=5).contains(&rating)))
            .count();
        assert_eq!((signups, orders, reviews), (2, 2, 2));
        assert_eq!(events[0].user, "Ann Lee");
    }

    #[tokio::test]
    async fn test_one_failed_collection_falls_back_entirely() {
        let service = service(FakeSource::failing_posts());
        let events = service.activity(5).await;

        assert_eq!(events.len(), 5);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].user, "John Doe");
    }

    #[tokio::test]
    async fn test_chart_data_from_sample() {
        let service = service(FakeSource::sample());
        let chart = service.chart_data().await;

        assert_eq!(chart.revenue.len(), 7);
        assert_eq!(chart.users.len(), 6);
        let total: usize = chart.activity_by_type.iter().map(|c| c.count).sum();
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn test_dashboard_upstream_down() {
        let service = service(FakeSource::failing());
        let data = service.dashboard().await.unwrap();

        assert_eq!(data.stats, FALLBACK_STATS);
        assert_eq!(data.recent_activity.len(), DASHBOARD_ACTIVITY_LIMIT);
        assert_eq!(data.recent_activity[7].user, "Jennifer Taylor");
        // Charts are still synthesized, from the fallback stats and activity
        assert_eq!(data.chart_data.revenue.len(), 7);
        assert_eq!(data.chart_data.activity_by_type[0].label, "Orders");
        assert_eq!(data.chart_data.activity_by_type[0].count, 4);
    }

    #[tokio::test]
    async fn test_dashboard_live() {
        let source = Arc::new(FakeSource::sample());
        let service = Arc::new(DashboardService::with_rng(
            source.clone(),
            StdRng::seed_from_u64(42),
        ));
        let data = service.dashboard().await.unwrap();

        // stats: 1, activity: 3, charts: 1 + 3
        assert_eq!(source.calls.load(Ordering::SeqCst), 8);

        assert_eq!(data.stats, derive_stats(1000));
        assert_eq!(data.recent_activity.len(), 6);

        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("recentActivity").is_some());
        assert!(json["chartData"].get("activityByType").is_some());
    }
}
