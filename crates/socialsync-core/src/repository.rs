use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::analytics::Analytics;
use crate::demo::DashboardData;
use crate::filter::ViewState;
use crate::post::{NewPost, PlatformRegistry, Post, SocialAccount};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Source of the posts the dashboard displays.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Post>>;

    /// Validates `new_post` and stores it as a scheduled post.
    async fn create(&self, new_post: NewPost) -> anyhow::Result<Post>;

    async fn delete(&self, id: &str) -> anyhow::Result<()>;

    /// True while a mutation is in flight.
    fn is_loading(&self) -> bool;
}

#[derive(Debug, Default)]
struct State {
    posts: Vec<Post>,
    analytics: Analytics,
    accounts: Vec<SocialAccount>,
}

/// Process-local repository with a simulated network round-trip.
#[derive(Debug)]
pub struct InMemoryPostRepository {
    state: Mutex<State>,
    busy: AtomicBool,
    latency: Duration,
    registry: PlatformRegistry,
}

impl Default for InMemoryPostRepository {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

impl InMemoryPostRepository {
    pub fn new(latency: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            busy: AtomicBool::new(false),
            latency,
            registry: PlatformRegistry::default(),
        }
    }

    #[tracing::instrument(skip(data), fields(posts = data.posts.len()))]
    pub fn from_dashboard(data: DashboardData, latency: Duration) -> Self {
        let repo = Self::new(latency);
        {
            let mut state = repo.state.lock();
            state.posts = data.posts;
            state.analytics = data.analytics;
            state.accounts = data.social_accounts;
        }
        repo
    }

    pub fn with_registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Current posts without waiting on the simulated round-trip.
    pub fn snapshot(&self) -> Vec<Post> {
        self.state.lock().posts.clone()
    }

    pub fn analytics(&self) -> Analytics {
        self.state.lock().analytics.clone()
    }

    pub fn accounts(&self) -> Vec<SocialAccount> {
        self.state.lock().accounts.clone()
    }

    pub fn view(&self) -> ViewState<Vec<Post>> {
        if self.is_loading() {
            ViewState::Loading
        } else {
            ViewState::Ready(self.snapshot())
        }
    }

    fn begin_mutation(&self, op: &'static str) -> anyhow::Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(op, "rejected mutation while another is in flight");
            return Err(anyhow!("repository is busy: another change is in progress"));
        }
        Ok(BusyGuard { flag: &self.busy })
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Clears the loading flag on every exit path.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    #[tracing::instrument(skip(self))]
    async fn list(&self) -> anyhow::Result<Vec<Post>> {
        self.round_trip().await;
        let posts = self.snapshot();
        debug!(count = posts.len(), "listed posts");
        Ok(posts)
    }

    #[tracing::instrument(skip(self, new_post), fields(platforms = new_post.platforms.len()))]
    async fn create(&self, new_post: NewPost) -> anyhow::Result<Post> {
        let _guard = self.begin_mutation("create")?;
        self.round_trip().await;

        let post = new_post.validate(&self.registry)?;
        let mut state = self.state.lock();
        state.posts.push(post.clone());
        state.analytics.post_created();
        info!(id = %post.id, total = state.analytics.overview.total_posts, "created post");
        Ok(post)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.begin_mutation("delete")?;
        self.round_trip().await;

        let mut state = self.state.lock();
        let idx = state
            .posts
            .iter()
            .position(|post| post.id == id)
            .ok_or_else(|| anyhow!("post not found: {id}"))?;
        state.posts.remove(idx);
        state.analytics.post_deleted();
        info!(id, total = state.analytics.overview.total_posts, "deleted post");
        Ok(())
    }

    fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
