//! Watch-time aggregation: daily reset and merge of per-user state.
//!
//! Every operation holds the user's key lock for its whole read-modify-write,
//! so concurrent reports for the same user never lose updates while reports
//! for different users proceed independently.
//!
//! A day rollover observed by [`VideoService::get`] is applied to the returned
//! value only and is not written back; the next `save` or `setting` computes
//! the same reset and persists it.

use super::models::{UserState, VideoSetting, VideoSubmit};
use crate::store::{KeyedCache, KeyedMutex, StoreError};
use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

pub const DEFAULT_LIMIT_TIME_MS: i64 = 60_000;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("failed to access stored state for user {user_id}")]
    Store {
        user_id: String,
        #[source]
        source: StoreError,
    },
}

pub type Result<T, E = VideoError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct VideoService {
    cache: KeyedCache,
    locks: KeyedMutex,
    default_limit_time: i64,
}

impl VideoService {
    pub fn new(cache: KeyedCache, default_limit_time: i64) -> Self {
        Self {
            cache,
            locks: KeyedMutex::new(),
            default_limit_time,
        }
    }

    /// Current state for `user_id`, with any day rollover applied.
    pub async fn get(&self, user_id: &str) -> Result<UserState> {
        self.get_at(user_id, Local::now()).await
    }

    pub async fn get_at(&self, user_id: &str, now: DateTime<Local>) -> Result<UserState> {
        let _guard = self.locks.lock(user_id).await;
        self.current(user_id, now).await
    }

    /// Add a watch-time report and persist the result.
    pub async fn save(&self, user_id: &str, submit: VideoSubmit) -> Result<UserState> {
        self.save_at(user_id, submit, Local::now()).await
    }

    #[instrument(skip(self, submit), fields(delta = submit.watch_time))]
    pub async fn save_at(
        &self,
        user_id: &str,
        submit: VideoSubmit,
        now: DateTime<Local>,
    ) -> Result<UserState> {
        info!(url = %submit.url, "Watch time submitted");
        let _guard = self.locks.lock(user_id).await;

        let mut state = self.current(user_id, now).await?;
        state.watch_time = state.watch_time.saturating_add(submit.watch_time);
        state.last_at = Some(now);

        self.persist(user_id, &state).await?;
        debug!(
            watch_time = state.watch_time,
            remaining = state.remaining(),
            "Watch time updated"
        );
        Ok(state)
    }

    /// Update the limit and, when non-empty, the custom message.
    pub async fn setting(&self, user_id: &str, setting: VideoSetting) -> Result<UserState> {
        self.setting_at(user_id, setting, Local::now()).await
    }

    #[instrument(skip(self, setting), fields(limit_time = setting.limit_time))]
    pub async fn setting_at(
        &self,
        user_id: &str,
        setting: VideoSetting,
        now: DateTime<Local>,
    ) -> Result<UserState> {
        let _guard = self.locks.lock(user_id).await;

        let mut state = self.current(user_id, now).await?;
        state.limit_time = setting.limit_time;
        if !setting.custom_message.is_empty() {
            state.custom_message = setting.custom_message;
        }

        self.persist(user_id, &state).await?;
        info!("Settings updated");
        Ok(state)
    }

    /// Stored state or defaults, with day reset applied. Caller holds the key lock.
    async fn current(&self, user_id: &str, now: DateTime<Local>) -> Result<UserState> {
        let mut state = match self.cache.get::<UserState>(user_id).await {
            Ok(state) => state,
            Err(StoreError::NotFound(_)) => UserState::with_limit(self.default_limit_time),
            Err(source) => {
                return Err(VideoError::Store {
                    user_id: user_id.to_owned(),
                    source,
                });
            }
        };
        if state.reset_if_new_day(now) {
            debug!(user_id, "Daily watch time reset");
        }
        Ok(state)
    }

    async fn persist(&self, user_id: &str, state: &UserState) -> Result<()> {
        self.cache
            .put(user_id, state)
            .await
            .map_err(|source| VideoError::Store {
                user_id: user_id.to_owned(),
                source,
            })
    }
}
