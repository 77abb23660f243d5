use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::backlog::types::Visibility;

use super::{ApiError, ListedVideo, VideoApi, VideoDetails, VideoPage};

#[derive(Clone, Debug, PartialEq)]
pub enum MockCall {
    List { channel_id: String, page_token: Option<String> },
    Details { ids: Vec<String> },
    Update { video_id: String, visibility: Visibility },
}

/// In-memory remote with scripted failures. Successful updates change the
/// stored visibility so repeated runs observe the new state.
#[derive(Default)]
pub struct MockApi {
    channels: Mutex<HashMap<String, Result<Vec<VideoDetails>, ApiError>>>,
    visibility: Mutex<HashMap<String, Visibility>>,
    update_script: Mutex<HashMap<String, VecDeque<Result<(), ApiError>>>>,
    details_script: Mutex<VecDeque<ApiError>>,
    hidden: Mutex<HashSet<String>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(self, channel_id: &str, videos: Vec<VideoDetails>) -> Self {
        {
            let mut vis = self.visibility.lock().unwrap();
            for v in &videos {
                vis.insert(v.id.clone(), v.visibility);
            }
        }
        self.channels.lock().unwrap().insert(channel_id.to_string(), Ok(videos));
        self
    }

    pub fn with_channel_error(self, channel_id: &str, err: ApiError) -> Self {
        self.channels.lock().unwrap().insert(channel_id.to_string(), Err(err));
        self
    }

    /// Responses consumed in order by successive updates of `video_id`;
    /// once drained, updates succeed.
    pub fn script_updates(&self, video_id: &str, responses: Vec<Result<(), ApiError>>) {
        self.update_script.lock().unwrap().insert(video_id.to_string(), responses.into());
    }

    pub fn fail_next_details(&self, err: ApiError) {
        self.details_script.lock().unwrap().push_back(err);
    }

    /// Keeps `video_id` in listings but drops it from detail lookups.
    pub fn hide_details(&self, video_id: &str) {
        self.hidden.lock().unwrap().insert(video_id.to_string());
    }

    pub fn set_visibility(&self, video_id: &str, visibility: Visibility) {
        self.visibility.lock().unwrap().insert(video_id.to_string(), visibility);
    }

    pub fn visibility_of(&self, video_id: &str) -> Option<Visibility> {
        self.visibility.lock().unwrap().get(video_id).copied()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self, video_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Update { video_id: id, .. } if id == video_id))
            .count()
    }

    pub fn list_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, MockCall::List { .. })).count()
    }

    pub fn details_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, MockCall::Details { .. })).count()
    }
}

pub fn stream(id: &str, published_at: DateTime<Utc>, visibility: Visibility) -> VideoDetails {
    VideoDetails { id: id.to_string(), title: Some(format!("stream {id}")), visibility, published_at, is_live: true }
}

pub fn upload(id: &str, published_at: DateTime<Utc>, visibility: Visibility) -> VideoDetails {
    VideoDetails { is_live: false, ..stream(id, published_at, visibility) }
}

#[async_trait]
impl VideoApi for MockApi {
    async fn list_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<VideoPage, ApiError> {
        self.calls.lock().unwrap().push(MockCall::List {
            channel_id: channel_id.to_string(),
            page_token: page_token.map(str::to_string),
        });
        let channels = self.channels.lock().unwrap();
        let videos = match channels.get(channel_id) {
            Some(Ok(videos)) => videos,
            Some(Err(err)) => return Err(err.clone()),
            None => return Err(ApiError::NotFound(channel_id.to_string())),
        };

        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + page_size.max(1)).min(videos.len());
        let page = videos[start.min(end)..end]
            .iter()
            .map(|v| ListedVideo { id: v.id.clone(), published_at: v.published_at })
            .collect();
        let next_page_token = (end < videos.len()).then(|| end.to_string());
        Ok(VideoPage { videos: page, next_page_token })
    }

    async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetails>, ApiError> {
        self.calls.lock().unwrap().push(MockCall::Details { ids: ids.to_vec() });
        if let Some(err) = self.details_script.lock().unwrap().pop_front() {
            return Err(err);
        }
        let channels = self.channels.lock().unwrap();
        let visibility = self.visibility.lock().unwrap();
        let hidden = self.hidden.lock().unwrap();
        let known: HashMap<&str, &VideoDetails> = channels
            .values()
            .filter_map(|c| c.as_ref().ok())
            .flatten()
            .map(|v| (v.id.as_str(), v))
            .collect();
        Ok(ids
            .iter()
            .filter(|id| !hidden.contains(id.as_str()))
            .filter_map(|id| known.get(id.as_str()))
            .map(|v| VideoDetails {
                visibility: visibility.get(&v.id).copied().unwrap_or(v.visibility),
                ..(*v).clone()
            })
            .collect())
    }

    async fn update_visibility(&self, video_id: &str, visibility: Visibility) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(MockCall::Update { video_id: video_id.to_string(), visibility });
        let scripted = self
            .update_script
            .lock()
            .unwrap()
            .get_mut(video_id)
            .and_then(|q| q.pop_front());
        match scripted {
            Some(Err(err)) => Err(err),
            _ => {
                self.visibility.lock().unwrap().insert(video_id.to_string(), visibility);
                Ok(())
            }
        }
    }
}
