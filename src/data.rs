use std::sync::Arc;

use anyhow::{Context, Result};

use crate::bsky::{self, PostRecord};
use crate::media::{self, MediaInfo};

pub trait SearchService: Send + Sync {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<PostRecord>>;
}

pub struct BskySearchService {
    client: Arc<bsky::Client>,
}

impl BskySearchService {
    pub fn new(client: Arc<bsky::Client>) -> Self {
        Self { client }
    }
}

impl SearchService for BskySearchService {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<PostRecord>> {
        self.client
            .search_posts(query, limit)
            .context("search posts")
    }
}

/// Canned results for offline runs and tests.
#[derive(Default)]
pub struct MockSearchService {
    pub posts: Vec<PostRecord>,
}

impl SearchService for MockSearchService {
    fn search(&self, _query: &str, limit: u32) -> Result<Vec<PostRecord>> {
        let mut posts = self.posts.clone();
        posts.truncate(limit as usize);
        Ok(posts)
    }
}

/// User-selected result filters; all optional, applied after the fetch
/// and before rendering. The media predicates consume the classifier's
/// output rather than re-inspecting the post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub min_likes: Option<i64>,
    pub max_likes: Option<i64>,
    pub require_image: bool,
    pub require_video: bool,
}

impl FilterOptions {
    pub fn is_active(&self) -> bool {
        self.min_likes.is_some()
            || self.max_likes.is_some()
            || self.require_image
            || self.require_video
    }

    pub fn matches(&self, post: &PostRecord, media: &MediaInfo) -> bool {
        if let Some(min) = self.min_likes {
            if post.like_count < min {
                return false;
            }
        }
        if let Some(max) = self.max_likes {
            if post.like_count > max {
                return false;
            }
        }
        if self.require_image && media.images.is_empty() {
            return false;
        }
        if self.require_video && !media.is_video {
            return false;
        }
        true
    }
}

/// Classifies every post once, drops the ones the filters reject, and
/// truncates to the requested limit (filter first, then limit, matching
/// how the result count behaves upstream).
pub fn classify_and_filter(
    posts: Vec<PostRecord>,
    filters: &FilterOptions,
    limit: u32,
) -> Vec<(PostRecord, MediaInfo)> {
    let mut classified: Vec<(PostRecord, MediaInfo)> = posts
        .into_iter()
        .map(|post| {
            let info = media::classify(&post);
            (post, info)
        })
        .filter(|(post, info)| filters.matches(post, info))
        .collect();
    classified.truncate(limit as usize);
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: &str, likes: i64) -> PostRecord {
        PostRecord {
            uri: format!("at://did:plc:abc/app.bsky.feed.post/{id}"),
            like_count: likes,
            ..PostRecord::default()
        }
    }

    fn image_post(id: &str) -> PostRecord {
        PostRecord {
            embed: Some(json!({ "images": [{ "fullsize": "https://cdn.test/i.jpg" }] })),
            ..post(id, 0)
        }
    }

    fn video_post(id: &str) -> PostRecord {
        PostRecord {
            embed: Some(json!({ "media": { "type": "video" } })),
            ..post(id, 0)
        }
    }

    fn ids(results: &[(PostRecord, MediaInfo)]) -> Vec<&str> {
        results.iter().map(|(post, _)| post.local_id()).collect()
    }

    #[test]
    fn no_filters_passes_everything_through() {
        let filters = FilterOptions::default();
        assert!(!filters.is_active());
        let results = classify_and_filter(vec![post("a", 0), post("b", 5)], &filters, 20);
        assert_eq!(ids(&results), ["a", "b"]);
    }

    #[test]
    fn like_bounds_are_inclusive() {
        let filters = FilterOptions {
            min_likes: Some(5),
            max_likes: Some(10),
            ..FilterOptions::default()
        };
        let posts = vec![post("low", 4), post("min", 5), post("max", 10), post("high", 11)];
        let results = classify_and_filter(posts, &filters, 20);
        assert_eq!(ids(&results), ["min", "max"]);
    }

    #[test]
    fn require_image_keeps_only_image_posts() {
        let filters = FilterOptions {
            require_image: true,
            ..FilterOptions::default()
        };
        let results =
            classify_and_filter(vec![post("bare", 0), image_post("pic")], &filters, 20);
        assert_eq!(ids(&results), ["pic"]);
    }

    #[test]
    fn require_video_uses_classifier_output() {
        let filters = FilterOptions {
            require_video: true,
            ..FilterOptions::default()
        };
        let results = classify_and_filter(
            vec![image_post("pic"), video_post("vid"), post("bare", 0)],
            &filters,
            20,
        );
        assert_eq!(ids(&results), ["vid"]);
    }

    #[test]
    fn limit_applies_after_filtering() {
        let filters = FilterOptions {
            min_likes: Some(1),
            ..FilterOptions::default()
        };
        let posts = vec![post("skip", 0), post("a", 2), post("b", 3), post("c", 4)];
        let results = classify_and_filter(posts, &filters, 2);
        assert_eq!(ids(&results), ["a", "b"]);
    }

    #[test]
    fn mock_service_honors_limit() {
        let service = MockSearchService {
            posts: vec![post("a", 0), post("b", 0), post("c", 0)],
        };
        let results = service.search("anything", 2).unwrap();
        assert_eq!(results.len(), 2);
    }
}
