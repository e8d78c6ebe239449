//! Heuristic media classification for search-result posts.
//!
//! The AppView exposes no stable discriminator for visual media across
//! client and link types, so classification is an OR-composition of
//! independent weak signals probed over the raw `embed`/`record` JSON.
//! False positives are acceptable; false negatives are the failure mode
//! this module is built to minimize. Unknown or malformed shapes always
//! degrade to "no media" rather than erroring.

use serde_json::Value;

use crate::bsky::PostRecord;
use crate::thumb::{self, Platform, SyntheticThumb};

/// Derived summary of a post's visual media, one per classify call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    /// Full-size image URLs in discovery order.
    pub images: Vec<String>,
    pub is_video: bool,
    pub thumbnail: Thumbnail,
}

impl MediaInfo {
    pub fn has_media(&self) -> bool {
        !self.images.is_empty() || self.is_video
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Thumbnail {
    #[default]
    None,
    /// Concrete URL found among the known embed paths or derived from a
    /// recognized platform link.
    Url(String),
    /// Procedural placeholder; only produced for video posts with no
    /// concrete thumbnail anywhere.
    Generated(SyntheticThumb),
}

/// Classifies one post. Pure and total: no I/O, never fails.
pub fn classify(post: &PostRecord) -> MediaInfo {
    let images = collect_images(post);
    let is_video = is_video(post);

    let thumbnail = if is_video {
        match find_thumbnail_url(post) {
            Some(url) => Thumbnail::Url(url),
            None => Thumbnail::Generated(synthesize_placeholder(post)),
        }
    } else {
        Thumbnail::None
    };

    MediaInfo {
        images,
        is_video,
        thumbnail,
    }
}

/// Where a probe path starts: the post's `embed` view or its raw
/// `record`.
#[derive(Debug, Clone, Copy)]
enum Root {
    Embed,
    Record,
}

fn root_value(post: &PostRecord, root: Root) -> Option<&Value> {
    match root {
        Root::Embed => post.embed.as_ref(),
        Root::Record => post.record.as_ref(),
    }
}

/// Walks `path` from `value`; numeric segments index into arrays. Any
/// missing or mismatched step yields `None`.
fn value_at<'a>(value: Option<&'a Value>, path: &[&str]) -> Option<&'a Value> {
    let mut current = value?;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn str_at<'a>(post: &'a PostRecord, root: Root, path: &[&str]) -> Option<&'a str> {
    value_at(root_value(post, root), path).and_then(Value::as_str)
}

fn collect_images(post: &PostRecord) -> Vec<String> {
    let Some(Value::Array(entries)) = value_at(post.embed.as_ref(), &["images"]) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| entry.get("fullsize"))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Video detection
// ---------------------------------------------------------------------------

type Signal = fn(&PostRecord) -> bool;

/// The fixed battery of video signals. Any single match marks the post
/// as video; there is no priority among them. Each entry is named so it
/// can be tested in isolation and surfaced in the detail pane.
pub(crate) const VIDEO_SIGNALS: &[(&str, Signal)] = &[
    ("media-type", media_type_is_video),
    ("mime-type", mime_type_mentions_video),
    ("video-field", video_field_present),
    ("external-url", external_url_looks_like_video),
    ("media-keys", media_keys_mention_video),
    ("post-text", text_mentions_video),
    ("embed-json", embed_json_mentions_video),
];

pub fn is_video(post: &PostRecord) -> bool {
    VIDEO_SIGNALS.iter().any(|(_, signal)| signal(post))
}

/// Name of the first matching signal, for display only; detection itself
/// is order-independent.
pub fn detected_video_signal(post: &PostRecord) -> Option<&'static str> {
    VIDEO_SIGNALS
        .iter()
        .find(|(_, signal)| signal(post))
        .map(|(name, _)| *name)
}

const MEDIA_TYPE_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["media", "type"]),
    (Root::Embed, &["external", "type"]),
    (Root::Embed, &["record", "value", "embed", "media", "type"]),
    (Root::Record, &["embed", "media", "type"]),
    (Root::Record, &["embed", "record", "embed", "media", "type"]),
];

const MIME_TYPE_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["media", "mimeType"]),
    (Root::Record, &["embed", "media", "mimeType"]),
    (Root::Embed, &["record", "value", "embed", "media", "mimeType"]),
];

const VIDEO_FIELD_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["media", "video"]),
    (Root::Record, &["embed", "media", "video"]),
    (Root::Embed, &["record", "value", "embed", "media", "video"]),
];

const EXTERNAL_LINK_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["external", "uri"]),
    (Root::Record, &["external", "uri"]),
    (Root::Embed, &["record", "external", "uri"]),
];

const MEDIA_OBJECT_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["media"]),
    (Root::Record, &["embed", "media"]),
];

const VIDEO_URL_MARKERS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", ".mp4", "video"];

const STRUCTURE_MARKERS: &[&str] = &["video", "stream", "duration"];

const TEXT_MARKERS: &[&str] = &["video", "동영상", "영상", "🎬"];

fn media_type_is_video(post: &PostRecord) -> bool {
    MEDIA_TYPE_PATHS
        .iter()
        .any(|(root, path)| str_at(post, *root, path) == Some("video"))
}

fn mime_type_mentions_video(post: &PostRecord) -> bool {
    MIME_TYPE_PATHS
        .iter()
        .filter_map(|(root, path)| str_at(post, *root, path))
        .any(|mime| mime.contains("video"))
}

// Presence of the field is the signal, whatever its value; some clients
// attach a `video` sub-object, others just a null marker.
fn video_field_present(post: &PostRecord) -> bool {
    VIDEO_FIELD_PATHS
        .iter()
        .any(|(root, path)| value_at(root_value(post, *root), path).is_some())
}

fn external_url_looks_like_video(post: &PostRecord) -> bool {
    external_link_urls(post)
        .iter()
        .any(|url| VIDEO_URL_MARKERS.iter().any(|marker| url.contains(marker)))
}

fn media_keys_mention_video(post: &PostRecord) -> bool {
    MEDIA_OBJECT_PATHS
        .iter()
        .filter_map(|(root, path)| value_at(root_value(post, *root), path))
        .filter_map(Value::as_object)
        .any(|media| {
            media
                .keys()
                .any(|key| STRUCTURE_MARKERS.iter().any(|marker| key.contains(marker)))
        })
}

fn text_mentions_video(post: &PostRecord) -> bool {
    let text = post.record_text();
    !text.is_empty() && TEXT_MARKERS.iter().any(|marker| text.contains(marker))
}

// Coarse catch-all over the serialized embed. Known to false-positive on
// unrelated fields (a caption schema with `duration`, say); kept because
// it catches shapes none of the targeted signals know about.
fn embed_json_mentions_video(post: &PostRecord) -> bool {
    let Some(embed) = post.embed.as_ref() else {
        return false;
    };
    match serde_json::to_string(embed) {
        Ok(serialized) => STRUCTURE_MARKERS
            .iter()
            .any(|marker| serialized.contains(marker)),
        // A failed serialization disables this signal only, never the
        // classification of the post.
        Err(_) => false,
    }
}

fn external_link_urls(post: &PostRecord) -> Vec<&str> {
    EXTERNAL_LINK_PATHS
        .iter()
        .filter_map(|(root, path)| str_at(post, *root, path))
        .collect()
}

// ---------------------------------------------------------------------------
// Thumbnail extraction
// ---------------------------------------------------------------------------

/// Plausible thumbnail locations, in priority order. Direct media and
/// external-card fields first, nested-record shapes next, first-image
/// fallbacks, then OpenGraph and card images.
const THUMBNAIL_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["media", "thumbnail"]),
    (Root::Embed, &["media", "thumbnailUrl"]),
    (Root::Embed, &["media", "image"]),
    (Root::Embed, &["media", "thumb"]),
    (Root::Embed, &["media", "thumbnails", "0"]),
    (Root::Embed, &["media", "poster"]),
    (Root::Embed, &["external", "thumbnail"]),
    (Root::Embed, &["external", "thumbnailUrl"]),
    (Root::Embed, &["external", "image"]),
    (Root::Embed, &["external", "thumb"]),
    (Root::Embed, &["external", "thumbnails", "0"]),
    (Root::Embed, &["external", "poster"]),
    (Root::Embed, &["record", "value", "embed", "media", "thumbnail"]),
    (Root::Embed, &["record", "value", "embed", "external", "thumbnail"]),
    (Root::Record, &["embed", "media", "thumbnail"]),
    (Root::Record, &["embed", "external", "thumbnail"]),
    (Root::Embed, &["images", "0", "fullsize"]),
    (Root::Embed, &["images", "0", "thumb"]),
    (Root::Record, &["embed", "images", "0", "fullsize"]),
    (Root::Embed, &["external", "og", "image"]),
    (Root::Record, &["external", "og", "image"]),
    (Root::Embed, &["card", "image"]),
    (Root::Record, &["card", "image"]),
];

/// URLs checked for platform thumbnail derivation; a superset of the
/// external link paths, adding media hrefs.
const VIDEO_SOURCE_PATHS: &[(Root, &[&str])] = &[
    (Root::Embed, &["external", "uri"]),
    (Root::Record, &["external", "uri"]),
    (Root::Embed, &["record", "external", "uri"]),
    (Root::Embed, &["media", "href"]),
    (Root::Record, &["embed", "media", "href"]),
];

fn find_thumbnail_url(post: &PostRecord) -> Option<String> {
    let direct = THUMBNAIL_PATHS
        .iter()
        .filter_map(|(root, path)| str_at(post, *root, path))
        .find(|url| !url.is_empty())
        .map(str::to_string);
    direct.or_else(|| derive_platform_thumbnail(post))
}

/// Platform-specific derivation. Only YouTube has a predictable
/// thumbnail URL scheme; the other recognized platforms contribute an
/// icon but no image.
fn derive_platform_thumbnail(post: &PostRecord) -> Option<String> {
    VIDEO_SOURCE_PATHS
        .iter()
        .filter_map(|(root, path)| str_at(post, *root, path))
        .find_map(|url| {
            youtube_video_id(url).map(|id| format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"))
        })
}

fn youtube_video_id(url: &str) -> Option<&str> {
    if url.contains("youtube.com/watch?v=") {
        let (_, rest) = url.split_once("v=")?;
        let id = rest.split('&').next().unwrap_or(rest);
        return (!id.is_empty()).then_some(id);
    }
    if let Some((_, rest)) = url.split_once("youtu.be/") {
        let id = rest.split('?').next().unwrap_or(rest);
        return (!id.is_empty()).then_some(id);
    }
    None
}

fn synthesize_placeholder(post: &PostRecord) -> SyntheticThumb {
    let id = post.local_id();
    let seed = if id.is_empty() { post.record_text() } else { id };
    thumb::synthesize(seed, Platform::detect(external_link_urls(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsky::PostRecord;
    use serde_json::json;

    fn post_with_embed(embed: Value) -> PostRecord {
        PostRecord {
            uri: "at://did:plc:abc/app.bsky.feed.post/abc123".into(),
            embed: Some(embed),
            ..PostRecord::default()
        }
    }

    fn post_with_record(record: Value) -> PostRecord {
        PostRecord {
            uri: "at://did:plc:abc/app.bsky.feed.post/abc123".into(),
            record: Some(record),
            ..PostRecord::default()
        }
    }

    #[test]
    fn bare_post_has_no_media() {
        let info = classify(&PostRecord {
            text: "plain words".into(),
            ..PostRecord::default()
        });
        assert_eq!(
            info,
            MediaInfo {
                images: vec![],
                is_video: false,
                thumbnail: Thumbnail::None,
            }
        );
        assert!(!info.has_media());
    }

    #[test]
    fn collects_fullsize_images_in_order() {
        let info = classify(&post_with_embed(json!({
            "images": [
                { "fullsize": "https://cdn.test/1.jpg", "thumb": "t1" },
                { "alt": "no fullsize here" },
                { "fullsize": "https://cdn.test/2.jpg" }
            ]
        })));
        assert_eq!(
            info.images,
            vec!["https://cdn.test/1.jpg", "https://cdn.test/2.jpg"]
        );
        assert!(info.has_media());
        // Image-only posts never get a thumbnail.
        assert!(!info.is_video);
        assert_eq!(info.thumbnail, Thumbnail::None);
    }

    #[test]
    fn explicit_media_type_detected_at_every_depth() {
        let embeds = [
            json!({ "media": { "type": "video" } }),
            json!({ "external": { "type": "video" } }),
            json!({ "record": { "value": { "embed": { "media": { "type": "video" } } } } }),
        ];
        for embed in embeds {
            assert!(is_video(&post_with_embed(embed.clone())), "{embed}");
        }

        let records = [
            json!({ "embed": { "media": { "type": "video" } } }),
            json!({ "embed": { "record": { "embed": { "media": { "type": "video" } } } } }),
        ];
        for record in records {
            assert!(is_video(&post_with_record(record.clone())), "{record}");
        }
    }

    #[test]
    fn mime_type_substring_counts() {
        assert!(is_video(&post_with_embed(
            json!({ "media": { "mimeType": "video/mp4" } })
        )));
        assert!(!is_video(&post_with_record(
            json!({ "embed": { "media": { "mimeType": "image/png" } } })
        )));
    }

    #[test]
    fn video_field_presence_counts_even_when_null() {
        assert!(is_video(&post_with_embed(
            json!({ "media": { "video": null } })
        )));
        assert!(is_video(&post_with_record(
            json!({ "embed": { "media": { "video": { "cid": "x" } } } })
        )));
    }

    #[test]
    fn external_url_patterns_count() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://vimeo.com/12345",
            "https://cdn.test/clip.mp4",
            "https://example.com/video/99",
        ] {
            assert!(
                is_video(&post_with_embed(json!({ "external": { "uri": url } }))),
                "{url}"
            );
        }
        assert!(!is_video(&post_with_embed(
            json!({ "external": { "uri": "https://example.com/article" } })
        )));
    }

    #[test]
    fn media_key_names_count() {
        assert!(is_video(&post_with_embed(
            json!({ "media": { "durationMs": 1200 } })
        )));
        assert!(is_video(&post_with_record(
            json!({ "embed": { "media": { "streamUrl": "x" } } })
        )));
    }

    #[test]
    fn text_keywords_and_emoji_count() {
        let post = PostRecord {
            uri: "at://did:plc:abc/app.bsky.feed.post/abc123".into(),
            text: "check this 🎬".into(),
            ..PostRecord::default()
        };
        assert_eq!(detected_video_signal(&post), Some("post-text"));

        let post = PostRecord {
            record: Some(json!({ "text": "새 영상 올렸어요" })),
            ..PostRecord::default()
        };
        assert!(is_video(&post));
    }

    #[test]
    fn serialized_embed_is_a_coarse_catch_all() {
        // Documented false positive: any `duration`-ish key anywhere in
        // the embed counts, related to video or not.
        assert!(is_video(&post_with_embed(
            json!({ "widget": { "animationDuration": "2s" } })
        )));
        assert!(!is_video(&post_with_embed(json!({ "alt": "a picture" }))));
    }

    #[test]
    fn signals_compose_with_plain_or() {
        // Only the text signal fires; no embed at all.
        let post = PostRecord {
            text: "video incoming".into(),
            ..PostRecord::default()
        };
        assert!(is_video(&post));
        assert_eq!(VIDEO_SIGNALS.len(), 7);
    }

    #[test]
    fn concrete_thumbnail_wins_over_synthesis() {
        let info = classify(&post_with_embed(json!({
            "media": { "type": "video", "thumbnail": "https://cdn.test/poster.jpg" }
        })));
        assert!(info.is_video);
        assert_eq!(
            info.thumbnail,
            Thumbnail::Url("https://cdn.test/poster.jpg".into())
        );
    }

    #[test]
    fn thumbnail_paths_probe_in_priority_order() {
        // `media.thumbnail` outranks `card.image` even though both hit.
        let info = classify(&post_with_embed(json!({
            "media": { "type": "video", "thumbnail": "https://cdn.test/a.jpg" },
            "card": { "image": "https://cdn.test/b.jpg" }
        })));
        assert_eq!(
            info.thumbnail,
            Thumbnail::Url("https://cdn.test/a.jpg".into())
        );

        let info = classify(&post_with_embed(json!({
            "media": { "type": "video" },
            "card": { "image": "https://cdn.test/b.jpg" }
        })));
        assert_eq!(
            info.thumbnail,
            Thumbnail::Url("https://cdn.test/b.jpg".into())
        );
    }

    #[test]
    fn empty_thumbnail_values_are_skipped() {
        let info = classify(&post_with_embed(json!({
            "media": { "type": "video", "thumbnail": "" },
            "external": { "thumb": "https://cdn.test/real.jpg" }
        })));
        assert_eq!(
            info.thumbnail,
            Thumbnail::Url("https://cdn.test/real.jpg".into())
        );
    }

    #[test]
    fn youtube_watch_urls_derive_a_thumbnail() {
        let info = classify(&post_with_embed(json!({
            "external": { "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10" }
        })));
        assert!(info.is_video);
        assert_eq!(
            info.thumbnail,
            Thumbnail::Url("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg".into())
        );
    }

    #[test]
    fn youtube_short_urls_derive_a_thumbnail() {
        assert_eq!(
            youtube_video_id("https://youtu.be/abc123XYZ?si=tracker"),
            Some("abc123XYZ")
        );
        assert_eq!(youtube_video_id("https://youtu.be/"), None);
        assert_eq!(youtube_video_id("https://vimeo.com/99"), None);
    }

    #[test]
    fn vimeo_links_synthesize_with_film_icon() {
        // No derivable thumbnail for Vimeo: placeholder with its glyph.
        let info = classify(&post_with_embed(json!({
            "external": { "uri": "https://vimeo.com/12345" }
        })));
        match info.thumbnail {
            Thumbnail::Generated(thumb) => assert_eq!(thumb.icon, Platform::Vimeo.glyph()),
            other => panic!("expected generated thumbnail, got {other:?}"),
        }
    }

    #[test]
    fn synthesized_thumbnail_seeds_from_local_id() {
        let post = PostRecord {
            uri: "at://did:plc:abc/app.bsky.feed.post/abc123".into(),
            text: "check this 🎬".into(),
            ..PostRecord::default()
        };
        let info = classify(&post);
        assert!(info.is_video);
        let expected = thumb::synthesize("abc123", None);
        assert_eq!(info.thumbnail, Thumbnail::Generated(expected));

        // Identical URI suffix on a separate call: identical thumbnail.
        let again = classify(&post.clone());
        assert_eq!(info.thumbnail, again.thumbnail);
    }

    #[test]
    fn synthesized_thumbnail_falls_back_to_text_seed() {
        let post = PostRecord {
            text: "video only, no uri".into(),
            ..PostRecord::default()
        };
        let info = classify(&post);
        let expected = thumb::synthesize("video only, no uri", None);
        assert_eq!(info.thumbnail, Thumbnail::Generated(expected));
    }

    #[test]
    fn malformed_embed_shapes_degrade_silently() {
        for embed in [
            json!("just a string"),
            json!(42),
            json!([1, 2, 3]),
            json!({ "images": "not an array" }),
            json!({ "media": [ "not", "an", "object" ] }),
        ] {
            let info = classify(&post_with_embed(embed.clone()));
            assert!(info.images.is_empty(), "{embed}");
        }
    }
}
