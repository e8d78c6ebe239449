//! Logical result table: row construction, column layout, and the
//! tri-state sort cycle. Rendering to the terminal lives in `ui`; this
//! module keeps enough data per row that re-sorting never re-fetches.

use std::cmp::Ordering;

use crate::bsky::PostRecord;
use crate::media::{self, MediaInfo};

/// Display cutoff for the post text cell; longer text gets an ellipsis.
pub const TEXT_PREVIEW_LIMIT: usize = 40;

pub const COLUMN_TITLES: [&str; 4] = ["Profile", "Post", "Likes", "Reposts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Likes,
    Reposts,
}

impl SortColumn {
    pub fn title(self) -> &'static str {
        match self {
            SortColumn::Likes => "Likes",
            SortColumn::Reposts => "Reposts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Descending,
    Ascending,
}

/// One rendered row. Counts are kept numeric alongside the display text
/// so sorting works without parsing cells back.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub post_id: String,
    pub author_name: String,
    pub author_handle: String,
    pub avatar_url: String,
    pub profile_url: String,
    pub post_url: String,
    /// Truncated preview for the table cell.
    pub text: String,
    /// Untruncated text for the detail pane.
    pub full_text: String,
    pub media: MediaInfo,
    /// Name of the video signal that fired, for the detail pane.
    pub video_signal: Option<&'static str>,
    pub likes: i64,
    pub reposts: i64,
}

impl ResultRow {
    pub fn new(post: &PostRecord, media: MediaInfo) -> Self {
        let full_text = post.record_text().to_string();
        ResultRow {
            post_id: post.local_id().to_string(),
            author_name: post.author.name().to_string(),
            author_handle: post.author.handle.clone(),
            avatar_url: post.author.avatar.clone(),
            profile_url: post.profile_url(),
            post_url: post.post_url(),
            text: truncate_preview(&full_text),
            full_text,
            video_signal: media::detected_video_signal(post),
            media,
            likes: post.like_count,
            reposts: post.repost_count,
        }
    }

    fn sort_key(&self, column: SortColumn) -> i64 {
        match column {
            SortColumn::Likes => self.likes,
            SortColumn::Reposts => self.reposts,
        }
    }
}

pub fn truncate_preview(text: &str) -> String {
    if text.chars().count() > TEXT_PREVIEW_LIMIT {
        let cut: String = text.chars().take(TEXT_PREVIEW_LIMIT).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// The rendered result set. Owns the rows in original query order and a
/// separate view order; "unsorted" restores the former, so a sort cycle
/// is a true round trip rather than a reload.
#[derive(Debug, Default)]
pub struct ResultTable {
    original: Vec<ResultRow>,
    view: Vec<ResultRow>,
    sort: Option<(SortColumn, SortDirection)>,
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        ResultTable {
            view: rows.clone(),
            original: rows,
            sort: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Rows in the current view order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.view
    }

    pub fn sort_state(&self) -> Option<(SortColumn, SortDirection)> {
        self.sort
    }

    /// One click on a sortable header. The active column cycles
    /// unsorted → descending → ascending → unsorted; clicking a
    /// different column drops the previous column's state entirely and
    /// starts the new one at descending.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        self.sort = match self.sort {
            Some((active, SortDirection::Descending)) if active == column => {
                Some((column, SortDirection::Ascending))
            }
            Some((active, SortDirection::Ascending)) if active == column => None,
            _ => Some((column, SortDirection::Descending)),
        };
        self.rebuild_view();
    }

    /// Header affordance for a sortable column: neutral, down, or up.
    pub fn sort_indicator(&self, column: SortColumn) -> &'static str {
        match self.sort {
            Some((active, SortDirection::Descending)) if active == column => "↓",
            Some((active, SortDirection::Ascending)) if active == column => "↑",
            _ => "⇅",
        }
    }

    fn rebuild_view(&mut self) {
        self.view = self.original.clone();
        let Some((column, direction)) = self.sort else {
            return;
        };
        // sort_by is stable: equal keys keep their original relative
        // order in both directions.
        self.view
            .sort_by(|a, b| compare_counts(a.sort_key(column), b.sort_key(column), direction));
    }
}

/// Numeric comparator for the sortable count columns.
pub fn compare_counts(a: i64, b: i64, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => a.cmp(&b),
        SortDirection::Descending => b.cmp(&a),
    }
}
