// Time block lookup: which block is running, or which one comes next.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::TimeBlock;

pub const DEFAULT_FOCUS: &str = "Activity";
pub const DEFAULT_PREVIEW_FOCUS: &str = "Next Activity";

/// A block placed on the absolute timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockWindow<'a> {
    pub block: &'a TimeBlock,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<'a> BlockWindow<'a> {
    pub fn place(block: &'a TimeBlock, session_start: DateTime<Tz>) -> Self {
        let start = session_start + Duration::minutes(i64::from(block.start_offset_minutes));
        let end = start + Duration::minutes(i64::from(block.duration_minutes));
        BlockWindow { block, start, end }
    }

    pub fn contains(&self, t: DateTime<Tz>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Teaser for the block after the current instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPreview {
    pub block_focus: String,
    pub starts_in_seconds: i64,
}

impl BlockPreview {
    fn of(window: &BlockWindow<'_>, eval: DateTime<Tz>) -> Self {
        BlockPreview {
            block_focus: window
                .block
                .focus_label()
                .unwrap_or(DEFAULT_PREVIEW_FOCUS)
                .to_string(),
            starts_in_seconds: (window.start - eval).num_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockPosition<'a> {
    /// `eval` lies inside a block. `following` previews the next block in
    /// schedule order, if there is one.
    Current {
        window: BlockWindow<'a>,
        following: Option<BlockPreview>,
    },
    /// Between blocks (or before the first): the first block that has not
    /// started yet.
    Upcoming {
        block: &'a TimeBlock,
        preview: BlockPreview,
    },
    /// Session running but past its last block.
    Idle,
}

impl BlockPosition<'_> {
    /// Status line for the in-progress session at block level.
    pub fn status_message(&self) -> String {
        match self {
            BlockPosition::Current { window, .. } => {
                window.block.focus_label().unwrap_or(DEFAULT_FOCUS).to_string()
            }
            BlockPosition::Upcoming { block, .. } => {
                format!("Next: {}", block.focus_label().unwrap_or(DEFAULT_FOCUS))
            }
            BlockPosition::Idle => "Session active, no current block.".to_string(),
        }
    }
}

/// Scan `blocks` (already in schedule order) for the one containing `eval`.
///
/// The first containing block wins. If a block that starts after `eval` is
/// reached before any match, it becomes the upcoming preview and scanning
/// stops there.
pub fn locate_block<'a>(
    blocks: &[&'a TimeBlock],
    session_start: DateTime<Tz>,
    eval: DateTime<Tz>,
) -> BlockPosition<'a> {
    for (i, &block) in blocks.iter().enumerate() {
        let window = BlockWindow::place(block, session_start);

        if window.contains(eval) {
            let following = blocks
                .get(i + 1)
                .map(|next| BlockPreview::of(&BlockWindow::place(next, session_start), eval));
            return BlockPosition::Current { window, following };
        }

        if eval < window.start {
            return BlockPosition::Upcoming {
                block,
                preview: BlockPreview::of(&window, eval),
            };
        }
    }

    BlockPosition::Idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::clock::DEFAULT_TIMEZONE;
    use crate::model::BlockId;

    fn block(id: BlockId, offset: u32, duration: u32, focus: Option<&str>) -> TimeBlock {
        TimeBlock {
            id,
            start_offset_minutes: offset,
            duration_minutes: duration,
            court_count: 2,
            rotation_interval_minutes: None,
            focus: focus.map(str::to_string),
            activities: vec![],
            manual_assignments: vec![],
        }
    }

    fn start() -> DateTime<Tz> {
        DEFAULT_TIMEZONE
            .with_ymd_and_hms(2025, 1, 1, 16, 0, 0)
            .unwrap()
    }

    fn at(minutes: i64) -> DateTime<Tz> {
        start() + Duration::minutes(minutes)
    }

    #[test]
    fn finds_current_block_and_following_preview() {
        let warmup = block(1, 0, 15, Some("Warm-up"));
        let drives = block(2, 15, 30, Some("Drives"));
        let blocks = vec![&warmup, &drives];

        match locate_block(&blocks, start(), at(5)) {
            BlockPosition::Current { window, following } => {
                assert_eq!(window.block.id, 1);
                assert_eq!(window.start, start());
                assert_eq!(window.end, at(15));
                let preview = following.expect("drives follows warm-up");
                assert_eq!(preview.block_focus, "Drives");
                assert_eq!(preview.starts_in_seconds, 600);
            }
            other => panic!("expected current block, got {other:?}"),
        }
    }

    #[test]
    fn block_end_is_exclusive() {
        let warmup = block(1, 0, 15, None);
        let drives = block(2, 15, 30, None);
        let blocks = vec![&warmup, &drives];

        match locate_block(&blocks, start(), at(15)) {
            BlockPosition::Current { window, following } => {
                assert_eq!(window.block.id, 2);
                assert!(following.is_none());
            }
            other => panic!("expected block 2, got {other:?}"),
        }
    }

    #[test]
    fn gap_before_block_reports_upcoming() {
        let later = block(1, 30, 45, Some("Rotation drills"));
        let last = block(2, 80, 10, Some("Cool-down"));
        let blocks = vec![&later, &last];

        let position = locate_block(&blocks, start(), at(10));
        assert_eq!(position.status_message(), "Next: Rotation drills");
        match position {
            BlockPosition::Upcoming { block, preview } => {
                assert_eq!(block.id, 1);
                assert_eq!(preview.block_focus, "Rotation drills");
                assert_eq!(preview.starts_in_seconds, 20 * 60);
            }
            other => panic!("expected upcoming, got {other:?}"),
        }
    }

    #[test]
    fn gap_between_blocks_previews_next_only() {
        let first = block(1, 0, 10, None);
        let second = block(2, 20, 10, None);
        let third = block(3, 40, 10, None);
        let blocks = vec![&first, &second, &third];

        match locate_block(&blocks, start(), at(12)) {
            BlockPosition::Upcoming { block, preview } => {
                assert_eq!(block.id, 2);
                assert_eq!(preview.block_focus, DEFAULT_PREVIEW_FOCUS);
            }
            other => panic!("expected upcoming block 2, got {other:?}"),
        }
    }

    #[test]
    fn after_last_block_is_idle() {
        let only = block(1, 0, 30, None);
        let blocks = vec![&only];
        let position = locate_block(&blocks, start(), at(45));
        assert_eq!(position, BlockPosition::Idle);
        assert_eq!(position.status_message(), "Session active, no current block.");
    }

    #[test]
    fn no_blocks_is_idle() {
        assert_eq!(locate_block(&[], start(), at(1)), BlockPosition::Idle);
    }

    #[test]
    fn current_status_defaults_focus() {
        let unnamed = block(1, 0, 30, Some(""));
        let blocks = vec![&unnamed];
        assert_eq!(
            locate_block(&blocks, start(), at(1)).status_message(),
            DEFAULT_FOCUS
        );
    }
}
