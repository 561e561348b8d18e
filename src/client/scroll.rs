/// Rows from the bottom past which the view counts as scrolled away.
pub const DETACH_THRESHOLD: u16 = 3;

/// Tracks the transcript viewport. Follows new output while pinned to the
/// bottom; scrolling up unpins it until the user returns to the bottom.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    offset: u16,
    content_height: u16,
    viewport_height: u16,
    pinned: bool,
    threshold: u16,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new(DETACH_THRESHOLD)
    }
}

impl ScrollTracker {
    pub fn new(threshold: u16) -> Self {
        Self {
            offset: 0,
            content_height: 0,
            viewport_height: 0,
            pinned: true,
            threshold,
        }
    }

    pub fn update_layout(&mut self, content_height: u16, viewport_height: u16) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        if self.pinned {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.offset = self.offset.saturating_sub(rows);
        self.pinned = self.offset >= self.max_offset();
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset());
        self.pinned = self.offset >= self.max_offset();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.pinned = true;
        self.offset = self.max_offset();
    }

    /// Whether the "jump to bottom" affordance should show.
    pub fn is_detached(&self) -> bool {
        let below = self.content_height.saturating_sub(self.offset);
        below > self.viewport_height.saturating_add(self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_view_follows_new_content() {
        let mut scroll = ScrollTracker::new(3);
        scroll.update_layout(10, 20);
        assert_eq!(scroll.offset(), 0);

        scroll.update_layout(50, 20);
        assert_eq!(scroll.offset(), 30);
        assert!(!scroll.is_detached());
    }

    #[test]
    fn scrolling_up_stops_following() {
        let mut scroll = ScrollTracker::new(3);
        scroll.update_layout(50, 20);
        scroll.scroll_up(10);
        assert!(!scroll.is_pinned());
        assert_eq!(scroll.offset(), 20);

        scroll.update_layout(60, 20);
        assert_eq!(scroll.offset(), 20);
        assert!(scroll.is_detached());

        scroll.scroll_to_bottom();
        assert_eq!(scroll.offset(), 40);
        assert!(!scroll.is_detached());
    }

    #[test]
    fn small_scroll_stays_within_threshold() {
        let mut scroll = ScrollTracker::new(3);
        scroll.update_layout(50, 20);
        scroll.scroll_up(2);
        assert!(!scroll.is_detached());
        scroll.scroll_up(2);
        assert!(scroll.is_detached());
    }

    #[test]
    fn scrolling_back_down_repins() {
        let mut scroll = ScrollTracker::new(3);
        scroll.update_layout(50, 20);
        scroll.scroll_up(5);
        scroll.scroll_down(100);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.offset(), 30);
    }
}
