//! Transient, non-blocking notices (the terminal's toast)

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const NOTICE_TTL: Duration = Duration::from_secs(4);
const MAX_NOTICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub raised_at: Instant,
}

#[derive(Debug, Default)]
pub struct Notices {
    items: VecDeque<Notice>,
}

impl Notices {
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text.into());
    }

    fn push(&mut self, level: NoticeLevel, text: String) {
        if self.items.len() == MAX_NOTICES {
            self.items.pop_front();
        }
        self.items.push_back(Notice {
            level,
            text,
            raised_at: Instant::now(),
        });
    }

    /// Drop notices older than [`NOTICE_TTL`] as of `now`.
    pub fn expire(&mut self, now: Instant) {
        self.items
            .retain(|n| now.saturating_duration_since(n.raised_at) < NOTICE_TTL);
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent() {
        let mut notices = Notices::default();
        for i in 0..5 {
            notices.info(format!("n{i}"));
        }
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices.latest().unwrap().text, "n4");
    }

    #[test]
    fn test_expire_drops_old_notices() {
        let mut notices = Notices::default();
        notices.error("Connection failed");
        notices.expire(Instant::now() + NOTICE_TTL + Duration::from_millis(1));
        assert!(notices.is_empty());
    }

    #[test]
    fn test_expire_keeps_fresh_notices() {
        let mut notices = Notices::default();
        notices.info("Attached report.pdf");
        notices.expire(Instant::now());
        assert_eq!(notices.len(), 1);
    }
}
