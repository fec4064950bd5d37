use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use regex::Regex;
use tracing::{debug, warn};

/// Bound on distinct senders tracked at once; least-recently-active senders
/// fall out first, which resets their window (acceptable: the guard bounds
/// abuse within a run, not across evictions).
const MAX_TRACKED_SENDERS: usize = 4096;

/// Whole-string acknowledgements that never warrant an auto-reply.
const SKIP_REPLY_PATTERNS: &[&str] = &[
    "ok", "okay", "k", "yes", "no", "thanks", "thank you", "thx", "ty", "👍", "👌", "🙏", "sim",
    "obrigado", "obrigada",
];

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Sliding rate window length.
    pub window_secs: i64,
    /// Accepted events allowed inside one window per sender.
    pub max_per_window: usize,
    /// Normalized bodies remembered per sender for repeat suppression.
    pub history_len: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_per_window: 5,
            history_len: 10,
        }
    }
}

/// Result of running one inbound message through the guard.
///
/// `admitted == false` is a hard gate: nothing gets persisted. The other
/// flags persist the message but suppress the auto-reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardVerdict {
    pub admitted: bool,
    /// Body matches one of the sender's last N messages.
    pub repeat: bool,
    /// Name of the matched spam pattern, if any.
    pub spam: Option<&'static str>,
    /// Short acknowledgement text ("ok", "thanks", …).
    pub skip_reply: bool,
}

impl GuardVerdict {
    pub fn rejected() -> Self {
        Self {
            admitted: false,
            repeat: false,
            spam: None,
            skip_reply: false,
        }
    }

    /// Whether the policy engine should be bypassed for this message.
    pub fn suppresses_reply(&self) -> bool {
        self.repeat || self.spam.is_some() || self.skip_reply
    }
}

struct SpamPattern {
    name: &'static str,
    regex: Regex,
}

#[derive(Default)]
struct SenderState {
    /// Timestamps of accepted events inside the current window.
    window: VecDeque<DateTime<Utc>>,
    /// Last N normalized bodies, newest at the back.
    history: VecDeque<String>,
}

/// Per-sender throttling plus repeat/spam suppression, applied before any
/// persistence. State is ephemeral and rebuilt from scratch on restart.
pub struct IntakeGuard {
    config: GuardConfig,
    senders: Mutex<LruCache<String, SenderState>>,
    patterns: Vec<SpamPattern>,
}

impl IntakeGuard {
    pub fn new(config: GuardConfig) -> Self {
        let pattern_defs: Vec<(&'static str, &str)> = vec![
            (
                "raw_url_flood",
                r"(?i)\bhttps?://\S{64,}",
            ),
            (
                "spam_keywords",
                r"(?i)\b(?:free money|click here|you(?:'ve| have) won|lottery|casino bonus|crypto giveaway|limited time offer|work from home and earn)\b",
            ),
        ];

        let patterns = pattern_defs
            .into_iter()
            .filter_map(|(name, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some(SpamPattern { name, regex }),
                Err(e) => {
                    warn!("failed to compile spam pattern '{}': {}", name, e);
                    None
                }
            })
            .collect();

        Self {
            config,
            senders: Mutex::new(LruCache::new(
                NonZeroUsize::new(MAX_TRACKED_SENDERS).expect("MAX_TRACKED_SENDERS must be > 0"),
            )),
            patterns,
        }
    }

    /// Run every check for one inbound message. Records the event in the
    /// sender's window and history only when admitted.
    pub fn assess(&self, sender: &str, body: &str, now: DateTime<Utc>) -> GuardVerdict {
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let state = senders.get_or_insert_mut(sender.to_string(), SenderState::default);

        // Rate limit first: a rejected event is never persisted and does not
        // extend the window.
        let cutoff = now - Duration::seconds(self.config.window_secs);
        while state.window.front().is_some_and(|t| *t < cutoff) {
            state.window.pop_front();
        }
        if state.window.len() >= self.config.max_per_window {
            debug!("rate limit: rejecting event from {}", sender);
            return GuardVerdict::rejected();
        }
        state.window.push_back(now);

        let normalized = normalize_body(body);
        let repeat = state.history.contains(&normalized);
        state.history.push_back(normalized);
        if state.history.len() > self.config.history_len {
            state.history.pop_front();
        }
        drop(senders);

        let spam = self.spam_reason(body);
        // Evaluated after spam/dedup, before the policy engine
        let skip_reply = is_skip_reply(body);

        if repeat {
            debug!("repeat content from {}, reply suppressed", sender);
        }
        if let Some(name) = spam {
            debug!("spam pattern '{}' matched for {}", name, sender);
        }

        GuardVerdict {
            admitted: true,
            repeat,
            spam,
            skip_reply,
        }
    }

    /// Stateless content checks: repetition runs, overlong raw URLs, and the
    /// keyword denylist. Flagged content is persisted but never replied to.
    pub fn spam_reason(&self, body: &str) -> Option<&'static str> {
        if has_repetition_run(body, 10) {
            return Some("char_repetition");
        }
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(body))
            .map(|p| p.name)
    }
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

/// Case-insensitive whole-string match against the acknowledgement set.
pub fn is_skip_reply(body: &str) -> bool {
    let trimmed = body.trim().to_lowercase();
    SKIP_REPLY_PATTERNS.iter().any(|p| *p == trimmed)
}

/// Collapse whitespace and case so trivial reformatting still counts as a
/// repeat.
fn normalize_body(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The regex crate has no backreferences, so repetition runs are counted
/// directly.
fn has_repetition_run(body: &str, run_len: usize) -> bool {
    let mut last: Option<char> = None;
    let mut run = 0usize;
    for c in body.chars() {
        if Some(c) == last {
            run += 1;
            if run >= run_len {
                return true;
            }
        } else {
            last = Some(c);
            run = 1;
        }
    }
    false
}
