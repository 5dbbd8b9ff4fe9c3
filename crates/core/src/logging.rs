//! Engine-wide logging configuration.
//!
//! One process-wide [`LogConfig`] controls a global level plus a level per
//! engine subsystem. Messages are built lazily through a closure so a
//! disabled category costs one atomic load, and each category is
//! rate-limited so a script stuck in a tight loop cannot flood stderr at
//! interpreter speed.
//!
//! ```rust
//! use vga_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Script, LogLevel::Trace, || {
//!     format!("opcode {:#04x} at offset {:#06x}", 0x0C, 0x0120)
//! });
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a log level from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Engine subsystem a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Bytecode execution (opcode traces, suspensions, resumes)
    Script,
    /// Sprite table changes
    Sprite,
    /// Timer queue scheduling and pumping
    Timer,
    /// Draw pipeline (path selection, clipping, palette)
    Draw,
    /// Zone loading and parsing
    Zone,
    /// Delegated sound side effects
    Sound,
}

const CATEGORIES: usize = 6;

impl LogCategory {
    fn index(self) -> usize {
        match self {
            LogCategory::Script => 0,
            LogCategory::Sprite => 1,
            LogCategory::Timer => 2,
            LogCategory::Draw => 3,
            LogCategory::Zone => 4,
            LogCategory::Sound => 5,
        }
    }
}

/// Fixed-window rate limiter, one window per category.
struct RateLimiter {
    max_per_second: usize,
    windows: Mutex<[Window; CATEGORIES]>,
}

#[derive(Clone, Copy)]
struct Window {
    started: Option<Instant>,
    emitted: usize,
    dropped: usize,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second,
            windows: Mutex::new(
                [Window {
                    started: None,
                    emitted: 0,
                    dropped: 0,
                }; CATEGORIES],
            ),
        }
    }

    /// Whether a message may be emitted now, plus the count of messages
    /// dropped since the last one that got through.
    fn allow(&self, category: LogCategory) -> (bool, usize) {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        let w = &mut windows[category.index()];

        let expired = match w.started {
            None => true,
            Some(t) => now.duration_since(t) >= Duration::from_secs(1),
        };
        if expired {
            w.started = Some(now);
            w.emitted = 0;
        }
        if w.emitted < self.max_per_second {
            w.emitted += 1;
            let dropped = w.dropped;
            w.dropped = 0;
            (true, dropped)
        } else {
            w.dropped += 1;
            (false, 0)
        }
    }
}

/// Process-wide logging configuration.
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORIES],
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        const OFF: AtomicU8 = AtomicU8::new(LogLevel::Off as u8);
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: [OFF; CATEGORIES],
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// The global singleton instance.
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the global level, used by categories without a specific level.
    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set the level for one category, overriding the global level.
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category logs at its own level when set, otherwise at the global
    /// level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all levels to Off.
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for level in &self.category_levels {
            level.store(LogLevel::Off as u8, Ordering::Relaxed);
        }
    }
}

/// Log a message for `category` at `level`.
///
/// The closure runs only when the category/level combination is enabled
/// and the rate limiter admits the message, so formatting is free on the
/// hot path. When earlier messages were dropped by the limiter, the next
/// admitted message is preceded by a one-line drop count.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }
    let (allowed, dropped) = config.rate_limiter.allow(category);
    if !allowed {
        return;
    }
    if dropped > 0 {
        eprintln!("[{:?}] ({} message(s) rate-limited)", category, dropped);
    }
    eprintln!("[{:?}] {}", category, message_fn());
}
