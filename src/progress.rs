use std::io::{self, Write};
use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-transfer progress line, throttled to at most one update per second.
/// Console output only; has no effect on transfer correctness.
pub struct Progress {
    started: Instant,
    last_report: Instant,
    bytes: u64,
    total: Option<u64>,
    reported: bool,
}

impl Progress {
    pub fn new(total: Option<u64>) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_report: now,
            bytes: 0,
            total,
            reported: false,
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn advance(&mut self, len: u64) {
        self.bytes += len;
        let now = Instant::now();
        if now.duration_since(self.last_report) < REPORT_INTERVAL {
            return;
        }
        self.last_report = now;
        self.reported = true;
        let line = render_line(self.bytes, self.total, now.duration_since(self.started));
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{line}    \r");
        let _ = stderr.flush();
    }

    /// Terminates the carriage-return line, if one was ever printed.
    pub fn finish(&self) {
        if self.reported {
            let _ = writeln!(io::stderr());
        }
    }
}

fn render_line(bytes: u64, total: Option<u64>, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let speed_kb = if secs > 0.0 {
        (bytes as f64 / 1024.0 / secs) as u64
    } else {
        0
    };
    let mb = bytes / (1024 * 1024);
    match total {
        Some(total) if total > 0 => {
            let percent = bytes * 100 / total;
            format!("{percent}%, {mb} MB, {speed_kb} KB/s, {} secs", secs as u64)
        }
        _ => format!("{mb} MB, {speed_kb} KB/s, {} secs", secs as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_with_known_total() {
        let line = render_line(50 * 1024 * 1024, Some(100 * 1024 * 1024), Duration::from_secs(10));
        assert_eq!(line, "50%, 50 MB, 5120 KB/s, 10 secs");
    }

    #[test]
    fn line_with_unknown_total() {
        let line = render_line(3 * 1024 * 1024, None, Duration::from_secs(3));
        assert_eq!(line, "3 MB, 1024 KB/s, 3 secs");
    }

    #[test]
    fn advance_accumulates() {
        let mut progress = Progress::new(None);
        progress.advance(10);
        progress.advance(32);
        assert_eq!(progress.bytes(), 42);
    }
}
