use std::fmt;
use std::time::Duration;

/// Running counters of one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// Number of attempts issued.
    pub sent: u32,
    /// Number of attempts answered by a correlated reply.
    pub received: u32,
    /// Smallest round-trip time seen, `Duration::MAX` until the first reply.
    pub min_time: Duration,
    /// Largest round-trip time seen.
    pub max_time: Duration,
    /// Sum of all round-trip times.
    pub total_time: Duration,
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics {
            sent: 0,
            received: 0,
            min_time: Duration::MAX,
            max_time: Duration::ZERO,
            total_time: Duration::ZERO,
        }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt, whatever its outcome.
    pub fn add_sent(&mut self) {
        self.sent += 1;
    }

    /// Fold the round-trip time of a matched reply.
    pub fn add_reply(&mut self, rtt: Duration) {
        self.received += 1;
        self.total_time += rtt;
        if rtt > self.max_time {
            self.max_time = rtt;
        }
        if rtt < self.min_time {
            self.min_time = rtt;
        }
    }

    /// Build the final record. RTT fields are `None` when nothing came back.
    pub fn report(&self, timed_out: bool) -> PingReport {
        let (min_rtt, max_rtt, avg_rtt) = if self.received == 0 {
            (None, None, None)
        } else {
            (
                Some(self.min_time),
                Some(self.max_time),
                Some(self.total_time / self.received),
            )
        };

        PingReport {
            sent: self.sent,
            received: self.received,
            dropped: self.sent.saturating_sub(self.received),
            min_rtt,
            max_rtt,
            avg_rtt,
            timed_out,
        }
    }
}

/// PingReport is the outcome of one run, handed to the presentation layer.
///
/// When `timed_out` is set the run stopped before issuing every attempt; the
/// counters still hold the partial data but [`fmt::Display`] only prints the
/// timeout notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReport {
    pub sent: u32,
    pub received: u32,
    pub dropped: u32,
    pub min_rtt: Option<Duration>,
    pub max_rtt: Option<Duration>,
    pub avg_rtt: Option<Duration>,
    pub timed_out: bool,
}

impl PingReport {
    /// Fraction of attempts without a reply, 0.0 when nothing was sent.
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.dropped as f64 / self.sent as f64
        }
    }
}

fn fmt_rtt(rtt: Option<Duration>) -> String {
    match rtt {
        Some(d) => format!("{:.3}ms", d.as_secs_f64() * 1000.0),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            return write!(f, "Process timed out");
        }

        writeln!(f, "Pings Sent:\t{}", self.sent)?;
        writeln!(f, "Pings Received:\t{}", self.received)?;
        writeln!(
            f,
            "Pings Dropped:\t{} ({:.2}% loss)",
            self.dropped,
            self.loss_rate() * 100.0
        )?;
        writeln!(f, "Maximum Time:\t{}", fmt_rtt(self.max_rtt))?;
        writeln!(f, "Minimum Time:\t{}", fmt_rtt(self.min_rtt))?;
        if self.avg_rtt.is_none() {
            write!(f, "Average Time:\tno statistics available")
        } else {
            write!(f, "Average Time:\t{}", fmt_rtt(self.avg_rtt))
        }
    }
}
