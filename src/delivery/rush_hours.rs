//! Rush hour windows

use std::fmt;

use smallvec::SmallVec;
use tracing::debug;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Half-open minute-of-day range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteRange {
    start: u16,
    end: u16,
}

impl MinuteRange {
    /// Create a range; `None` unless `start < end <= 1440`.
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start < end && end <= MINUTES_PER_DAY).then_some(Self { start, end })
    }

    /// First minute in the range.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// First minute after the range.
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Whether `minute` falls in the range.
    pub fn contains(&self, minute: u16) -> bool {
        (self.start..self.end).contains(&minute)
    }
}

impl fmt::Display for MinuteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// Local time-of-day windows that incur a rush surcharge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RushHours {
    ranges: SmallVec<[MinuteRange; 4]>,
}

impl RushHours {
    /// Parse a comma separated list of `HH:MM-HH:MM` windows.
    ///
    /// Malformed or empty windows are dropped rather than rejected, so a bad
    /// value never fails pricing; at worst no rush surcharge applies.
    pub fn parse(windows: &str) -> Self {
        let ranges = windows
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let range = parse_range(part);

                if range.is_none() {
                    debug!(window = part, "ignoring malformed rush hour window");
                }

                range
            })
            .collect();

        Self { ranges }
    }

    /// Create from already validated ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = MinuteRange>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
        }
    }

    /// Parsed windows.
    pub fn ranges(&self) -> &[MinuteRange] {
        &self.ranges
    }

    /// Whether no window is configured.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `minute_of_day` falls in any window.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(minute_of_day))
    }
}

impl fmt::Display for RushHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }

            write!(f, "{range}")?;
        }

        Ok(())
    }
}

fn parse_range(part: &str) -> Option<MinuteRange> {
    let (start, end) = part.split_once('-')?;

    MinuteRange::new(parse_minute(start)?, parse_minute(end)?)
}

fn parse_minute(value: &str) -> Option<u16> {
    let (hours, minutes) = value.trim().split_once(':')?;

    let hours: u16 = hours.trim().parse().ok()?;
    let minutes: u16 = minutes.trim().parse().ok()?;

    if hours > 24 || minutes > 59 {
        return None;
    }

    let minute = hours * 60 + minutes;

    (minute <= MINUTES_PER_DAY).then_some(minute)
}
