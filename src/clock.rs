use chrono::{DateTime, FixedOffset, Local, Offset, Timelike, Utc};
use log::info;
use std::f32::consts::PI;

/// Wall-clock time of day, read fresh each frame
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ClockTime {
    /// 0-23
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// Angle of the second hand, in radians clockwise from 12
    pub fn second_angle(&self) -> f32 {
        self.second as f32 / 30.0 * PI
    }

    /// Angle of the minute hand. Jumps once per minute, no sweep
    pub fn minute_angle(&self) -> f32 {
        self.minute as f32 / 30.0 * PI
    }

    /// Angle of the hour hand, which creeps forward with the minutes
    pub fn hour_angle(&self) -> f32 {
        ((self.hour % 12) as f32 + self.minute as f32 / 60.0) / 6.0 * PI
    }
}

impl<T: Timelike> From<&T> for ClockTime {
    fn from(time: &T) -> Self {
        Self::new(time.hour(), time.minute(), time.second())
    }
}

/// Source of [ClockTime], pinned to a time zone offset. The offset only
/// changes when we're told the zone changed, or when the face becomes visible.
#[derive(Copy, Clone, Debug)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    /// Clock in the system's current local offset
    pub fn local() -> Self {
        Self {
            offset: local_offset(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Switch to a new offset. `None` re-reads the system's local offset
    pub fn set_time_zone(&mut self, offset: Option<FixedOffset>) {
        let offset = offset.unwrap_or_else(local_offset);
        if offset != self.offset {
            info!("Time zone changed from {} to {}", self.offset, offset);
        }
        self.offset = offset;
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn time(&self) -> ClockTime {
        ClockTime::from(&self.now())
    }
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}
