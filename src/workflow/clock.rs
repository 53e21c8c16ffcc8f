use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Wall clock in the business timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl FixedClock {
    pub(crate) fn on(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(10, 0, 0).expect("valid time"))
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
