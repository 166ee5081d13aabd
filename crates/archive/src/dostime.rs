//! MS-DOS date/time fields, as stored in zip headers.
//!
//! Two-second resolution, no timezone, years 1980 to 2107.

use time::macros::datetime;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Earliest representable timestamp. Used as the pinned modification time
/// for reproducible output.
pub const DOS_EPOCH: PrimitiveDateTime = datetime!(1980-01-01 0:00);
/// Latest representable timestamp.
pub const DOS_MAX: PrimitiveDateTime = datetime!(2107-12-31 23:59:58);

/// Encode into `(time, date)` header fields, clamping out-of-range values.
pub fn encode(datetime: PrimitiveDateTime) -> (u16, u16) {
    let datetime = datetime.clamp(DOS_EPOCH, DOS_MAX);
    // Clamped above, so the year offset always fits in 7 bits.
    let year = (datetime.year() - 1980) as u16;
    let time = (u16::from(datetime.hour()) << 11)
        | (u16::from(datetime.minute()) << 5)
        | (u16::from(datetime.second()) / 2);
    let date = (year << 9) | (u16::from(u8::from(datetime.month())) << 5) | u16::from(datetime.day());
    (time, date)
}

/// Decode header fields. Returns `None` for impossible dates (day zero,
/// month 13, 62 seconds...) which some tools write for "unknown".
pub fn decode(time: u16, date: u16) -> Option<PrimitiveDateTime> {
    let year = 1980 + i32::from(date >> 9);
    let month = Month::try_from(((date >> 5) & 0x0F) as u8).ok()?;
    let day = (date & 0x1F) as u8;
    let hour = (time >> 11) as u8;
    let minute = ((time >> 5) & 0x3F) as u8;
    let second = ((time & 0x1F) * 2) as u8;
    Some(PrimitiveDateTime::new(
        Date::from_calendar_date(year, month, day).ok()?,
        Time::from_hms(hour, minute, second).ok()?,
    ))
}
