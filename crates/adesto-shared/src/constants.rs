//! Shared constants.

/// The 24 hour labels, midnight first, exactly as stored on signal rows.
pub const HOURS: [&str; 24] = [
    "12AM", "1AM", "2AM", "3AM", "4AM", "5AM", "6AM", "7AM", "8AM", "9AM", "10AM", "11AM",
    "12PM", "1PM", "2PM", "3PM", "4PM", "5PM", "6PM", "7PM", "8PM", "9PM", "10PM", "11PM",
];

/// Default visible window length in days (yesterday through +5).
pub const DAYS_WINDOW: u32 = 7;

/// Number of most-recent messages fetched on the initial chat load.
pub const MESSAGE_PAGE_LIMIT: u32 = 50;
