use crate::model::Minutes;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

pub const MAX_SERVICES: usize = 500;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PHONE_LEN: usize = 40;
pub const MAX_NOTES_LEN: usize = 2_000;
pub const MAX_COLOR_LEN: usize = 32;
pub const MAX_DURATION_MINUTES: Minutes = MINUTES_PER_DAY;

pub const MAX_BLOCKS_PER_DAY: usize = 48;
pub const MAX_APPOINTMENTS_PER_DAY: usize = 500;

pub const MAX_SESSIONS: usize = 1_024;
/// One year.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;
