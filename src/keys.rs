//! Reserved durable-store keys.
//!
//! Every key the data layer owns lives under the `@MedicalApp:` prefix;
//! callers storing their own values should pick a different prefix.

pub const USER: &str = "@MedicalApp:user";
pub const TOKEN: &str = "@MedicalApp:token";
pub const APPOINTMENTS: &str = "@MedicalApp:appointments";
pub const NOTIFICATIONS: &str = "@MedicalApp:notifications";
pub const REGISTERED_USERS: &str = "@MedicalApp:registeredUsers";
pub const APP_SETTINGS: &str = "@MedicalApp:settings";
pub const STATISTICS_CACHE: &str = "@MedicalApp:statisticsCache";

pub const ALL: [&str; 7] = [
  USER,
  TOKEN,
  APPOINTMENTS,
  NOTIFICATIONS,
  REGISTERED_USERS,
  APP_SETTINGS,
  STATISTICS_CACHE,
];

pub fn is_reserved(key: &str) -> bool {
  ALL.contains(&key)
}
