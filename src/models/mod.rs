// Domain models. Timestamps are unix millis (i64), stored as-is in SQLite.

mod alert;
mod device;
mod health;
mod metric;
mod problem;
mod scan;
mod speedtest;

pub use alert::{Alert, AlertType};
pub use device::{Device, DeviceStatus, DeviceType};
pub use health::{FactorResult, HealthCategory, HealthScore, Trend};
pub use metric::Metric;
pub use problem::{Problem, ProblemCategory, Severity};
pub use scan::{Scan, ScanStatus, ScanType, Trigger};
pub use speedtest::SpeedTestResult;

/// Current wall-clock time in unix millis.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Closed string enums: serde names, `as_str` for the TEXT columns and `FromStr` for reading them back.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;
