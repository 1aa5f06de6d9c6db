use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr + Display pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(EntryStatus {
    Scheduled => "scheduled",
    Rescheduled => "rescheduled",
    CheckedIn => "checked_in",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

impl EntryStatus {
    /// Terminal statuses are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::NoShow | Self::Rescheduled
        )
    }

    /// Statuses that count toward the active waiting line.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::CheckedIn | Self::InProgress)
    }

    pub const ALL: [EntryStatus; 7] = [
        Self::Scheduled,
        Self::Rescheduled,
        Self::CheckedIn,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];
}

str_enum!(StaffRole {
    Admin => "admin",
    Doctor => "doctor",
    Secretary => "secretary",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entry_status_round_trip() {
        for (variant, s) in [
            (EntryStatus::Scheduled, "scheduled"),
            (EntryStatus::Rescheduled, "rescheduled"),
            (EntryStatus::CheckedIn, "checked_in"),
            (EntryStatus::InProgress, "in_progress"),
            (EntryStatus::Completed, "completed"),
            (EntryStatus::Cancelled, "cancelled"),
            (EntryStatus::NoShow, "no_show"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EntryStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn staff_role_round_trip() {
        for (variant, s) in [
            (StaffRole::Admin, "admin"),
            (StaffRole::Doctor, "doctor"),
            (StaffRole::Secretary, "secretary"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(StaffRole::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(EntryStatus::Completed.is_terminal());
        assert!(EntryStatus::Cancelled.is_terminal());
        assert!(EntryStatus::NoShow.is_terminal());
        assert!(EntryStatus::Rescheduled.is_terminal());
        assert!(!EntryStatus::Scheduled.is_terminal());
        assert!(!EntryStatus::CheckedIn.is_terminal());
        assert!(!EntryStatus::InProgress.is_terminal());
    }

    #[test]
    fn active_statuses() {
        assert!(EntryStatus::CheckedIn.is_active());
        assert!(EntryStatus::InProgress.is_active());
        assert!(!EntryStatus::Scheduled.is_active());
        assert!(!EntryStatus::Completed.is_active());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(EntryStatus::from_str("waiting").is_err());
        assert!(StaffRole::from_str("nurse").is_err());
        assert!(EntryStatus::from_str("").is_err());
    }
}
