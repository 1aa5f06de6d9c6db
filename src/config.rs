use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Frontdesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Frontdesk/ on all platforms (user-visible, per deployment requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Frontdesk")
}

/// Database file path. `FRONTDESK_DB` overrides the default location.
pub fn database_path() -> PathBuf {
    std::env::var("FRONTDESK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir().join("frontdesk.db"))
}

/// Listen address. `FRONTDESK_ADDR` overrides; defaults to loopback —
/// the reverse proxy terminates TLS and authentication in front of us.
pub fn bind_addr() -> SocketAddr {
    std::env::var("FRONTDESK_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8420)))
}

pub fn default_log_filter() -> &'static str {
    "info,frontdesk=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Frontdesk"));
    }

    #[test]
    fn app_name_is_frontdesk() {
        assert_eq!(APP_NAME, "Frontdesk");
    }

    #[test]
    fn default_bind_addr_is_loopback() {
        // Only valid when FRONTDESK_ADDR is unset in the test environment.
        if std::env::var("FRONTDESK_ADDR").is_err() {
            let addr = bind_addr();
            assert!(addr.ip().is_loopback());
            assert_eq!(addr.port(), 8420);
        }
    }
}
