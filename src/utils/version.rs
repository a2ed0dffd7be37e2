//! Version information

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn get_version() -> &'static str {
    VERSION
}

/// User agent sent with every ad server request
pub fn user_agent() -> String {
    format!("simula-ad-sdk/{}", VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        assert_eq!(get_version(), env!("CARGO_PKG_VERSION"));
        assert!(user_agent().starts_with("simula-ad-sdk/"));
        assert!(user_agent().ends_with(VERSION));
    }
}
