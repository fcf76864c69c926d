use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for credmount
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/credmount or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("credmount")
    }

    /// Home directory, falling back to the current directory
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_honours_xdg() {
        let original = env::var("XDG_CONFIG_HOME").ok();

        env::set_var("XDG_CONFIG_HOME", "/tmp/config");
        assert_eq!(XdgPaths::config_dir(), PathBuf::from("/tmp/config/credmount"));

        match original {
            Some(val) => env::set_var("XDG_CONFIG_HOME", val),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_fallback() {
        let original = env::var("XDG_CONFIG_HOME").ok();
        env::remove_var("XDG_CONFIG_HOME");

        let dir = XdgPaths::config_dir();
        assert!(dir.ends_with(".config/credmount"));

        if let Some(val) = original {
            env::set_var("XDG_CONFIG_HOME", val);
        }
    }
}
