//! Client environment classification

use once_cell::sync::Lazy;
use regex::Regex;

static MOBILE_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("mobile user-agent pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub is_mobile_client: bool,
}

/// Classify a user-agent string against the mobile allow-list
pub fn detect_environment(user_agent: &str) -> Environment {
    Environment {
        is_mobile_client: MOBILE_AGENT.is_match(user_agent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_agents() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120 Mobile",
            "Opera/9.80 (J2ME/MIDP; Opera Mini/9.80; U; en) Presto/2.5.25",
            "Mozilla/5.0 (ipad; cpu os 16_0 like mac os x)",
        ] {
            assert!(detect_environment(ua).is_mobile_client, "{}", ua);
        }
    }

    #[test]
    fn test_desktop_agents() {
        for ua in [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15",
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
            "",
        ] {
            assert!(!detect_environment(ua).is_mobile_client, "{}", ua);
        }
    }
}
