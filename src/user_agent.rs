//! Browser and operating-system extraction from user-agent strings.
//!
//! Record parsers depend only on the [`UserAgentParser`] trait. The default
//! [`PatternUserAgentParser`] is a best-effort heuristic built on one compiled
//! pattern; [`WootheeUserAgentParser`] (feature `ua-woothee`) swaps in the
//! `woothee` database instead.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Whatever could be extracted; a field the pattern did not capture is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
}

impl UserAgentInfo {
    pub fn is_empty(&self) -> bool {
        self.browser.is_none()
            && self.browser_version.is_none()
            && self.os.is_none()
            && self.os_version.is_none()
    }

    /// `"<browser> <version>"`, the browser alone, or an empty string.
    pub fn browser_label(&self) -> String {
        match (&self.browser, &self.browser_version) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name.clone(),
            (None, Some(version)) => version.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A user-agent detection strategy.
pub trait UserAgentParser: Send + Sync {
    fn parse(&self, user_agent: &str) -> UserAgentInfo;
}

// Opera 9+ prefix, then a platform with an optional adjoining version, then a
// generic Browser/Version token or "MSIE Version". Every section is optional,
// so a string with none of them yields an empty result rather than no match.
static USER_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^",
        r"(?:.*?(?P<opera>Opera)/(?P<opera_version>(?:9|[1-9]\d+)(?:\.\d+)?))?",
        r"(?:.*?(?P<os>Android|iPad|iPhone|Linux|Windows NT|Windows)",
        r"(?: (?P<os_version>\d+(?:\.\d+)?))?)?",
        r"(?:.*?(?:(?P<browser>Chrome|Firefox|Opera|Safari)/(?P<browser_version>\d+(?:\.\d+)?)",
        r"|(?P<msie>MSIE) (?P<msie_version>\d+(?:\.\d+)?)))?",
    ))
    .expect("user agent pattern")
});

/// The built-in single-pattern extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternUserAgentParser;

impl PatternUserAgentParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl UserAgentParser for PatternUserAgentParser {
    fn parse(&self, user_agent: &str) -> UserAgentInfo {
        // Query-encoded values arrive with '+' for spaces.
        let user_agent = user_agent.replace('+', " ");
        let mut info = UserAgentInfo::default();
        let Some(caps) = USER_AGENT.captures(&user_agent) else {
            return info;
        };

        if let Some(opera) = group(&caps, "opera") {
            info.browser = Some(opera);
            info.browser_version = group(&caps, "opera_version");
        }

        info.os = group(&caps, "os");
        info.os_version = group(&caps, "os_version");

        // A later browser token wins over the Opera prefix.
        if let Some(browser) = group(&caps, "browser") {
            info.browser = Some(browser);
            info.browser_version = group(&caps, "browser_version");
        } else if let Some(msie) = group(&caps, "msie") {
            info.browser = Some(msie);
            info.browser_version = group(&caps, "msie_version");
        }

        info
    }
}

#[cfg(feature = "ua-woothee")]
pub use woothee_parser::WootheeUserAgentParser;

#[cfg(feature = "ua-woothee")]
mod woothee_parser {
    use super::{UserAgentInfo, UserAgentParser};
    use woothee::parser::Parser;

    const UNKNOWN: &str = "UNKNOWN";

    /// Detection backed by the `woothee` project database.
    pub struct WootheeUserAgentParser {
        parser: Parser,
    }

    impl WootheeUserAgentParser {
        #[must_use]
        pub fn new() -> Self {
            Self {
                parser: Parser::new(),
            }
        }
    }

    impl Default for WootheeUserAgentParser {
        fn default() -> Self {
            Self::new()
        }
    }

    fn known(value: &str) -> Option<String> {
        if value.is_empty() || value == UNKNOWN {
            None
        } else {
            Some(value.to_string())
        }
    }

    impl UserAgentParser for WootheeUserAgentParser {
        fn parse(&self, user_agent: &str) -> UserAgentInfo {
            let user_agent = user_agent.replace('+', " ");
            let Some(result) = self.parser.parse(&user_agent) else {
                return UserAgentInfo::default();
            };
            UserAgentInfo {
                browser: known(&result.name),
                browser_version: known(&result.version),
                os: known(&result.os),
                os_version: known(&result.os_version),
            }
        }
    }
}
