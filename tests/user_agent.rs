//! Tests for user-agent extraction.

use logbeam::testing::CHROME_USER_AGENT;
use logbeam::user_agent::{PatternUserAgentParser, UserAgentInfo, UserAgentParser};
use pretty_assertions::assert_eq;

fn info(
    browser: Option<&str>,
    bv: Option<&str>,
    os: Option<&str>,
    osv: Option<&str>,
) -> UserAgentInfo {
    UserAgentInfo {
        browser: browser.map(str::to_string),
        browser_version: bv.map(str::to_string),
        os: os.map(str::to_string),
        os_version: osv.map(str::to_string),
    }
}

#[test]
fn test_chrome_on_windows_with_query_encoding() {
    let parsed = PatternUserAgentParser::new().parse(CHROME_USER_AGENT);
    assert_eq!(
        parsed,
        info(Some("Chrome"), Some("31.0"), Some("Windows NT"), Some("6.1"))
    );
    assert_eq!(parsed.browser_label(), "Chrome 31.0");
}

#[test]
fn test_firefox_on_linux() {
    let ua = "Mozilla/5.0 (X11; Linux x86_64; rv:26.0) Gecko/20100101 Firefox/26.0";
    let parsed = PatternUserAgentParser::new().parse(ua);
    assert_eq!(parsed, info(Some("Firefox"), Some("26.0"), Some("Linux"), None));
}

#[test]
fn test_opera_prefix_without_later_browser_token() {
    let ua = "Opera/9.80 (Windows NT 6.1; U; en) Presto/2.10.289 Version/12.01";
    let parsed = PatternUserAgentParser::new().parse(ua);
    assert_eq!(
        parsed,
        info(Some("Opera"), Some("9.80"), Some("Windows NT"), Some("6.1"))
    );
}

#[test]
fn test_later_browser_token_overrides_opera() {
    let ua = "Opera/9.80 (Windows NT 6.1) Chrome/31.0";
    let parsed = PatternUserAgentParser::new().parse(ua);
    assert_eq!(parsed.browser.as_deref(), Some("Chrome"));
    assert_eq!(parsed.browser_version.as_deref(), Some("31.0"));
}

#[test]
fn test_msie_after_platform() {
    let ua = "Mozilla/4.0 (Windows NT 5.1; compatible; MSIE 8.0)";
    let parsed = PatternUserAgentParser::new().parse(ua);
    assert_eq!(
        parsed,
        info(Some("MSIE"), Some("8.0"), Some("Windows NT"), Some("5.1"))
    );
}

#[test]
fn test_unrecognized_agent_is_empty() {
    let parsed = PatternUserAgentParser::new().parse("curl/7.35.0");
    assert!(parsed.is_empty());
    assert_eq!(parsed.browser_label(), "");
}

#[cfg(feature = "ua-woothee")]
#[test]
fn test_woothee_parser_detects_chrome() {
    use logbeam::user_agent::WootheeUserAgentParser;

    let parsed = WootheeUserAgentParser::new().parse(CHROME_USER_AGENT);
    assert_eq!(parsed.browser.as_deref(), Some("Chrome"));
    assert_eq!(parsed.os.as_deref(), Some("Windows 7"));
}
