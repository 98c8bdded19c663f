//! Ordered fetch-profile descriptors.
//!
//! A profile is one specific combination of HTTP headers tried during a
//! retrieval attempt. Profiles are plain data iterated in order with early
//! exit on success, so the retry matrix stays testable and extensible
//! independent of the gateway's control flow. The bare profile is the
//! always-last resort, appended once after all URL-variant combinations.

/// Browser-like User-Agent used by the default profiles.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) SchemeWatch/0.1";

/// Plain Windows User-Agent for the alternate profiles.
const PLAIN_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// One header combination for a retrieval attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchProfile {
    /// Short label for tracing.
    pub name: &'static str,
    /// Static headers sent with the attempt.
    pub headers: &'static [(&'static str, &'static str)],
    /// Whether to add a `Referer` header set to the target URL's origin.
    pub referer_origin: bool,
}

/// Header rotation tried for every URL variant, most conventional first.
pub(crate) const PROFILES: &[FetchProfile] = &[
    FetchProfile {
        name: "default",
        headers: &[
            ("User-Agent", BROWSER_UA),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
        ],
        referer_origin: false,
    },
    FetchProfile {
        name: "referer",
        headers: &[("User-Agent", BROWSER_UA), ("Accept", "text/html")],
        referer_origin: true,
    },
    FetchProfile {
        name: "alt-ua",
        headers: &[
            ("User-Agent", PLAIN_UA),
            ("Accept", "*/*"),
            ("Accept-Encoding", "gzip, deflate, br"),
            ("Connection", "keep-alive"),
        ],
        referer_origin: false,
    },
    FetchProfile {
        name: "navigate",
        headers: &[
            ("User-Agent", PLAIN_UA),
            ("Accept", "text/html"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "none"),
        ],
        referer_origin: false,
    },
];

/// Last-ditch attempt with no headers at all.
pub(crate) const BARE: FetchProfile = FetchProfile {
    name: "bare",
    headers: &[],
    referer_origin: false,
};
