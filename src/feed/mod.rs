//! iVoox feed resolution
//!
//! A podcast page URL such as `https://www.ivoox.com/show-name_sq_f123456_1.html` embeds the
//! program identifier (`f123456`). The identifier maps onto a public RSS feed, and the newest
//! episode is the enclosure of the first item in that feed.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Feed host used when no other base is configured
pub const DEFAULT_FEED_BASE: &str = "https://feeds.ivoox.com";

/// Timeout for establishing a connection (no overall timeout, episodes can be large)
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[allow(clippy::expect_used)]
static FEED_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sq_(f\d+)_").expect("feed id pattern is valid"));

/// Extract the program identifier from a podcast page URL
///
/// Looks for `sq_`, then `f` followed by digits, then `_`, anywhere in the input.
///
/// ```
/// use podcast_dl::feed::extract_id;
///
/// assert_eq!(
///     extract_id("https://www.ivoox.com/podcast-show_sq_f123456_1.html").as_deref(),
///     Some("f123456")
/// );
/// assert_eq!(extract_id("https://www.ivoox.com/about.html"), None);
/// ```
pub fn extract_id(url: &str) -> Option<String> {
    FEED_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Build the feed URL for an identifier on the public feed host
pub fn build_feed_url(id: &str) -> String {
    feed_url_on(DEFAULT_FEED_BASE, id)
}

fn feed_url_on(base: &str, id: &str) -> String {
    format!("{}/feed_fg_{}_filtro_1.xml", base.trim_end_matches('/'), id)
}

/// Build the shared HTTP client used for feeds and episode downloads
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("podcast-dl/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| Error::Network {
            url: String::new(),
            source,
        })
}

/// Fetches feeds and picks out the first enclosure
#[derive(Clone, Debug)]
pub struct FeedClient {
    http_client: reqwest::Client,
    feed_base: String,
}

impl FeedClient {
    /// Create a client for the public feed host
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?, DEFAULT_FEED_BASE))
    }

    /// Create a client on top of an existing HTTP client and feed host
    pub fn with_client(http_client: reqwest::Client, feed_base: impl Into<String>) -> Self {
        Self {
            http_client,
            feed_base: feed_base.into(),
        }
    }

    /// The underlying HTTP client, shared with the downloader
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Feed URL for an identifier on this client's feed host
    pub fn feed_url(&self, id: &str) -> String {
        feed_url_on(&self.feed_base, id)
    }

    /// Fetch a feed and return the URL of the first enclosure of its first item
    ///
    /// # Returns
    /// `Ok(None)` when the feed has no channel, no item, or the first item has no enclosure.
    ///
    /// # Errors
    /// - [`Error::Network`] if the request fails or the body cannot be read
    /// - [`Error::Http`] on a non-success status
    /// - [`Error::FeedParse`] if the body is not well-formed XML
    pub async fn first_enclosure(&self, feed_url: &str) -> Result<Option<String>> {
        debug!("Fetching feed: {}", feed_url);

        let response = self
            .http_client
            .get(feed_url)
            .send()
            .await
            .map_err(|source| Error::Network {
                url: feed_url.to_string(),
                source,
            })?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                url: feed_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| Error::Network {
            url: feed_url.to_string(),
            source,
        })?;

        first_enclosure_url(&body).map_err(|e| e.with_feed_url(feed_url))
    }
}

/// Where the reader currently is relative to the path root > channel > item > enclosure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Channel,
    Item,
    Enclosure,
    Done,
}

impl Target {
    fn tag(self) -> &'static [u8] {
        match self {
            Target::Channel => b"channel",
            Target::Item => b"item",
            Target::Enclosure => b"enclosure",
            Target::Done => b"",
        }
    }

    fn next(self) -> Self {
        match self {
            Target::Channel => Target::Item,
            Target::Item => Target::Enclosure,
            Target::Enclosure | Target::Done => Target::Done,
        }
    }
}

/// Find the first enclosure URL in a feed document
///
/// Follows the first `channel` child of the root element, then its first `item` child,
/// then that item's first `enclosure` child, and returns the `url` attribute verbatim.
/// Later items are never considered, even when the first one has no enclosure.
/// Only elements outside any namespace match: under a default `xmlns` the feed has no
/// `channel`.
///
/// The whole document is read so that malformed XML anywhere is reported, including
/// text outside the root element, unknown entities and broken attributes.
///
/// # Errors
/// Returns [`Error::FeedParse`] if the document is not well-formed.
pub fn first_enclosure_url(xml: &[u8]) -> Result<Option<String>> {
    let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;
    let mut target = Target::Channel;
    // Depth of the deepest matched ancestor; a target only matches directly below it.
    let mut matched_depth = 1usize;
    let mut enclosure_url: Option<String> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| parse_error(reader.buffer_position(), e))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                depth += 1;
                if depth == 1 {
                    roots += 1;
                    if roots > 1 {
                        return Err(feed_parse("more than one root element"));
                    }
                }

                let name = unqualified_name(&reader, e)?;
                let url = checked_attributes(&reader, e)?;
                let matches_target = target != Target::Done
                    && depth == matched_depth + 1
                    && name == Some(target.tag());

                if matches_target {
                    if target == Target::Enclosure {
                        enclosure_url = url;
                    }
                    matched_depth = depth;
                    target = target.next();
                }

                if is_empty {
                    depth -= 1;
                    close_scope(&mut target, &mut matched_depth, depth);
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| feed_parse("unexpected closing tag"))?;
                close_scope(&mut target, &mut matched_depth, depth);
            }
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| parse_error(reader.buffer_position(), e))?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(feed_parse("text outside the root element"));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(feed_parse("CDATA outside the root element"));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if roots == 0 {
        return Err(feed_parse("no root element"));
    }
    if depth != 0 {
        return Err(feed_parse("unexpected end of document, unclosed element"));
    }

    match &enclosure_url {
        Some(url) if !url.to_ascii_lowercase().ends_with(crate::utils::AUDIO_MARKER) => {
            debug!("First enclosure does not look like an MP3: {}", url);
        }
        None => debug!("Feed has no enclosure in its first item"),
        _ => {}
    }

    Ok(enclosure_url)
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Leaving the element that was last matched means its first child of interest was never
/// found; the search is over because only the first channel/item counts.
fn close_scope(target: &mut Target, matched_depth: &mut usize, depth: usize) {
    if *target != Target::Done && depth < *matched_depth {
        *target = Target::Done;
        *matched_depth = 0;
    }
}

/// Local name of an element outside any namespace, `None` for namespaced elements
fn unqualified_name<'a, R>(
    reader: &NsReader<R>,
    element: &'a BytesStart<'_>,
) -> Result<Option<&'a [u8]>> {
    let (ns, local) = reader.resolve_element(element.name());
    match ns {
        ResolveResult::Unbound => Ok(Some(local.into_inner())),
        ResolveResult::Bound(_) => Ok(None),
        ResolveResult::Unknown(prefix) => Err(parse_error(
            reader.buffer_position(),
            format!(
                "unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
        )),
    }
}

/// Validate every attribute of an element and return its `url` value, if any
fn checked_attributes<R>(
    reader: &NsReader<R>,
    element: &BytesStart<'_>,
) -> Result<Option<String>> {
    let mut url = None;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| parse_error(reader.buffer_position(), e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(reader.buffer_position(), e))?;
        if attr.key.as_ref() == b"url" {
            url = Some(value.into_owned());
        }
    }
    Ok(url)
}

fn parse_error(position: impl std::fmt::Display, err: impl std::fmt::Display) -> Error {
    feed_parse(format!("{} (at byte {})", err, position))
}

fn feed_parse(message: impl Into<String>) -> Error {
    Error::FeedParse {
        url: String::new(),
        message: message.into(),
    }
}
