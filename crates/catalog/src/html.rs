//! Metadata scraped from a project's `index.html` when it has no
//! `metadata.json`. Pattern matching only; the page is never parsed as a DOM.

use std::sync::LazyLock;

use foundation::math::LatLon;
use regex::Regex;

const NUM: &str = r"(-?\d+(?:\.\d+)?)";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex")
});

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\s+name\s*=\s*["']description["']\s+content\s*=\s*["']([^"']*)["']"#)
        .expect("static regex")
});

/// Map-initialization idioms, tried in order. Each yields `(lat, lon)`.
static CENTER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"setView\(\s*\[\s*{NUM}\s*,\s*{NUM}\s*\]"),
        format!(r"center\s*:\s*\[\s*{NUM}\s*,\s*{NUM}\s*\]"),
        format!(r"LatLng\(\s*{NUM}\s*,\s*{NUM}\s*\)"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub center: Option<LatLon>,
}

pub fn scrape(html: &str) -> HtmlMetadata {
    HtmlMetadata {
        title: extract_title(html),
        description: extract_description(html),
        center: extract_center(html),
    }
}

/// `<title>` text with entities decoded and whitespace collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let text = clean_text(raw);
    (!text.is_empty()).then_some(text)
}

pub fn extract_description(html: &str) -> Option<String> {
    let raw = DESCRIPTION_RE.captures(html)?.get(1)?.as_str();
    let text = clean_text(raw);
    (!text.is_empty()).then_some(text)
}

/// First plausible `[lat, lon]` found in inline map setup code.
pub fn extract_center(html: &str) -> Option<LatLon> {
    CENTER_RES.iter().find_map(|re| {
        re.captures_iter(html).find_map(|caps| {
            let lat = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let lon = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some(LatLon::new(lat, lon)).filter(LatLon::is_valid)
        })
    })
}

fn clean_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Decodes the named entities page titles use plus numeric references.
/// Unknown entities are left as written.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_entities, extract_center, extract_title, scrape};
    use foundation::math::LatLon;
    use pretty_assertions::assert_eq;

    #[test]
    fn scrapes_leaflet_page() {
        let html = include_str!("../tests/fixtures/bridge-inspection/index.html");
        let meta = scrape(html);
        assert_eq!(meta.title.as_deref(), Some("Bridge Inspection & Deck Survey"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Deck and pier inspection, March flight.")
        );
        assert_eq!(meta.center, Some(LatLon::new(47.6097, -122.3331)));
    }

    #[test]
    fn center_from_other_idioms() {
        let html = include_str!("../tests/fixtures/quarry-volume/index.html");
        assert_eq!(extract_center(html), Some(LatLon::new(-33.8688, 151.2093)));
        assert_eq!(
            extract_center("marker = L.marker(new L.LatLng(10.5, 20))"),
            Some(LatLon::new(10.5, 20.0))
        );
        // Out-of-range pairs are skipped in favor of later matches.
        assert_eq!(
            extract_center("x.setView([200, 1]); y = { center: [1, 2] }"),
            Some(LatLon::new(1.0, 2.0))
        );
        assert_eq!(extract_center("<p>no map</p>"), None);
    }

    #[test]
    fn title_edge_cases() {
        assert_eq!(extract_title("<TITLE lang=en>Quarry</TITLE>").as_deref(), Some("Quarry"));
        assert_eq!(extract_title("<title>   </title>"), None);
        assert_eq!(extract_title("<h1>no title</h1>"), None);
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entities("a &amp; b &#39;c&#x27;"), "a & b 'c'");
        assert_eq!(decode_entities("R&D &unknown; 5 & 6"), "R&D &unknown; 5 & 6");
    }
}
