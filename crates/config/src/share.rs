// Share links: the current configuration embedded in a URL query parameter

use serde_json::Value as Json;
use url::Url;

use crate::snapshot::{parse_document, Snapshot, SnapshotError};

pub const SHARE_PARAM: &str = "defaultSetting";

fn parse_url(raw: &str) -> Result<Url, SnapshotError> {
    Url::parse(raw).map_err(|e| SnapshotError::Parse(format!("{}: {}", raw, e)))
}

/// `base` with `defaultSetting=<snapshot JSON>`, replacing any existing value
pub fn share_url(base: &str, snapshot: &Snapshot) -> Result<String, SnapshotError> {
    let mut url = parse_url(base)?;
    let json = serde_json::to_string(snapshot)?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != SHARE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(SHARE_PARAM, &json);
    }
    Ok(url.into())
}

/// The migrated configuration carried by a share link, if any
pub fn settings_from_url(raw: &str) -> Result<Option<Json>, SnapshotError> {
    let url = parse_url(raw)?;
    let found = url
        .query_pairs()
        .find(|(k, _)| k == SHARE_PARAM)
        .map(|(_, v)| v.into_owned());
    found.map(|text| parse_document(&text)).transpose()
}
