//! Catalog snapshots and release identities.
//!
//! A [`CatalogSnapshot`] records, per followed artist, the identities of the
//! most recent albums and singles seen on the catalog. Two snapshots are
//! compared by the reconciler: the one saved by the previous run and the one
//! fetched right now.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    types::{Album, ReleaseKind},
    utils,
};

/// How releases are identified across runs.
///
/// Snapshots written under one scheme cannot be compared with snapshots
/// written under the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScheme {
    /// The catalog's release identifier.
    ReleaseId,
    /// The lower-cased, whitespace-normalized release title.
    NormalizedTitle,
}

impl fmt::Display for IdentityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityScheme::ReleaseId => write!(f, "id"),
            IdentityScheme::NormalizedTitle => write!(f, "title"),
        }
    }
}

impl FromStr for IdentityScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(IdentityScheme::ReleaseId),
            "title" => Ok(IdentityScheme::NormalizedTitle),
            other => Err(format!("unknown release identity scheme: {other}")),
        }
    }
}

/// Identity key of a release under the configured [`IdentityScheme`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseRef(String);

impl ReleaseRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn for_release(scheme: IdentityScheme, id: &str, title: &str) -> Self {
        match scheme {
            IdentityScheme::ReleaseId => Self(id.to_string()),
            IdentityScheme::NormalizedTitle => Self(utils::normalize_title(title)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity keys of an artist's releases of one kind, mapped to display names.
pub type ReleaseSet = BTreeMap<ReleaseRef, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSnapshot {
    pub name: String,
    #[serde(default, deserialize_with = "release_set")]
    pub albums: ReleaseSet,
    #[serde(default, deserialize_with = "release_set")]
    pub singles: ReleaseSet,
}

impl ArtistSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn releases(&self, kind: ReleaseKind) -> &ReleaseSet {
        match kind {
            ReleaseKind::Album => &self.albums,
            ReleaseKind::Single => &self.singles,
        }
    }

    pub fn releases_mut(&mut self, kind: ReleaseKind) -> &mut ReleaseSet {
        match kind {
            ReleaseKind::Album => &mut self.albums,
            ReleaseKind::Single => &mut self.singles,
        }
    }

    pub fn with_release(mut self, kind: ReleaseKind, key: &str, name: &str) -> Self {
        self.releases_mut(kind)
            .insert(ReleaseRef::new(key), name.to_string());
        self
    }
}

/// Accepts both the identifier-keyed map and the older list-of-identifiers
/// layout. Entries read from a list get an empty display name.
fn release_set<'de, D>(deserializer: D) -> Result<ReleaseSet, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Persisted {
        Map(BTreeMap<ReleaseRef, String>),
        List(Vec<ReleaseRef>),
    }

    Ok(match Persisted::deserialize(deserializer)? {
        Persisted::Map(map) => map,
        Persisted::List(list) => list.into_iter().map(|r| (r, String::new())).collect(),
    })
}

/// Snapshot of every followed artist's recent catalog, keyed by artist id.
pub type CatalogSnapshot = BTreeMap<String, ArtistSnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrecision {
    Day,
    Month,
    Year,
}

impl FromStr for DatePrecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(DatePrecision::Day),
            "month" => Ok(DatePrecision::Month),
            "year" => Ok(DatePrecision::Year),
            other => Err(format!("unknown release date precision: {other}")),
        }
    }
}

/// Release metadata kept next to a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub id: String,
    pub name: String,
    pub kind: ReleaseKind,
    pub release_date: String,
    pub release_date_precision: String,
}

impl ReleaseInfo {
    pub fn from_album(album: &Album, kind: ReleaseKind) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            kind,
            release_date: album.release_date.clone(),
            release_date_precision: album.release_date_precision.clone(),
        }
    }

    /// The release day, when the catalog reports one with day precision.
    pub fn release_day(&self) -> Option<NaiveDate> {
        match self.release_date_precision.parse::<DatePrecision>() {
            Ok(DatePrecision::Day) => utils::parse_release_day(&self.release_date),
            _ => None,
        }
    }
}

/// Release metadata for every entry of a fresh snapshot.
///
/// Entries are scoped to an artist and a release kind: under the title
/// scheme two artists (or an album and a single) may share a title key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseIndex {
    entries: BTreeMap<(String, ReleaseKind, ReleaseRef), ReleaseInfo>,
}

impl ReleaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        artist_id: &str,
        kind: ReleaseKind,
        key: &ReleaseRef,
    ) -> Option<&ReleaseInfo> {
        self.entries.get(&(artist_id.to_string(), kind, key.clone()))
    }

    /// Registers `info` unless the key is already known for this artist and kind.
    pub fn register(&mut self, artist_id: &str, key: ReleaseRef, info: ReleaseInfo) {
        self.entries
            .entry((artist_id.to_string(), info.kind, key))
            .or_insert(info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// New releases of one artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewMusic {
    pub name: String,
    pub new_albums: Vec<ReleaseRef>,
    pub new_singles: Vec<ReleaseRef>,
}

impl NewMusic {
    pub fn is_empty(&self) -> bool {
        self.new_albums.is_empty() && self.new_singles.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = (ReleaseKind, &ReleaseRef)> {
        self.new_albums
            .iter()
            .map(|r| (ReleaseKind::Album, r))
            .chain(self.new_singles.iter().map(|r| (ReleaseKind::Single, r)))
    }
}

/// Artists with at least one new release, keyed by artist id.
pub type NewMusicResult = BTreeMap<String, NewMusic>;

/// Identity set of one artist's releases of one kind.
///
/// Releases are kept in the order given, deduplicated by identity key and
/// capped at `limit`. Every kept release is registered in `index` under
/// `artist_id`; under the title scheme the first (most recent) release of a
/// title wins.
pub fn release_set_from(
    artist_id: &str,
    releases: &[Album],
    kind: ReleaseKind,
    scheme: IdentityScheme,
    limit: usize,
    index: &mut ReleaseIndex,
) -> ReleaseSet {
    let mut set = ReleaseSet::new();
    for album in releases {
        if set.len() >= limit {
            break;
        }
        let key = ReleaseRef::for_release(scheme, &album.id, &album.name);
        if key.as_str().is_empty() || set.contains_key(&key) {
            continue;
        }
        index.register(artist_id, key.clone(), ReleaseInfo::from_album(album, kind));
        set.insert(key, album.name.clone());
    }
    set
}
