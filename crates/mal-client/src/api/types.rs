//! MAL result types.
//!
//! These types describe what the client returns for list lookups, recent user
//! lookups and anime detail lookups.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's anime list as returned by a list lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLookupResults {
    pub user_id: u32,
    /// The user name as MAL spells it. Capitalization may differ from the
    /// name that was looked up.
    pub canonical_user_name: String,
    pub anime_list: Vec<AnimeListEntry>,
}

impl UserLookupResults {
    pub fn new(
        user_id: u32,
        canonical_user_name: impl Into<String>,
        anime_list: Vec<AnimeListEntry>,
    ) -> Self {
        Self {
            user_id,
            canonical_user_name: canonical_user_name.into(),
            anime_list,
        }
    }
}

/// One entry of a user's anime list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeListEntry {
    pub score: Option<f64>,
    pub status: CompletionStatus,
    pub episodes_watched: u32,
    pub my_start_date: UncertainDate,
    pub my_finish_date: UncertainDate,
    pub my_last_update: NaiveDateTime,
    pub anime: AnimeInfo,
    pub tags: Vec<String>,
}

impl PartialEq for AnimeListEntry {
    fn eq(&self, other: &Self) -> bool {
        self.anime.anime_id == other.anime.anime_id
    }
}

impl Eq for AnimeListEntry {}

/// Anime information embedded in a list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeInfo {
    pub anime_id: u32,
    pub title: String,
    pub anime_type: AnimeType,
    pub synonyms: Vec<String>,
    pub status: SeriesStatus,
    /// 0 for anime that hasn't aired yet, or less than planned while airing
    pub episodes: u32,
    pub start_date: UncertainDate,
    pub end_date: UncertainDate,
    pub image_url: Option<String>,
}

impl PartialEq for AnimeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.anime_id == other.anime_id
    }
}

impl Eq for AnimeInfo {}

impl fmt::Display for AnimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Anime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimeType {
    /// Not entered in MAL's database yet
    Unknown,
    Tv,
    Ova,
    Movie,
    Special,
    Ona,
    Music,
    /// A type code MAL added after this client was written
    Other(u32),
}

impl AnimeType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => AnimeType::Unknown,
            1 => AnimeType::Tv,
            2 => AnimeType::Ova,
            3 => AnimeType::Movie,
            4 => AnimeType::Special,
            5 => AnimeType::Ona,
            6 => AnimeType::Music,
            other => AnimeType::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            AnimeType::Unknown => 0,
            AnimeType::Tv => 1,
            AnimeType::Ova => 2,
            AnimeType::Movie => 3,
            AnimeType::Special => 4,
            AnimeType::Ona => 5,
            AnimeType::Music => 6,
            AnimeType::Other(code) => *code,
        }
    }
}

/// Airing status of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    CurrentlyAiring,
    FinishedAiring,
    NotYetAired,
}

impl SeriesStatus {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(SeriesStatus::CurrentlyAiring),
            2 => Some(SeriesStatus::FinishedAiring),
            3 => Some(SeriesStatus::NotYetAired),
            _ => None,
        }
    }
}

/// A user's status for an anime on their list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Watching,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
}

impl CompletionStatus {
    /// MAL skips code 5.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(CompletionStatus::Watching),
            2 => Some(CompletionStatus::Completed),
            3 => Some(CompletionStatus::OnHold),
            4 => Some(CompletionStatus::Dropped),
            6 => Some(CompletionStatus::PlanToWatch),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            CompletionStatus::Watching => 1,
            CompletionStatus::Completed => 2,
            CompletionStatus::OnHold => 3,
            CompletionStatus::Dropped => 4,
            CompletionStatus::PlanToWatch => 6,
        }
    }
}

/// A date where any component may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UncertainDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl UncertainDate {
    pub fn new(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }
}

impl fmt::Display for UncertainDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{:04}", year)?,
            None => f.write_str("????")?,
        }
        match self.month {
            Some(month) => write!(f, "-{:02}", month)?,
            None => f.write_str("-??")?,
        }
        match self.day {
            Some(day) => write!(f, "-{:02}", day),
            None => f.write_str("-??"),
        }
    }
}

/// Users recently active on MAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentUsersResults {
    pub users: Vec<String>,
}

/// Information scraped from an anime's details page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeDetailsResults {
    pub genres: Vec<Genre>,
}

/// Anime genre
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub genre_id: u32,
    pub name: String,
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
