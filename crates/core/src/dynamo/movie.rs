//! Movie items and seed data.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MOVIES_TABLE: &str = "Movies";

/// GSI keyed by `title`, used to find a movie without knowing its year.
pub const TITLE_INDEX: &str = "title-index";

/// An item of the Movies table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub year: i32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<String>>,
}

impl Movie {
    pub fn new(year: i32, title: impl Into<String>) -> Self {
        Self {
            year,
            title: title.into(),
            actors: None,
        }
    }

    pub fn with_actors(mut self, actors: Vec<String>) -> Self {
        self.actors = Some(actors);
        self
    }

    /// `year/title`, used in logs and error ids.
    pub fn key_display(&self) -> String {
        format!("{}/{}", self.year, self.title)
    }
}

/// An entry of the movie seed file: key attributes plus a free-form `info` document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovieSeed {
    pub year: i32,
    pub title: String,
    #[serde(default)]
    pub info: serde_json::Value,
}

/// Parses the seed file, a JSON array of `{year, title, info}` objects.
pub fn parse_movie_seeds(json: &str) -> Result<Vec<MovieSeed>> {
    Ok(serde_json::from_str(json)?)
}
