use async_trait::async_trait;

use crate::error::Result;

use super::machine::MachineReading;
use super::movie::{Movie, MovieSeed};

/// Repository for the Movies table.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Gets a movie by its full key.
    async fn get_movie(&self, year: i32, title: &str) -> Result<Option<Movie>>;

    /// Gets several movies in one request. Missing keys are skipped.
    async fn batch_get_movies(&self, keys: &[(i32, String)]) -> Result<Vec<Movie>>;

    /// Writes the movie only when no item has the same key.
    ///
    /// Returns false when the movie already exists.
    async fn put_movie_if_absent(&self, movie: &Movie) -> Result<bool>;

    /// Creates or replaces a movie.
    async fn save_movie(&self, movie: &Movie) -> Result<()>;

    /// Writes a seed entry, including its `info` document.
    async fn load_seed(&self, seed: &MovieSeed) -> Result<()>;

    /// Movies released in `year`, at most `limit` of them.
    async fn query_by_year(&self, year: i32, limit: i32) -> Result<Vec<Movie>>;

    /// The first movie with this title, through the title index.
    async fn query_by_title(&self, title: &str) -> Result<Option<Movie>>;
}

/// Repository for the machine readings table.
#[async_trait]
pub trait MachineRepository: Send + Sync {
    /// Gets a reading by its full key.
    async fn get_reading(
        &self,
        machine_id: i64,
        machine_type: &str,
    ) -> Result<Option<MachineReading>>;

    /// Finds a machine through the machine name index.
    async fn find_by_name(&self, machine_name: &str) -> Result<Option<MachineReading>>;

    /// Readings with exactly this temperature, through the temperature index.
    async fn query_by_temperature(
        &self,
        temperature: &str,
        limit: i32,
    ) -> Result<Vec<MachineReading>>;

    /// Creates or replaces a reading.
    async fn save_reading(&self, reading: &MachineReading) -> Result<()>;
}
