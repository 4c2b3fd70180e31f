//! In-memory repository implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::machine::MachineReading;
use super::movie::{Movie, MovieSeed};
use super::traits::{MachineRepository, MovieRepository};

/// In-memory storage for both tables, for testing.
///
/// Uses maps wrapped in `Arc<RwLock<_>>` for thread-safe access.
/// Data is not persisted and will be lost when the repository is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDynamo {
    movies: Arc<RwLock<BTreeMap<(i32, String), Movie>>>,
    seeds: Arc<RwLock<BTreeMap<(i32, String), serde_json::Value>>>,
    readings: Arc<RwLock<BTreeMap<(i64, String), MachineReading>>>,
}

impl InMemoryDynamo {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `info` document stored for a seeded movie.
    pub async fn seed_info(&self, year: i32, title: &str) -> Option<serde_json::Value> {
        let seeds = self.seeds.read().await;
        seeds.get(&(year, title.to_string())).cloned()
    }

    pub async fn reading_count(&self) -> usize {
        self.readings.read().await.len()
    }
}

#[async_trait]
impl MovieRepository for InMemoryDynamo {
    async fn get_movie(&self, year: i32, title: &str) -> Result<Option<Movie>> {
        let movies = self.movies.read().await;
        Ok(movies.get(&(year, title.to_string())).cloned())
    }

    async fn batch_get_movies(&self, keys: &[(i32, String)]) -> Result<Vec<Movie>> {
        let movies = self.movies.read().await;
        Ok(keys.iter().filter_map(|key| movies.get(key).cloned()).collect())
    }

    async fn put_movie_if_absent(&self, movie: &Movie) -> Result<bool> {
        let mut movies = self.movies.write().await;
        let key = (movie.year, movie.title.clone());
        if movies.contains_key(&key) {
            return Ok(false);
        }
        movies.insert(key, movie.clone());
        Ok(true)
    }

    async fn save_movie(&self, movie: &Movie) -> Result<()> {
        let mut movies = self.movies.write().await;
        movies.insert((movie.year, movie.title.clone()), movie.clone());
        Ok(())
    }

    async fn load_seed(&self, seed: &MovieSeed) -> Result<()> {
        let key = (seed.year, seed.title.clone());
        self.movies
            .write()
            .await
            .insert(key.clone(), Movie::new(seed.year, seed.title.clone()));
        self.seeds.write().await.insert(key, seed.info.clone());
        Ok(())
    }

    async fn query_by_year(&self, year: i32, limit: i32) -> Result<Vec<Movie>> {
        let movies = self.movies.read().await;
        Ok(movies
            .values()
            .filter(|movie| movie.year == year)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn query_by_title(&self, title: &str) -> Result<Option<Movie>> {
        let movies = self.movies.read().await;
        Ok(movies.values().find(|movie| movie.title == title).cloned())
    }
}

#[async_trait]
impl MachineRepository for InMemoryDynamo {
    async fn get_reading(
        &self,
        machine_id: i64,
        machine_type: &str,
    ) -> Result<Option<MachineReading>> {
        let readings = self.readings.read().await;
        Ok(readings
            .get(&(machine_id, machine_type.to_string()))
            .cloned())
    }

    async fn find_by_name(&self, machine_name: &str) -> Result<Option<MachineReading>> {
        let readings = self.readings.read().await;
        Ok(readings
            .values()
            .find(|reading| reading.machine_name.as_deref() == Some(machine_name))
            .cloned())
    }

    async fn query_by_temperature(
        &self,
        temperature: &str,
        limit: i32,
    ) -> Result<Vec<MachineReading>> {
        let readings = self.readings.read().await;
        Ok(readings
            .values()
            .filter(|reading| reading.temperature.as_deref() == Some(temperature))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn save_reading(&self, reading: &MachineReading) -> Result<()> {
        let mut readings = self.readings.write().await;
        readings.insert(
            (reading.machine_id, reading.machine_type.clone()),
            reading.clone(),
        );
        Ok(())
    }
}
