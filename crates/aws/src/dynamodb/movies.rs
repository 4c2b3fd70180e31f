//! DynamoDB repository for the Movies table.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client;

use cloudkit_core::dynamo::{Movie, MovieRepository, MovieSeed, TITLE_INDEX};
use cloudkit_core::{Result, ServiceError};

use super::conversions::{item_to_movie, movie_key, movie_to_item, seed_to_item, Item};
use crate::error::{
    map_batch_get_error, map_build_error, map_get_item_error, map_put_item_error, map_query_error,
};

/// BatchGetItem accepts at most this many keys per request.
const BATCH_GET_LIMIT: usize = 100;

/// Unprocessed keys are retried this many times after the first request.
const BATCH_GET_RETRIES: u32 = 3;

/// Wait before the first retry; doubled for each retry after it.
const BATCH_GET_BACKOFF: Duration = Duration::from_millis(100);

/// Delay before the given retry, counting from 1.
fn batch_backoff(retry: u32) -> Duration {
    BATCH_GET_BACKOFF * 2u32.pow(retry.saturating_sub(1))
}

pub struct DynamoMovies {
    client: Client,
    table_name: String,
}

impl DynamoMovies {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn batch_get_chunk(&self, keys: Vec<Item>) -> Result<Vec<Movie>> {
        let mut movies = Vec::new();
        let mut pending = keys;

        for attempt in 0..=BATCH_GET_RETRIES {
            if pending.is_empty() {
                break;
            }
            if attempt > 0 {
                let delay = batch_backoff(attempt);
                tracing::debug!(
                    retry = attempt,
                    unprocessed = pending.len(),
                    ?delay,
                    "retrying batch get"
                );
                tokio::time::sleep(delay).await;
            }
            let request = KeysAndAttributes::builder()
                .set_keys(Some(std::mem::take(&mut pending)))
                .build()
                .map_err(map_build_error)?;

            let output = self
                .client
                .batch_get_item()
                .request_items(&self.table_name, request)
                .send()
                .await
                .map_err(map_batch_get_error)?;

            if let Some(items) = output
                .responses()
                .and_then(|responses| responses.get(&self.table_name))
            {
                for item in items {
                    movies.push(item_to_movie(item)?);
                }
            }

            if let Some(unprocessed) = output
                .unprocessed_keys()
                .and_then(|unprocessed| unprocessed.get(&self.table_name))
            {
                pending = unprocessed.keys().to_vec();
            }
        }

        if !pending.is_empty() {
            return Err(ServiceError::RequestFailed(format!(
                "{} movie keys were left unprocessed",
                pending.len()
            )));
        }
        Ok(movies)
    }
}

#[async_trait]
impl MovieRepository for DynamoMovies {
    async fn get_movie(&self, year: i32, title: &str) -> Result<Option<Movie>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(movie_key(year, title)))
            .send()
            .await
            .map_err(|e| map_get_item_error(e, "Movie", format!("{} {}", year, title)))?;

        match result.item {
            Some(item) => Ok(Some(item_to_movie(&item)?)),
            None => Ok(None),
        }
    }

    async fn batch_get_movies(&self, keys: &[(i32, String)]) -> Result<Vec<Movie>> {
        let mut movies = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(BATCH_GET_LIMIT) {
            let chunk_keys = chunk
                .iter()
                .map(|(year, title)| movie_key(*year, title))
                .collect();
            movies.extend(self.batch_get_chunk(chunk_keys).await?);
        }
        Ok(movies)
    }

    async fn put_movie_if_absent(&self, movie: &Movie) -> Result<bool> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(movie_to_item(movie)))
            .condition_expression("attribute_not_exists(#yr)")
            .expression_attribute_names("#yr", "year")
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Movie", movie.key_display()));

        match result {
            Ok(_) => Ok(true),
            Err(ServiceError::AlreadyExists { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn save_movie(&self, movie: &Movie) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(movie_to_item(movie)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Movie", movie.key_display()))?;

        Ok(())
    }

    async fn load_seed(&self, seed: &MovieSeed) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(seed_to_item(seed)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, "Movie", format!("{} {}", seed.year, seed.title)))?;

        Ok(())
    }

    async fn query_by_year(&self, year: i32, limit: i32) -> Result<Vec<Movie>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#yr = :yyyy")
            .expression_attribute_names("#yr", "year")
            .expression_attribute_values(":yyyy", AttributeValue::N(year.to_string()))
            .limit(limit)
            .send()
            .await
            .map_err(map_query_error)?;

        result.items().iter().map(item_to_movie).collect()
    }

    async fn query_by_title(&self, title: &str) -> Result<Option<Movie>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(TITLE_INDEX)
            .key_condition_expression("#title = :title")
            .expression_attribute_names("#title", "title")
            .expression_attribute_values(":title", AttributeValue::S(title.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(map_query_error)?;

        result.items().first().map(item_to_movie).transpose()
    }
}
