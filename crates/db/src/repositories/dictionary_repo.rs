//! Repository for the `cities` and `agreements` dictionaries.

use sqlx::PgPool;

use crate::models::dictionary::{Agreement, City, CreateAgreement, CreateCity};

pub struct DictionaryRepo;

impl DictionaryRepo {
    pub async fn create_city(pool: &PgPool, input: &CreateCity) -> Result<City, sqlx::Error> {
        sqlx::query_as::<_, City>(
            "INSERT INTO cities (name) VALUES ($1) RETURNING id, name, created_at, updated_at",
        )
        .bind(&input.name)
        .fetch_one(pool)
        .await
    }

    pub async fn list_cities(pool: &PgPool) -> Result<Vec<City>, sqlx::Error> {
        sqlx::query_as::<_, City>(
            "SELECT id, name, created_at, updated_at FROM cities ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn create_agreement(
        pool: &PgPool,
        input: &CreateAgreement,
    ) -> Result<Agreement, sqlx::Error> {
        sqlx::query_as::<_, Agreement>(
            "INSERT INTO agreements (number) VALUES ($1) \
             RETURNING id, number, created_at, updated_at",
        )
        .bind(&input.number)
        .fetch_one(pool)
        .await
    }
}
