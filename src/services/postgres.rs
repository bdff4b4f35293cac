use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::core::distance::{calculate_bounding_box, haversine_distance};
use crate::models::{
    ActivityLevel, GeoPoint, InsertOutcome, Match, NearbyProfile, Preferences, Profile,
    SwipeAction, SwipeHistory, UserPair,
};
use crate::services::store::{GeoIndex, MatchStore, ProfileSource, StoreError, SwipeStore};

/// PostgreSQL backend
///
/// Uniqueness of likes, passes and matches rests on the table constraints;
/// every insert is `INSERT ... ON CONFLICT DO NOTHING` and the affected row
/// count tells a fresh insert from a duplicate. Reads that tolerate lag go
/// to `read_pool`, which is the primary unless a replica is configured.
pub struct PostgresStore {
    pool: PgPool,
    read_pool: PgPool,
}

impl PostgresStore {
    /// Connect to the primary (and replica, if configured) and run migrations
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL (max {} connections)", settings.max_connections());

        let pool = Self::pool_options(settings).connect(&settings.url).await?;

        if settings.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        let read_pool = match &settings.replica_url {
            Some(url) => {
                tracing::info!("Serving relaxed reads from replica");
                Self::pool_options(settings).connect(url).await?
            }
            None => pool.clone(),
        };

        Ok(Self { pool, read_pool })
    }

    fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(settings.max_connections())
            .min_connections(settings.min_connections.unwrap_or(1))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)))
            .test_before_acquire(true)
    }
}

fn profile_from_row(row: &PgRow) -> Result<Profile, StoreError> {
    let user_id: String = row.try_get("user_id")?;
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;

    Ok(Profile {
        age: age_from_row(row, "age", &user_id)?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        location: latitude
            .zip(longitude)
            .map(|(lat, lon)| GeoPoint::new(lat, lon)),
        created_at: row.try_get("created_at")?,
        user_id,
    })
}

fn preferences_from_row(row: &PgRow) -> Result<Preferences, StoreError> {
    let user_id: String = row.try_get("user_id")?;

    Ok(Preferences {
        min_age: age_from_row(row, "min_age", &user_id)?,
        max_age: age_from_row(row, "max_age", &user_id)?,
        max_distance: row.try_get("max_distance")?,
        distance_unit: row.try_get("distance_unit")?,
        activity_level: row.try_get("activity_level")?,
        user_id,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    Ok(Match {
        id: row.try_get("id")?,
        low_id: row.try_get("low_id")?,
        high_id: row.try_get("high_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn age_from_row(row: &PgRow, column: &str, user_id: &str) -> Result<u8, StoreError> {
    let age: i16 = row.try_get(column)?;
    u8::try_from(age)
        .map_err(|_| StoreError::Corrupt(format!("{} = {} for {}", column, age, user_id)))
}

#[async_trait]
impl ProfileSource for PostgresStore {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let query = r#"
            SELECT user_id, name, age, bio, latitude, longitude, created_at
            FROM profiles
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.read_pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        let query = r#"
            SELECT user_id, min_age, max_age, max_distance, distance_unit, activity_level
            FROM user_preferences
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.read_pool)
            .await?;

        row.as_ref().map(preferences_from_row).transpose()
    }
}

#[async_trait]
impl GeoIndex for PostgresStore {
    /// Bounding-box prefilter on the location index, exact haversine in Rust
    async fn within_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbyProfile>, StoreError> {
        let bbox = calculate_bounding_box(center.latitude, center.longitude, radius_m);

        let query = r#"
            SELECT p.user_id, p.name, p.age, p.bio, p.latitude, p.longitude,
                   up.activity_level
            FROM profiles p
            LEFT JOIN user_preferences up ON up.user_id = p.user_id
            WHERE p.latitude IS NOT NULL
              AND p.longitude IS NOT NULL
              AND p.latitude BETWEEN $1 AND $2
              AND CASE
                    WHEN $3 <= $4 THEN p.longitude BETWEEN $3 AND $4
                    ELSE p.longitude >= $3 OR p.longitude <= $4
                  END
        "#;

        let rows = sqlx::query(query)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .fetch_all(&self.read_pool)
            .await?;

        let mut nearby = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_id: String = row.try_get("user_id")?;
            let latitude: f64 = row.try_get("latitude")?;
            let longitude: f64 = row.try_get("longitude")?;

            let distance_m =
                haversine_distance(center.latitude, center.longitude, latitude, longitude);
            if distance_m > radius_m {
                continue;
            }

            nearby.push(NearbyProfile {
                age: age_from_row(row, "age", &user_id)?,
                name: row.try_get("name")?,
                bio: row.try_get("bio")?,
                activity_level: row.try_get::<Option<ActivityLevel>, _>("activity_level")?,
                user_id,
                distance_m,
            });
        }

        tracing::debug!(
            "Radius query returned {} of {} bounding-box rows",
            nearby.len(),
            rows.len()
        );

        Ok(nearby)
    }
}

#[async_trait]
impl SwipeStore for PostgresStore {
    async fn insert_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> Result<InsertOutcome, StoreError> {
        let query = match action {
            SwipeAction::Like => {
                r#"
                INSERT INTO likes (actor_id, target_id, created_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (actor_id, target_id) DO NOTHING
                "#
            }
            SwipeAction::Pass => {
                r#"
                INSERT INTO passes (actor_id, target_id, created_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (actor_id, target_id) DO NOTHING
                "#
            }
        };

        let result = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                tracing::debug!("Recorded {}: {} -> {}", action, actor_id, target_id);
                Ok(InsertOutcome::Inserted)
            }
            Ok(_) => Ok(InsertOutcome::AlreadyExists),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                let missing = match db.constraint() {
                    Some(name) if name.contains("target_id") => target_id,
                    _ => actor_id,
                };
                Err(StoreError::MissingReference(missing.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn like_exists(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM likes WHERE actor_id = $1 AND target_id = $2
            ) AS found
        "#;

        let row = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("found")?)
    }

    /// One statement, so all three sets come from the same snapshot
    async fn swipe_history(&self, user_id: &str) -> Result<SwipeHistory, StoreError> {
        let query = r#"
            SELECT 'like' AS kind, target_id AS other_id FROM likes WHERE actor_id = $1
            UNION ALL
            SELECT 'pass', target_id FROM passes WHERE actor_id = $1
            UNION ALL
            SELECT 'match', CASE WHEN low_id = $1 THEN high_id ELSE low_id END
            FROM matches
            WHERE low_id = $1 OR high_id = $1
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.read_pool)
            .await?;

        let mut history = SwipeHistory::default();
        for row in &rows {
            let kind: String = row.try_get("kind")?;
            let other: String = row.try_get("other_id")?;
            match kind.as_str() {
                "like" => history.liked.insert(other),
                "pass" => history.passed.insert(other),
                "match" => history.matched.insert(other),
                unknown => {
                    return Err(StoreError::Corrupt(format!("unknown history kind {}", unknown)));
                }
            };
        }

        tracing::debug!(
            "User {} history: {} liked, {} passed, {} matched",
            user_id,
            history.liked.len(),
            history.passed.len(),
            history.matched.len()
        );

        Ok(history)
    }

    async fn try_insert_match(&self, new_match: &Match) -> Result<InsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO matches (id, low_id, high_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (low_id, high_id) DO NOTHING
            "#,
        )
        .bind(new_match.id)
        .bind(&new_match.low_id)
        .bind(&new_match.high_id)
        .bind(new_match.created_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(InsertOutcome::AlreadyExists);
        }

        sqlx::query(
            r#"
            INSERT INTO match_events (match_id, low_id, high_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(new_match.id)
        .bind(&new_match.low_id)
        .bind(&new_match.high_id)
        .bind(new_match.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InsertOutcome::Inserted)
    }

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError> {
        let query = r#"
            SELECT id, low_id, high_id, created_at
            FROM matches
            WHERE low_id = $1 AND high_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn matches_for(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        let query = r#"
            SELECT id, low_id, high_id, created_at
            FROM matches
            WHERE low_id = $1 OR high_id = $1
            ORDER BY created_at DESC, id
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.read_pool)
            .await?;

        rows.iter().map(match_from_row).collect()
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
