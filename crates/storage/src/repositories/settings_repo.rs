use chrono::Utc;
use sqlx::SqlitePool;

use common::models::{Preset, UserSettings};

use crate::StorageError;

pub struct SettingsRepository;

#[derive(sqlx::FromRow)]
struct SettingsRow {
    user_id: String,
    preset: String,
    modules_json: String,
    watchlist_json: String,
    combo_min_score: i32,
}

impl SettingsRepository {
    /// Loads the user's settings, persisting defaults on first contact.
    pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<UserSettings, StorageError> {
        let row: Option<SettingsRow> = sqlx::query_as(
            "SELECT user_id, preset, modules_json, watchlist_json, combo_min_score
             FROM user_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => {
                let preset = Preset::parse(&row.preset).ok_or_else(|| {
                    StorageError::corrupt("user_settings", format!("preset '{}'", row.preset))
                })?;
                let modules = serde_json::from_str(&row.modules_json).map_err(|e| {
                    StorageError::corrupt("user_settings", format!("modules_json: {}", e))
                })?;
                let watchlist = serde_json::from_str(&row.watchlist_json).map_err(|e| {
                    StorageError::corrupt("user_settings", format!("watchlist_json: {}", e))
                })?;
                Ok(UserSettings {
                    user_id: row.user_id,
                    preset,
                    watchlist,
                    modules,
                    combo_min_score: row.combo_min_score,
                })
            }
            None => {
                let defaults = UserSettings::defaults_for(user_id);
                Self::save(pool, &defaults).await?;
                Ok(defaults)
            }
        }
    }

    pub async fn save(pool: &SqlitePool, settings: &UserSettings) -> Result<(), StorageError> {
        let modules_json = serde_json::to_string(&settings.modules)
            .map_err(|e| StorageError::corrupt("user_settings", e.to_string()))?;
        let watchlist_json = serde_json::to_string(&settings.watchlist)
            .map_err(|e| StorageError::corrupt("user_settings", e.to_string()))?;

        sqlx::query(
            "INSERT INTO user_settings(user_id, preset, modules_json, watchlist_json, combo_min_score, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                preset = excluded.preset,
                modules_json = excluded.modules_json,
                watchlist_json = excluded.watchlist_json,
                combo_min_score = excluded.combo_min_score,
                updated_at = excluded.updated_at",
        )
        .bind(&settings.user_id)
        .bind(settings.preset.as_str())
        .bind(modules_json)
        .bind(watchlist_json)
        .bind(settings.combo_min_score)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
        Ok(())
    }
}
