//! SQLite raw series storage.

use crate::domain::decode::decode_date;
use crate::domain::error::FeatureError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::series_port::RawSeriesPort;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteSeriesStore {
    pool: Pool<SqliteConnectionManager>,
}

fn db_error(e: impl std::fmt::Display) -> FeatureError {
    FeatureError::Database {
        reason: e.to_string(),
    }
}

impl SqliteSeriesStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FeatureError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FeatureError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, FeatureError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), FeatureError> {
        let conn = self.pool.get().map_err(db_error)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ohlcv (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL,
                PRIMARY KEY (code, date)
            );
            CREATE INDEX IF NOT EXISTS idx_ohlcv_code ON ohlcv(code);",
        )
        .map_err(db_error)?;

        Ok(())
    }
}

impl RawSeriesPort for SqliteSeriesStore {
    fn load_raw(&self, code: &str) -> Result<Option<Vec<OhlcvBar>>, FeatureError> {
        let conn = self.pool.get().map_err(db_error)?;

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM ohlcv
                 WHERE code = ?1
                 ORDER BY date DESC",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params![code], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    OhlcvBar {
                        date: NaiveDate::MIN,
                        open: row.get(1)?,
                        high: row.get(2)?,
                        low: row.get(3)?,
                        close: row.get(4)?,
                        volume: row.get(5)?,
                    },
                ))
            })
            .map_err(db_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date_str, mut bar) = row.map_err(db_error)?;
            let Some(date) = decode_date(&date_str) else {
                tracing::warn!(code, value = %date_str, "undecodable date; row skipped");
                continue;
            };
            bar.date = date;
            bars.push(bar);
        }

        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some(bars))
    }

    fn save_raw(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), FeatureError> {
        let mut conn = self.pool.get().map_err(db_error)?;
        let tx = conn.transaction().map_err(db_error)?;

        tx.execute("DELETE FROM ohlcv WHERE code = ?1", params![code])
            .map_err(db_error)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (code, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(db_error)?;
        }

        tx.commit().map_err(db_error)?;
        tracing::debug!(code, rows = bars.len(), "saved raw series to sqlite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn bar(day: u32, close: f64, volume: Option<f64>) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    fn store() -> SqliteSeriesStore {
        let store = SqliteSeriesStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store
    }

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteSeriesStore::from_config(&config);
        match result {
            Err(FeatureError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn empty_code_is_initial_creation() {
        assert!(store().load_raw("2586").unwrap().is_none());
    }

    #[test]
    fn save_then_load_newest_first() {
        let store = store();
        let bars = vec![bar(1, 100.5, Some(1000.0)), bar(3, 101.5, None), bar(2, 99.0, Some(1.0))];
        store.save_raw("2586", &bars).unwrap();

        let loaded = store.load_raw("2586").unwrap().unwrap();
        assert_eq!(loaded, vec![bars[1].clone(), bars[2].clone(), bars[0].clone()]);
        assert!(store.load_raw("7203").unwrap().is_none());
    }

    #[test]
    fn undecodable_date_row_is_skipped() {
        let store = store();
        store
            .save_raw("2586", &[bar(3, 30.0, Some(300.0)), bar(2, 20.0, None)])
            .unwrap();
        store
            .pool
            .get()
            .unwrap()
            .execute(
                "INSERT INTO ohlcv (code, date, open, high, low, close, volume)
                 VALUES ('2586', 'not-a-date', 1, 1, 1, 1, NULL)",
                [],
            )
            .unwrap();

        let bars = store.load_raw("2586").unwrap().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(bars[1].close, 20.0);
    }

    #[test]
    fn save_replaces_previous_series() {
        let store = store();
        store.save_raw("2586", &[bar(1, 1.0, None), bar(2, 2.0, None)]).unwrap();
        store.save_raw("2586", &[bar(5, 5.0, None)]).unwrap();

        let loaded = store.load_raw("2586").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 5.0);
    }

    #[test]
    fn raw_path_is_not_file_based() {
        assert!(store().raw_path("2586").is_none());
    }
}
