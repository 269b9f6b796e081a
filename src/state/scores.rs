use bloons_revenge::leaderboard::{STORAGE_KEY, ScoreRecord, ScoreStore, StoreError};
use web_sys::Storage;

/// High scores kept in `window.localStorage` as one JSON array.
#[derive(Clone, Debug, Default)]
pub struct LocalStorageScores;

fn storage() -> Result<Storage, StoreError> {
    let win = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
    match win.local_storage() {
        Ok(Some(store)) => Ok(store),
        Ok(None) => Err(StoreError::Unavailable("localStorage disabled".into())),
        Err(e) => Err(StoreError::Unavailable(format!("{e:?}"))),
    }
}

impl ScoreStore for LocalStorageScores {
    fn load(&self) -> Result<Vec<ScoreRecord>, StoreError> {
        let raw = storage()?
            .get_item(STORAGE_KEY)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, records: &[ScoreRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        storage()?
            .set_item(STORAGE_KEY, &raw)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        storage()?
            .remove_item(STORAGE_KEY)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }
}
