//! Best-score persistence.

pub const HIGH_SCORE_KEY: &str = "tetris_highscore";

pub trait ScoreStore {
    fn load(&self) -> Option<u32>;
    fn save(&mut self, score: u32);
}

/// `window.localStorage`, when the page has one.
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
}

impl LocalStorageStore {
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        Self { storage }
    }
}

impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStore for LocalStorageStore {
    fn load(&self) -> Option<u32> {
        let raw = self.storage.as_ref()?.get_item(HIGH_SCORE_KEY).ok()??;
        raw.trim().parse().ok()
    }

    fn save(&mut self, score: u32) {
        if let Some(storage) = self.storage.as_ref() {
            // private browsing can refuse writes; the in-memory best still holds
            let _ = storage.set_item(HIGH_SCORE_KEY, &score.to_string());
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    value: Option<u32>,
}

impl ScoreStore for MemoryStore {
    fn load(&self) -> Option<u32> {
        self.value
    }

    fn save(&mut self, score: u32) {
        self.value = Some(score);
    }
}

pub struct HighScore<S: ScoreStore> {
    best: u32,
    store: S,
}

impl<S: ScoreStore> HighScore<S> {
    pub fn load(store: S) -> Self {
        let best = store.load().unwrap_or(0);
        Self { best, store }
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    /// Stores `score` if it beats the best so far. Returns true on a new best.
    pub fn record(&mut self, score: u32) -> bool {
        if score <= self.best {
            return false;
        }
        self.best = score;
        self.store.save(score);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_from_stored_value() {
        let hs = HighScore::load(MemoryStore { value: Some(1200) });
        assert_eq!(hs.best(), 1200);
        let hs = HighScore::load(MemoryStore::default());
        assert_eq!(hs.best(), 0);
    }

    #[test]
    fn only_higher_scores_are_written() {
        let mut hs = HighScore::load(MemoryStore { value: Some(300) });
        assert!(!hs.record(100));
        assert!(!hs.record(300));
        assert_eq!(hs.store.value, Some(300));
        assert!(hs.record(340));
        assert_eq!(hs.best(), 340);
        assert_eq!(hs.store.value, Some(340));
    }
}
