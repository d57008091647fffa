use anyhow::Result;

use crate::migrate::RawState;
use crate::model::settings::Settings;
use crate::model::state::State;

/// Seam between the store and the persistence medium. The store never
/// assumes a save succeeded; a failed write leaves the in-memory state
/// valid and is reported to the caller.
pub trait StateRepository {
    /// Reads the persisted blobs without assuming their shape; migration
    /// happens on the loaded values, not here.
    fn load_raw(&self) -> Result<RawState>;
    fn load_settings(&self) -> Result<Settings>;
    fn save_state(&self, state: &State) -> Result<()>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;
    /// Removes every persisted key.
    fn clear(&self) -> Result<()>;
}
