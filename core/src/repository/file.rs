use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::migrate::RawState;
use crate::model::settings::{settings_from_strings, Settings};
use crate::model::state::State;
use crate::repository::traits::StateRepository;

// One file per persisted key, mirroring the original key-value layout.
const TIMETABLE_FILE: &str = "timetable.json";
const SUBJECTS_FILE: &str = "subjects_master.json";
const ATTENDANCE_FILE: &str = "attendance.json";
const HISTORY_FILE: &str = "monthly_history.json";
const CURRENT_MONTH_FILE: &str = "current_month";
const GOAL_FILE: &str = "attendance_goal";
const THEME_FILE: &str = "theme";
const ACCENT_FILE: &str = "accent_color";

const JSON_FILES: [&str; 4] = [TIMETABLE_FILE, SUBJECTS_FILE, ATTENDANCE_FILE, HISTORY_FILE];
const TEXT_FILES: [&str; 4] = [CURRENT_MONTH_FILE, GOAL_FILE, THEME_FILE, ACCENT_FILE];

pub struct FileStateRepository {
    data_dir: PathBuf,
}

impl FileStateRepository {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let path = match base_dir {
            Some(dir) => dir,
            None => {
                let home_dir =
                    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
                home_dir.join(".attendo")
            }
        };
        fs::create_dir_all(&path)
            .with_context(|| format!("creating data directory {}", path.display()))?;
        Ok(FileStateRepository { data_dir: path })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Missing file -> `Null`. Unparseable content is passed through as a
    /// raw string so the loader records the recovery instead of the key
    /// silently vanishing.
    fn read_json(&self, name: &str) -> Result<Value> {
        let path = self.data_dir.join(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Value::Null),
            Err(err) => return Err(err).with_context(|| format!("opening {}", path.display())),
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!("unparseable JSON in {}: {err}", path.display());
                let text = fs::read_to_string(&path).unwrap_or_default();
                Ok(Value::String(text))
            }
        }
    }

    fn read_text(&self, name: &str) -> Result<Option<String>> {
        let path = self.data_dir.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.data_dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("writing {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }

    fn write_text(&self, name: &str, value: &str) -> Result<()> {
        let path = self.data_dir.join(name);
        fs::write(&path, value).with_context(|| format!("writing {}", path.display()))
    }
}

impl StateRepository for FileStateRepository {
    fn load_raw(&self) -> Result<RawState> {
        Ok(RawState {
            timetable: self.read_json(TIMETABLE_FILE)?,
            subjects: self.read_json(SUBJECTS_FILE)?,
            attendance: self.read_json(ATTENDANCE_FILE)?,
            history: self.read_json(HISTORY_FILE)?,
            current_month: self.read_text(CURRENT_MONTH_FILE)?,
        })
    }

    fn load_settings(&self) -> Result<Settings> {
        let goal = self.read_text(GOAL_FILE)?;
        let theme = self.read_text(THEME_FILE)?;
        let accent = self.read_text(ACCENT_FILE)?;
        Ok(settings_from_strings(
            goal.as_deref(),
            theme.as_deref(),
            accent.as_deref(),
        ))
    }

    fn save_state(&self, state: &State) -> Result<()> {
        self.write_json(TIMETABLE_FILE, &state.timetable)?;
        self.write_json(SUBJECTS_FILE, &state.subjects)?;
        self.write_json(ATTENDANCE_FILE, &state.attendance)?;
        self.write_json(HISTORY_FILE, &state.history)?;
        self.write_text(CURRENT_MONTH_FILE, state.current_month.as_deref().unwrap_or(""))
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_text(GOAL_FILE, &settings.goal.to_string())?;
        self.write_text(THEME_FILE, settings.theme.as_str())?;
        self.write_text(ACCENT_FILE, &settings.accent)
    }

    fn clear(&self) -> Result<()> {
        for name in JSON_FILES.iter().chain(TEXT_FILES.iter()) {
            let path = self.data_dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| format!("removing {}", path.display()))
                }
            }
        }
        Ok(())
    }
}
