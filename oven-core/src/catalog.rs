//! Heating program catalog
//!
//! Programs live in a single JSON file holding the whole list. Every
//! mutation rewrites that file through a temporary sibling and a rename, so
//! readers never see a half-written list. Writers inside this process are
//! serialized by a mutex; separate processes sharing the file still race
//! (last writer wins).
//!
//! The first `default_count` ids are the seeded stock programs and cannot be
//! removed. Programs may run longer than the manual 120 s ceiling since they
//! are validated when added.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::appliance::{ValidationError, validate_power, validate_time};

/// Ids `1..=DEFAULT_PROGRAM_COUNT` are the stock programs
pub const DEFAULT_PROGRAM_COUNT: u32 = 5;

/// Glyphs used to draw a custom program's heating progress.
/// Stock programs carry their own.
const DISPLAY_CHARACTERS: &[char] = &['#', '@', '%', '&', '$', '~', '+', '^'];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Program file not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to access program file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse program file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Default programs cannot be removed")]
    DefaultProgram(u32),

    #[error("Program {0} not found")]
    NotFound(u32),
}

impl CatalogError {
    /// True for failures of the backing file rather than of the request
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Missing(_) | Self::Io(_) | Self::Parse(_))
    }
}

/// A stored heating program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: u32,
    pub name: String,
    pub food: String,
    /// Duration in seconds
    pub time: u32,
    pub power: u8,
    pub character: char,
    #[serde(default)]
    pub instructions: String,
}

/// A program as listed, annotated with whether it is a stock program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    #[serde(flatten)]
    pub program: Program,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
}

/// Fields supplied when adding a program
#[derive(Debug, Clone)]
pub struct NewProgram {
    pub name: String,
    pub food: String,
    pub time: u32,
    pub power: u8,
    pub instructions: String,
}

/// File-backed program list
pub struct ProgramCatalog {
    path: PathBuf,
    default_count: u32,
    write_lock: Mutex<()>,
}

impl ProgramCatalog {
    /// Catalog at `path` protecting the stock ids
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_default_count(path, DEFAULT_PROGRAM_COUNT)
    }

    /// Catalog whose ids `1..=default_count` are protected from removal.
    /// Zero protects nothing.
    pub fn with_default_count(path: impl Into<PathBuf>, default_count: u32) -> Self {
        Self {
            path: path.into(),
            default_count,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_default(&self, id: u32) -> bool {
        id <= self.default_count
    }

    /// All programs in file order
    pub fn list(&self) -> Result<Vec<ProgramEntry>, CatalogError> {
        Ok(self
            .read()?
            .into_iter()
            .map(|program| ProgramEntry {
                is_default: self.is_default(program.id),
                program,
            })
            .collect())
    }

    pub fn get(&self, id: u32) -> Result<Program, CatalogError> {
        self.read()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Validate and append a program, assigning the next id
    pub fn add(&self, new: NewProgram) -> Result<Program, CatalogError> {
        validate_time(new.time, true)?;
        validate_power(new.power)?;
        if new.name.trim().is_empty() {
            return Err(CatalogError::EmptyField("name"));
        }
        if new.food.trim().is_empty() {
            return Err(CatalogError::EmptyField("food"));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut programs = self.read()?;

        let id = programs.iter().map(|p| p.id).max().map_or(1, |max| max + 1);
        let character = DISPLAY_CHARACTERS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or('#');

        let program = Program {
            id,
            name: new.name,
            food: new.food,
            time: new.time,
            power: new.power,
            character,
            instructions: new.instructions,
        };
        programs.push(program.clone());
        self.write(&programs)?;

        tracing::info!("Added program {} ({})", program.id, program.name);
        Ok(program)
    }

    /// Remove a custom program by id
    pub fn remove(&self, id: u32) -> Result<(), CatalogError> {
        if self.is_default(id) {
            return Err(CatalogError::DefaultProgram(id));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut programs = self.read()?;

        let before = programs.len();
        programs.retain(|p| p.id != id);
        if programs.len() == before {
            return Err(CatalogError::NotFound(id));
        }

        self.write(&programs)?;
        tracing::info!("Removed program {}", id);
        Ok(())
    }

    /// Write the stock programs if the file does not exist yet.
    /// Returns whether anything was written.
    pub fn seed_defaults(&self) -> Result<bool, CatalogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        self.write(&default_programs())?;
        tracing::info!("Seeded default programs at {}", self.path.display());
        Ok(true)
    }

    // Private helpers

    fn read(&self) -> Result<Vec<Program>, CatalogError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, programs: &[Program]) -> Result<(), CatalogError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let content = serde_json::to_string_pretty(programs)?;
        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            if let Err(rm) = std::fs::remove_file(&tmp) {
                tracing::warn!("Failed to remove {}: {}", tmp.display(), rm);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// The stock programs, ids 1 to 5
pub fn default_programs() -> Vec<Program> {
    let stock = [
        (
            "Pipoca",
            "Pipoca (de micro-ondas)",
            180,
            7,
            '*',
            "Observar o barulho de estouros do milho, caso houver um intervalo de mais de 10 segundos entre um estouro e outro, interrompa o aquecimento.",
        ),
        (
            "Leite",
            "Leite",
            300,
            5,
            '~',
            "Cuidado com aquecimento de líquidos, o choque térmico aliado ao movimento do recipiente pode causar fervura imediata causando risco de queimaduras.",
        ),
        (
            "Carnes de boi",
            "Carne em pedaço ou fatias",
            840,
            4,
            '=',
            "Interrompa o processo na metade e vire o conteúdo com a parte de baixo para cima para o descongelamento uniforme.",
        ),
        (
            "Frango",
            "Frango (qualquer corte)",
            480,
            7,
            '-',
            "Interrompa o processo na metade e vire o conteúdo com a parte de baixo para cima para o descongelamento uniforme.",
        ),
        (
            "Feijão",
            "Feijão congelado",
            480,
            9,
            ':',
            "Deixe o recipiente destampado e em casos de plástico, cuidado ao retirar o recipiente pois o mesmo pode perder resistência em altas temperaturas.",
        ),
    ];

    stock
        .into_iter()
        .zip(1..)
        .map(|((name, food, time, power, character, instructions), id)| Program {
            id,
            name: name.to_string(),
            food: food.to_string(),
            time,
            power,
            character,
            instructions: instructions.to_string(),
        })
        .collect()
}
