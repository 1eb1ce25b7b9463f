//! Persona catalogue used to prime the remote party.
//!
//! The resource is a list of records separated by `||`. Each record holds one
//! trait per line, every line starting with `your persona: `.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::{Lazy, OnceCell};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::{ClientError, Result};

pub const PERSONA_PREFIX: &str = "your persona: ";
pub const PERSONA_LIST: &str = "personas_list.txt";
const RECORD_DELIMITER: &str = "||";

/// Source of named text resources.
pub trait ResourceLoader: Send + Sync {
    fn read(&self, name: &str) -> Result<String>;
}

/// Resources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledResources;

impl ResourceLoader for BundledResources {
    fn read(&self, name: &str) -> Result<String> {
        match name {
            PERSONA_LIST => Ok(include_str!("../data/personas_list.txt").to_owned()),
            other => Err(ClientError::ResourceNotFound(other.to_owned())),
        }
    }
}

/// Resources read from a directory at runtime.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ResourceLoader for DirectoryResources {
    fn read(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ClientError::ResourceNotFound(path.display().to_string()),
            _ => ClientError::Io(err),
        })
    }
}

/// One persona: an ordered list of first-person trait sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    traits: Vec<String>,
}

impl Persona {
    pub fn new(traits: Vec<String>) -> Self {
        Self { traits }
    }

    pub fn traits(&self) -> &[String] {
        &self.traits
    }

    pub fn into_traits(self) -> Vec<String> {
        self.traits
    }
}

/// Split a persona list into personas, dropping records without any trait.
pub fn parse(raw: &str) -> Result<Vec<Persona>> {
    let personas: Vec<Persona> = raw
        .split(RECORD_DELIMITER)
        .map(|record| {
            record
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.strip_prefix(PERSONA_PREFIX).unwrap_or(line).to_owned())
                .collect::<Vec<_>>()
        })
        .filter(|traits| !traits.is_empty())
        .map(Persona::new)
        .collect();

    if personas.is_empty() {
        return Err(ClientError::Malformed(
            "persona list contains no records".into(),
        ));
    }
    Ok(personas)
}

/// Build the single turn that primes the server with the given traits.
pub fn compose_persona_turn<S: AsRef<str>>(traits: &[S]) -> String {
    traits
        .iter()
        .map(|persona| format!("{PERSONA_PREFIX}{}", persona.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lazily loaded persona list. Both the raw resource and the parsed result
/// are computed at most once, even under concurrent first access.
pub struct PersonaCatalog {
    loader: Box<dyn ResourceLoader>,
    raw: OnceCell<String>,
    personas: OnceCell<Vec<Persona>>,
}

static BUNDLED: Lazy<PersonaCatalog> = Lazy::new(|| PersonaCatalog::new(BundledResources));

impl fmt::Debug for PersonaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonaCatalog")
            .field("loaded", &self.personas.get().map(Vec::len))
            .finish()
    }
}

impl PersonaCatalog {
    pub fn new(loader: impl ResourceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            raw: OnceCell::new(),
            personas: OnceCell::new(),
        }
    }

    /// Process-wide catalogue over the bundled persona list.
    pub fn bundled() -> &'static PersonaCatalog {
        &BUNDLED
    }

    pub fn raw(&self) -> Result<&str> {
        self.raw
            .get_or_try_init(|| self.loader.read(PERSONA_LIST))
            .map(String::as_str)
    }

    pub fn load(&self) -> Result<&[Persona]> {
        self.personas
            .get_or_try_init(|| parse(self.raw()?))
            .map(Vec::as_slice)
    }

    pub fn pick_random(&self) -> Result<&Persona> {
        self.load()?
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| ClientError::Malformed("persona list contains no records".into()))
    }
}
