use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::errors::CommandError;

/// The wire shape of a request. Top-level keys other than `op` and `args`
/// are ignored.
#[derive(Deserialize, Debug)]
struct Request {
    op: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SaveCommand {
    pub bookmarks: Value,
    pub log: Value,
    pub name: String,
}

/// What ends up on disk for a save.
#[derive(Serialize)]
struct SavedFile<'a> {
    bookmarks: &'a Value,
    log: &'a Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Names of the entries in the store directory.
    List,
    /// Writes `<name>.json` into the store directory.
    Save(SaveCommand),
}

impl Command {
    pub fn op(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Save(_) => "save",
        }
    }

    /// Builds a command from a decoded request object.
    pub fn parse(request: Value) -> Result<Self, CommandError> {
        if !request.is_object() {
            return Err(CommandError::InvalidRequest("expected a JSON object".into()));
        }
        let Request { op, args } = serde_json::from_value(request)
            .map_err(|e| CommandError::InvalidRequest(e.to_string()))?;
        let args = Value::Object(args);

        match op.as_str() {
            "list" => {
                let ListArgs {} = serde_json::from_value(args)
                    .map_err(|source| CommandError::InvalidArgs { op: "list", source })?;
                Ok(Command::List)
            }
            "save" => {
                let save: SaveCommand = serde_json::from_value(args)
                    .map_err(|source| CommandError::InvalidArgs { op: "save", source })?;
                validate_name(&save.name)?;
                Ok(Command::Save(save))
            }
            _ => Err(CommandError::UnknownOp(op)),
        }
    }

    /// Runs the command against `directory`. `None` means there is nothing
    /// to reply with.
    pub fn execute(&self, directory: &Path) -> Result<Option<Value>, CommandError> {
        match self {
            Command::List => list_names(directory).map(|names| Some(json!({ "names": names }))),
            Command::Save(save) => save.write_to(directory).map(|_| None),
        }
    }
}

impl SaveCommand {
    fn write_to(&self, directory: &Path) -> Result<(), CommandError> {
        let path = directory.join(format!("{}.json", self.name));
        let content = SavedFile {
            bookmarks: &self.bookmarks,
            log: &self.log,
        };

        let file = File::create(&path).map_err(|e| CommandError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &content).map_err(|source| {
            CommandError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|e| CommandError::io(&path, e))?;

        debug!(path = %path.display(), "Saved bookmarks");
        Ok(())
    }
}

fn list_names(directory: &Path) -> Result<Vec<String>, CommandError> {
    let entries = fs::read_dir(directory).map_err(|e| CommandError::io(directory, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CommandError::io(directory, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    debug!(directory = %directory.display(), count = names.len(), "Listed store directory");
    Ok(names)
}

/// The name becomes a file stem, so it must not be able to leave the store
/// directory.
fn validate_name(name: &str) -> Result<(), CommandError> {
    let reserved = name.is_empty() || name == "." || name == "..";
    if reserved || name.contains(['/', '\\', '\0']) {
        return Err(CommandError::InvalidName(name.to_string()));
    }
    Ok(())
}
