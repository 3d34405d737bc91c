//! Full case interaction dump to JSONL files
//!
//! Writes every case (not just failures) to one JSONL file per group, for
//! post-hoc analysis and audit trails.
//!
//! ```text
//! .apiconform/dumps/
//! ├── crud.jsonl
//! ├── headers.jsonl
//! └── index.json
//! ```

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::outcome::CaseIdentity;
use crate::response::ResponseRecord;
use crate::verdict::RequestSnapshot;

/// Headers that are masked in dumps.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
];

const MASK: &str = "***";

/// One dispatched case.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub vu: u32,
    pub iteration: u32,
    pub case: CaseIdentity,
    pub request: RequestSnapshot,
    pub response: ResponseRecord,
    pub passed: bool,
}

/// Summary of a dump, written as `index.json`.
#[derive(Debug, Clone, Serialize)]
pub struct DumpIndex {
    pub total: u64,
    pub groups: Vec<DumpGroupEntry>,
    pub dump_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpGroupEntry {
    pub group: String,
    /// Filename within the dump directory
    pub file: String,
    pub count: u64,
}

/// Write interactions to per-group JSONL files, in first-seen group order.
///
/// # Errors
///
/// Returns error if the directory cannot be created or a file cannot be
/// written.
pub fn write_dump(
    interactions: &[Interaction],
    dump_dir: &Path,
    mask_headers: bool,
) -> Result<DumpIndex, DumpError> {
    std::fs::create_dir_all(dump_dir)
        .map_err(|e| DumpError::Io(format!("create {}: {e}", dump_dir.display())))?;

    let mut groups: Vec<(&str, Vec<&Interaction>)> = Vec::new();
    for interaction in interactions {
        let name = interaction.case.group.as_str();
        match groups.iter_mut().find(|(g, _)| *g == name) {
            Some((_, list)) => list.push(interaction),
            None => groups.push((name, vec![interaction])),
        }
    }

    let mut entries = Vec::new();
    let mut total: u64 = 0;
    let mut taken = HashSet::new();

    for (group, list) in groups {
        let filename = unique_filename(group, &mut taken);
        let filepath = dump_dir.join(&filename);
        let io_err = |e: std::io::Error| DumpError::Io(format!("write {}: {e}", filepath.display()));

        let file = std::fs::File::create(&filepath).map_err(io_err)?;
        let mut writer = std::io::BufWriter::new(file);

        for interaction in &list {
            let line = if mask_headers {
                serde_json::to_string(&mask_interaction(interaction))
            } else {
                serde_json::to_string(interaction)
            }
            .map_err(|e| DumpError::Serialize(e.to_string()))?;
            writer.write_all(line.as_bytes()).map_err(io_err)?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;

        let count = list.len() as u64;
        total += count;
        entries.push(DumpGroupEntry {
            group: group.to_string(),
            file: filename,
            count,
        });
    }

    let index = DumpIndex {
        total,
        groups: entries,
        dump_dir: dump_dir.to_path_buf(),
    };

    let index_path = dump_dir.join("index.json");
    let index_json =
        serde_json::to_string_pretty(&index).map_err(|e| DumpError::Serialize(e.to_string()))?;
    std::fs::write(&index_path, index_json)
        .map_err(|e| DumpError::Io(format!("write {}: {e}", index_path.display())))?;

    Ok(index)
}

/// Keeps filenames well under PATH_MAX.
const MAX_FILENAME_LEN: usize = 200;

/// "users / admin" → "users___admin.jsonl"
fn sanitize_filename(group: &str) -> String {
    let sanitized: String = group
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' => c,
            _ => '_',
        })
        .collect();
    format!("{sanitized}.jsonl")
}

/// Sanitized name, suffixed `_2`, `_3`, ... when an earlier group already
/// claimed it. Compared case-insensitively for case-folding filesystems.
fn unique_filename(group: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_filename(group);
    let stem = base.trim_end_matches(".jsonl");
    let mut candidate = base.clone();
    let mut n = 2;
    while !taken.insert(candidate.to_ascii_lowercase()) {
        candidate = format!("{stem}_{n}.jsonl");
        n += 1;
    }
    candidate
}

fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|&h| name.eq_ignore_ascii_case(h))
}

fn mask_interaction(interaction: &Interaction) -> Interaction {
    let mut masked = interaction.clone();
    for (key, value) in masked
        .request
        .headers
        .iter_mut()
        .chain(masked.response.headers.iter_mut())
    {
        if is_sensitive_header(key) {
            *value = MASK.to_string();
        }
    }
    masked
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}
