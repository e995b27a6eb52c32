use std::collections::HashSet;
use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use fst::MapBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use zstd::bulk::compress as zstd_compress;

#[path = "src/data.rs"]
mod data_model;
use data_model::{GlossaryTerm, Template};

const RECORD_COMPRESSION_LEVEL: i32 = 5;

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    let templates: Vec<Template> = load_records(&manifest_dir.join("data/templates.jsonl"))?;
    let template_ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
    build_id_index(&template_ids, &out_dir.join("templates.fst"), "GUIDE_TEMPLATES_FST")?;
    write_records(&templates, &out_dir.join("templates.jsonl.zst"), "GUIDE_TEMPLATES_DATA")?;

    let glossary: Vec<GlossaryTerm> = load_records(&manifest_dir.join("data/glossary.jsonl"))?;
    let term_ids: Vec<&str> = glossary.iter().map(|t| t.id.as_str()).collect();
    check_term_references(&glossary, &term_ids)?;
    build_id_index(&term_ids, &out_dir.join("glossary.fst"), "GUIDE_GLOSSARY_FST")?;
    write_records(&glossary, &out_dir.join("glossary.jsonl.zst"), "GUIDE_GLOSSARY_DATA")?;

    Ok(())
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    println!("cargo:rerun-if-changed={}", path.display());
    if !path.exists() {
        panic!("Missing catalog source {}.", path.display());
    }
    let file = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (line_idx, line_res) in file.lines().enumerate() {
        let line = line_res?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(&line).map_err(|err| {
            format!(
                "Failed to parse {} line {}: {err}",
                path.display(),
                line_idx + 1
            )
        })?;
        rows.push(record);
    }
    Ok(rows)
}

/// Maps every id to its catalog position. Fails on empty or duplicate ids.
fn build_id_index(ids: &[&str], fst_path: &Path, env_key: &str) -> Result<(), Box<dyn Error>> {
    let mut sorted: Vec<(&str, u64)> = ids
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position as u64))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    if let Some((id, _)) = sorted.iter().find(|(id, _)| id.trim().is_empty()) {
        return Err(format!("Empty catalog id {id:?}").into());
    }
    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(format!("Duplicate catalog id {:?}", pair[0].0).into());
        }
    }

    let writer = BufWriter::new(File::create(fst_path)?);
    let mut builder = MapBuilder::new(writer)?;
    for (id, position) in &sorted {
        builder.insert(id, *position)?;
    }
    builder.finish()?;
    println!("cargo:rustc-env={env_key}={}", fst_path.display());
    Ok(())
}

fn check_term_references(terms: &[GlossaryTerm], ids: &[&str]) -> Result<(), Box<dyn Error>> {
    let known: HashSet<&str> = ids.iter().copied().collect();
    for term in terms {
        for related in &term.related_terms {
            if !known.contains(related.as_str()) {
                return Err(format!(
                    "Glossary term {:?} references unknown term {related:?}",
                    term.id
                )
                .into());
            }
        }
    }
    Ok(())
}

fn write_records<T: Serialize>(
    records: &[T],
    data_path: &Path,
    env_key: &str,
) -> Result<(), Box<dyn Error>> {
    let mut canonical = String::new();
    for record in records {
        canonical.push_str(&serde_json::to_string(record)?);
        canonical.push('\n');
    }
    let compressed = zstd_compress(canonical.as_bytes(), RECORD_COMPRESSION_LEVEL)
        .map_err(|err| format!("Failed to compress {}: {err}", data_path.display()))?;
    fs::write(data_path, compressed)?;
    println!("cargo:rustc-env={env_key}={}", data_path.display());
    Ok(())
}
