// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use hydrant_core::KeyRange;
use serde_json::Value;

use crate::cache::EntityCache;
use crate::cli::OutputFormat;
use crate::error::{Error, Result};

use super::{open_workspace, parse_value, print_json, probe_once, runtime, Workspace};

pub fn get(entity_type: &str, key: &str) -> Result<()> {
    let workspace = open_workspace()?;
    let value = get_impl(&workspace, entity_type, key)?;
    print_json(&value)
}

pub(crate) fn get_impl(workspace: &Workspace, entity_type: &str, key: &str) -> Result<Value> {
    workspace.with_store(|s| s.get(entity_type, key))?.ok_or_else(|| Error::RecordNotFound {
        entity_type: entity_type.to_string(),
        key: key.to_string(),
    })
}

pub fn list(entity_type: &str, output: OutputFormat) -> Result<()> {
    let workspace = open_workspace()?;
    let records = workspace.with_store(|s| s.get_all(entity_type))?;
    let values: Vec<Value> = records.into_iter().map(|r| r.value).collect();
    print_values(&values, output)
}

pub fn index(entity_type: &str, name: &str, field_path: &str) -> Result<()> {
    let workspace = open_workspace()?;
    workspace.with_store(|s| s.define_index(entity_type, name, field_path))?;
    println!("Defined index {} on {}.{}", name, entity_type, field_path);
    Ok(())
}

pub fn query(
    entity_type: &str,
    index: &str,
    eq: Option<String>,
    from: Option<String>,
    to: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let workspace = open_workspace()?;
    let range = build_range(eq.as_deref(), from.as_deref(), to.as_deref());
    let records = workspace.with_store(|s| s.query_by_index(entity_type, index, &range))?;
    let values: Vec<Value> = records.into_iter().map(|r| r.value).collect();
    print_values(&values, output)
}

pub fn refresh(entity_type: &str) -> Result<()> {
    let workspace = open_workspace()?;
    let remote = workspace.remote()?.clone();
    let service = workspace.service(&remote);
    let cache = EntityCache::for_service(&service);

    let cached = runtime()?.block_on(async {
        if !probe_once(service.monitor(), &remote).await {
            return Err(Error::Offline);
        }
        cache.refresh(entity_type).await
    })?;
    println!("Cached {} {} record(s)", cached, entity_type);
    Ok(())
}

/// The key range described by `--eq`, `--from` and `--to`.
pub(crate) fn build_range(eq: Option<&str>, from: Option<&str>, to: Option<&str>) -> KeyRange {
    if let Some(eq) = eq {
        return KeyRange::only(parse_value(eq));
    }
    match (from, to) {
        (Some(from), Some(to)) => KeyRange::bound(parse_value(from), parse_value(to), false, false),
        (Some(from), None) => KeyRange::lower_bound(parse_value(from), false),
        (None, Some(to)) => KeyRange::upper_bound(parse_value(to), false),
        (None, None) => KeyRange::all(),
    }
}

fn print_values(values: &[Value], output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => print_json(values),
        OutputFormat::Text => {
            for value in values {
                println!("{}", serde_json::to_string(value)?);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
