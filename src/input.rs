// In: src/input.rs

//! Readers for the plain-text input formats.
//!
//! * Entity index files: one raw identifier per line, the line order defines
//!   the dense index.
//! * Tuple files: one line per entity, tab separated. The first field is the
//!   entity's raw id, the remaining fields are counterpart ids (binary data) or
//!   alternating counterpart id / rating pairs (rating data).
//!
//! Blank lines are skipped everywhere. Line numbers in errors are 1-based.

use std::io::BufRead;

use crate::error::PrefError;
use crate::index::EntityIndex;

/// Whether the leading field of a tuple line is a user or an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    UserMajor,
    ItemMajor,
}

/// A dense `(user, item)` pair.
pub type BinaryTuple = (u32, u32);

/// A dense `(user, item, rating)` triple.
pub type RatingTuple = (u32, u32, f64);

//==================================================================================
// 1. Entity Index Files
//==================================================================================

/// Reads an entity index, one identifier per line.
pub fn read_index<R: BufRead>(reader: R) -> Result<EntityIndex<String>, PrefError> {
    let mut ids = Vec::new();
    let mut seen = hashbrown::HashSet::new();
    for (line_no, line) in numbered_lines(reader) {
        let line = line?;
        let id = line.trim();
        if id.is_empty() {
            continue;
        }
        if !seen.insert(id.to_string()) {
            return Err(PrefError::Parse {
                line: line_no,
                message: format!("identifier '{}' appears more than once", id),
            });
        }
        ids.push(id.to_string());
    }
    Ok(EntityIndex::from_ids(ids))
}

/// Derives user and item indices from a tuple file, in first-seen order.
///
/// Useful when no index files exist. `rated` selects the rating layout so that
/// rating fields are not mistaken for identifiers.
pub fn scan_indices<R: BufRead>(
    reader: R,
    orientation: Orientation,
    rated: bool,
) -> Result<(EntityIndex<String>, EntityIndex<String>), PrefError> {
    let mut leading = Vec::new();
    let mut counterparts = Vec::new();
    for (line_no, line) in numbered_lines(reader) {
        let line = line?;
        let Some((entity, rest)) = split_entity(&line) else {
            continue;
        };
        leading.push(entity.to_string());
        if rated {
            for (id, _) in rating_pairs(&rest, line_no)? {
                counterparts.push(id.to_string());
            }
        } else {
            counterparts.extend(rest.iter().map(|id| id.to_string()));
        }
    }
    let (users, items) = match orientation {
        Orientation::UserMajor => (leading, counterparts),
        Orientation::ItemMajor => (counterparts, leading),
    };
    Ok((EntityIndex::from_ids(users), EntityIndex::from_ids(items)))
}

//==================================================================================
// 2. Tuple Files
//==================================================================================

/// Reads `(user, item)` pairs, resolving raw ids through the two indices.
pub fn read_binary_tuples<R: BufRead>(
    reader: R,
    users: &EntityIndex<String>,
    items: &EntityIndex<String>,
    orientation: Orientation,
) -> Result<Vec<BinaryTuple>, PrefError> {
    let (leading, counterpart) = roles(users, items, orientation);
    let mut tuples = Vec::new();
    for (line_no, line) in numbered_lines(reader) {
        let line = line?;
        let Some((entity, rest)) = split_entity(&line) else {
            continue;
        };
        let a = resolve(leading, entity, line_no)?;
        for id in rest {
            let b = resolve(counterpart, id, line_no)?;
            tuples.push(orient(a, b, orientation));
        }
    }
    log::debug!("read {} binary tuples", tuples.len());
    Ok(tuples)
}

/// Reads `(user, item, rating)` triples.
pub fn read_rating_tuples<R: BufRead>(
    reader: R,
    users: &EntityIndex<String>,
    items: &EntityIndex<String>,
    orientation: Orientation,
) -> Result<Vec<RatingTuple>, PrefError> {
    let (leading, counterpart) = roles(users, items, orientation);
    let mut tuples = Vec::new();
    for (line_no, line) in numbered_lines(reader) {
        let line = line?;
        let Some((entity, rest)) = split_entity(&line) else {
            continue;
        };
        let a = resolve(leading, entity, line_no)?;
        for (id, rating) in rating_pairs(&rest, line_no)? {
            let b = resolve(counterpart, id, line_no)?;
            let (u, i) = orient(a, b, orientation);
            tuples.push((u, i, rating));
        }
    }
    log::debug!("read {} rating tuples", tuples.len());
    Ok(tuples)
}

//==================================================================================
// 3. Helpers
//==================================================================================

fn numbered_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader.lines().enumerate().map(|(n, line)| (n + 1, line))
}

/// Splits a line into its leading id and the remaining fields. `None` for blank lines.
fn split_entity(line: &str) -> Option<(&str, Vec<&str>)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let mut fields = line.split('\t').map(str::trim).filter(|f| !f.is_empty());
    let entity = fields.next()?;
    Some((entity, fields.collect()))
}

fn rating_pairs<'a>(fields: &[&'a str], line_no: usize) -> Result<Vec<(&'a str, f64)>, PrefError> {
    if fields.len() % 2 != 0 {
        return Err(PrefError::Parse {
            line: line_no,
            message: format!(
                "expected alternating id / rating fields, got {} trailing fields",
                fields.len()
            ),
        });
    }
    fields
        .chunks_exact(2)
        .map(|pair| {
            let rating: f64 = pair[1].parse().map_err(|_| PrefError::Parse {
                line: line_no,
                message: format!("'{}' is not a valid rating", pair[1]),
            })?;
            if !rating.is_finite() {
                return Err(PrefError::Parse {
                    line: line_no,
                    message: format!("rating '{}' is not finite", pair[1]),
                });
            }
            Ok((pair[0], rating))
        })
        .collect()
}

fn roles<'a>(
    users: &'a EntityIndex<String>,
    items: &'a EntityIndex<String>,
    orientation: Orientation,
) -> (&'a EntityIndex<String>, &'a EntityIndex<String>) {
    match orientation {
        Orientation::UserMajor => (users, items),
        Orientation::ItemMajor => (items, users),
    }
}

fn orient(leading: u32, counterpart: u32, orientation: Orientation) -> (u32, u32) {
    match orientation {
        Orientation::UserMajor => (leading, counterpart),
        Orientation::ItemMajor => (counterpart, leading),
    }
}

fn resolve(index: &EntityIndex<String>, raw: &str, line_no: usize) -> Result<u32, PrefError> {
    index.idx(raw).ok_or_else(|| PrefError::Parse {
        line: line_no,
        message: format!("unknown identifier '{}'", raw),
    })
}
