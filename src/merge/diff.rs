//! Path-based tree diff and patch.
//!
//! The structural half of the three-way merge: compute the edits that
//! turn one tree into another, then replay a filtered set of those edits
//! onto a third tree. Arrays are ordered sequences and diff by element
//! index.

use std::fmt;

use serde_json::Value;

use super::MergeError;

/// One segment of a path into a document tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

pub type TreePath = Vec<PathSeg>;

/// Render a path as `.key[3].inner` for diagnostics.
pub fn render_path(path: &TreePath) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            PathSeg::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            PathSeg::Index(idx) => {
                out.push_str(&format!("[{idx}]"));
            }
        }
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// One edit relative to a base tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchOp {
    Add { path: TreePath, value: Value },
    Remove { path: TreePath },
    Replace { path: TreePath, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &TreePath {
        match self {
            PatchOp::Add { path, .. }
            | PatchOp::Remove { path }
            | PatchOp::Replace { path, .. } => path,
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOp::Add { path, .. } => write!(f, "add {}", render_path(path)),
            PatchOp::Remove { path } => write!(f, "remove {}", render_path(path)),
            PatchOp::Replace { path, .. } => write!(f, "replace {}", render_path(path)),
        }
    }
}

/// Edits that transform `base` into `other`.
pub fn diff(base: &Value, other: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_at(&mut Vec::new(), base, other, &mut ops);
    ops
}

fn diff_at(path: &mut TreePath, base: &Value, other: &Value, ops: &mut Vec<PatchOp>) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, base_value) in base_map {
                path.push(PathSeg::Key(key.clone()));
                match other_map.get(key) {
                    Some(other_value) => diff_at(path, base_value, other_value, ops),
                    None => ops.push(PatchOp::Remove { path: path.clone() }),
                }
                path.pop();
            }
            for (key, other_value) in other_map {
                if !base_map.contains_key(key) {
                    path.push(PathSeg::Key(key.clone()));
                    ops.push(PatchOp::Add {
                        path: path.clone(),
                        value: other_value.clone(),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(base_items), Value::Array(other_items)) => {
            let common = base_items.len().min(other_items.len());
            for idx in 0..common {
                path.push(PathSeg::Index(idx));
                diff_at(path, &base_items[idx], &other_items[idx], ops);
                path.pop();
            }
            for (idx, item) in other_items.iter().enumerate().skip(common) {
                path.push(PathSeg::Index(idx));
                ops.push(PatchOp::Add {
                    path: path.clone(),
                    value: item.clone(),
                });
                path.pop();
            }
            // Trailing removals are emitted highest index first so they
            // apply cleanly in order.
            for idx in (common..base_items.len()).rev() {
                path.push(PathSeg::Index(idx));
                ops.push(PatchOp::Remove { path: path.clone() });
                path.pop();
            }
        }
        (base, other) => {
            if base != other {
                ops.push(PatchOp::Replace {
                    path: path.clone(),
                    value: other.clone(),
                });
            }
        }
    }
}

/// Apply `ops` to `doc` in order.
pub fn apply(doc: &mut Value, ops: &[PatchOp]) -> Result<(), MergeError> {
    for op in ops {
        apply_one(doc, op)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), MergeError> {
    let path = op.path();
    let missing = || MergeError::PatchPathMissing {
        path: render_path(path),
    };

    let (last, parents) = path.split_last().ok_or_else(|| MergeError::PatchAtRoot)?;
    let mut cursor = doc;
    for seg in parents {
        cursor = match seg {
            PathSeg::Key(key) => cursor
                .as_object_mut()
                .and_then(|map| map.get_mut(key))
                .ok_or_else(missing)?,
            PathSeg::Index(idx) => cursor
                .as_array_mut()
                .and_then(|items| items.get_mut(*idx))
                .ok_or_else(missing)?,
        };
    }

    match (op, last) {
        (PatchOp::Add { value, .. }, PathSeg::Key(key)) => {
            let map = cursor.as_object_mut().ok_or_else(missing)?;
            map.insert(key.clone(), value.clone());
        }
        (PatchOp::Add { value, .. }, PathSeg::Index(idx)) => {
            let items = cursor.as_array_mut().ok_or_else(missing)?;
            if *idx > items.len() {
                return Err(missing());
            }
            items.insert(*idx, value.clone());
        }
        (PatchOp::Remove { .. }, PathSeg::Key(key)) => {
            let map = cursor.as_object_mut().ok_or_else(missing)?;
            map.shift_remove(key).ok_or_else(missing)?;
        }
        (PatchOp::Remove { .. }, PathSeg::Index(idx)) => {
            let items = cursor.as_array_mut().ok_or_else(missing)?;
            if *idx >= items.len() {
                return Err(missing());
            }
            items.remove(*idx);
        }
        (PatchOp::Replace { value, .. }, PathSeg::Key(key)) => {
            let map = cursor.as_object_mut().ok_or_else(missing)?;
            let slot = map.get_mut(key).ok_or_else(missing)?;
            *slot = value.clone();
        }
        (PatchOp::Replace { value, .. }, PathSeg::Index(idx)) => {
            let items = cursor.as_array_mut().ok_or_else(missing)?;
            let slot = items.get_mut(*idx).ok_or_else(missing)?;
            *slot = value.clone();
        }
    }
    Ok(())
}
