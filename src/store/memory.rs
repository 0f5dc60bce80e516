use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::store::{generate_key, DocumentStore, StorePath};

/// In-process document tree. Used by tests and demo mode.
///
/// A single mutex guards the whole tree, so every operation, including
/// `increment` and `create_if_absent`, is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    root: Mutex<Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing tree, e.g. a JSON export of the hosted database.
    pub fn with_tree(tree: Value) -> Self {
        Self {
            root: Mutex::new(tree),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Value>, AppError> {
        self.root
            .lock()
            .map_err(|_| AppError::Store("in-memory store lock poisoned".into()))
    }
}

fn lookup<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
        .filter(|value| !value.is_null())
}

fn set(root: &mut Value, path: &StorePath, value: Value) {
    let Some((parent, last)) = path.split_last() else {
        *root = value;
        return;
    };

    if value.is_null() {
        let container = parent
            .segments()
            .iter()
            .try_fold(&mut *root, |node, segment| node.get_mut(segment.as_str()));
        if let Some(Value::Object(map)) = container {
            map.remove(last);
        }
        return;
    }

    let mut node = root;
    for segment in parent.segments() {
        node = object_mut(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(node).insert(last.to_string(), value);
}

/// Borrow `node` as an object, replacing any scalar that sits in the way.
fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError> {
        let root = self.lock()?;
        Ok(lookup(&root, path).cloned())
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError> {
        let mut root = self.lock()?;
        set(&mut root, path, value);
        Ok(())
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError> {
        let key = generate_key();
        let child = path.child(&key)?;
        let mut root = self.lock()?;
        set(&mut root, &child, value);
        Ok(key)
    }

    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, AppError> {
        let mut root = self.lock()?;
        let current = match lookup(&root, path) {
            None => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                AppError::Store(format!("cannot increment non-integer value at '{path}'"))
            })?,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| AppError::Store(format!("counter overflow at '{path}'")))?;
        set(&mut root, path, Value::from(next));
        Ok(next)
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, AppError> {
        let mut root = self.lock()?;
        if lookup(&root, path).is_some() {
            return Ok(false);
        }
        set(&mut root, path, value);
        Ok(true)
    }
}
