use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub value: i32,
    pub label: String,
    pub import_value: String,
    #[serde(default)]
    pub pinned: bool,
}

impl Level {
    pub fn new(value: i32, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value,
            import_value: label.clone(),
            label,
            pinned: false,
        }
    }

    pub fn with_import_value(mut self, import_value: impl Into<String>) -> Self {
        self.import_value = import_value.into();
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    levels: Vec<Level>,
    by_value: HashMap<i32, usize>,
    by_label: HashMap<String, usize>,
}

impl PartialEq for LevelTable {
    fn eq(&self, other: &Self) -> bool {
        self.levels == other.levels
    }
}

impl LevelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_levels(levels: Vec<Level>) -> Self {
        let mut table = Self {
            levels,
            ..Self::default()
        };
        table.reindex();
        table
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    pub fn as_slice(&self) -> &[Level] {
        &self.levels
    }

    pub fn contains_value(&self, value: i32) -> bool {
        self.by_value.contains_key(&value)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    pub fn by_value(&self, value: i32) -> Option<&Level> {
        self.by_value.get(&value).map(|idx| &self.levels[*idx])
    }

    pub fn by_label(&self, label: &str) -> Option<&Level> {
        self.by_label.get(label).map(|idx| &self.levels[*idx])
    }

    pub fn label_for(&self, value: i32) -> Option<&str> {
        self.by_value(value).map(|level| level.label.as_str())
    }

    pub fn value_for(&self, label: &str) -> Option<i32> {
        self.by_label(label).map(|level| level.value)
    }

    pub fn position(&self, value: i32) -> Option<usize> {
        self.by_value.get(&value).copied()
    }

    pub fn next_value(&self) -> i32 {
        self.levels
            .iter()
            .map(|level| level.value)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    pub fn push(&mut self, level: Level) -> bool {
        if self.by_value.contains_key(&level.value) {
            return false;
        }
        let idx = self.levels.len();
        self.by_value.insert(level.value, idx);
        self.by_label.entry(level.label.clone()).or_insert(idx);
        self.levels.push(level);
        true
    }

    pub fn insert_ordered(&mut self, level: Level) -> bool {
        if self.by_value.contains_key(&level.value) {
            return false;
        }
        let idx = self
            .levels
            .iter()
            .position(|existing| existing.value > level.value)
            .unwrap_or(self.levels.len());
        self.levels.insert(idx, level);
        self.reindex();
        true
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Level) -> bool,
    {
        self.levels.retain(keep);
        self.reindex();
    }

    pub fn clear(&mut self) {
        self.levels.clear();
        self.by_value.clear();
        self.by_label.clear();
    }

    pub fn into_vec(self) -> Vec<Level> {
        self.levels
    }

    fn reindex(&mut self) {
        self.by_value.clear();
        self.by_label.clear();
        for (idx, level) in self.levels.iter().enumerate() {
            self.by_value.insert(level.value, idx);
            self.by_label.entry(level.label.clone()).or_insert(idx);
        }
    }
}

impl Serialize for LevelTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.levels.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LevelTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<Level>::deserialize(deserializer).map(LevelTable::from_levels)
    }
}
