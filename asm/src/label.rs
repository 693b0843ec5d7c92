use indexmap::IndexMap;

/// Label table: name -> index of the instruction following the label in
/// the filtered instruction list. Insertion order is kept for listings.
#[derive(Debug, Default, Clone)]
pub struct Labels {
    labels: IndexMap<String, usize>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `index`. The first binding wins; a second attempt
    /// leaves the table unchanged and returns `false`.
    pub fn define(&mut self, name: &str, index: usize) -> bool {
        if self.labels.contains_key(name) {
            return false;
        }
        self.labels.insert(name.to_string(), index);
        true
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
