use crate::transcript::{Transcript, TranscriptSummary};

/// Name-keyed registry of transcripts with a single active selection.
///
/// Entries are kept in insertion order. That order is what `names` and
/// `summaries` expose, and it decides which project becomes active when the
/// active one is deleted: the first remaining entry wins.
#[derive(Debug, Default)]
pub struct ProjectStore {
    entries: Vec<Transcript>,
    active: Option<String>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an empty transcript. Names are matched exactly; callers trim.
    pub fn create(&mut self, name: &str) -> bool {
        if self.exists(name) {
            return false;
        }
        self.entries.push(Transcript::new(name));
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        true
    }

    pub fn delete(&mut self, name: &str) -> bool {
        let Some(position) = self.position(name) else {
            return false;
        };
        self.entries.remove(position);
        if self.active.as_deref() == Some(name) {
            self.active = self.entries.first().map(|t| t.name().to_string());
        }
        true
    }

    pub fn switch_to(&mut self, name: &str) -> bool {
        if !self.exists(name) {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Transcript> {
        let name = self.active.as_deref()?;
        self.get(name)
    }

    pub fn active_mut(&mut self) -> Option<&mut Transcript> {
        let name = self.active.clone()?;
        self.get_mut(&name)
    }

    pub fn get(&self, name: &str) -> Option<&Transcript> {
        self.entries.iter().find(|t| t.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Transcript> {
        self.entries.iter_mut().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn summaries(&self) -> Vec<TranscriptSummary> {
        self.entries.iter().map(Transcript::summary).collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|t| t.name() == name)
    }
}
