//! Greedy identity assignment over cosine similarity.
//!
//! Each person is represented by the mean of their member embeddings; a new
//! face joins the best-matching person above the threshold or founds a new
//! one. Offline re-clustering is not performed here.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Face embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Cosine similarity in [-1, 1]; 0.0 when either norm is zero.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Component-wise mean of a non-empty embedding list.
    fn mean(list: &[Embedding]) -> Embedding {
        let Some(first) = list.first() else {
            return Embedding::new(Vec::new());
        };
        let mut sums = vec![0.0f32; first.values.len()];
        for embedding in list {
            for (sum, value) in sums.iter_mut().zip(embedding.values.iter()) {
                *sum += value;
            }
        }
        let count = list.len() as f32;
        Embedding::new(sums.into_iter().map(|s| s / count).collect())
    }
}

/// Running gallery of person identities built across runs.
///
/// Person ids come from a persisted counter and are never reused, so a
/// retention pass cannot make a later run collide with a dropped person's
/// output folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonGallery {
    ids: Vec<String>,
    members: HashMap<String, Vec<Embedding>>,
    next_person: u64,
}

impl PersonGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn person_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn members_of(&self, id: &str) -> Option<&[Embedding]> {
        self.members.get(id).map(Vec::as_slice)
    }

    /// Assign an embedding: the person whose mean embedding is most similar
    /// (strictly above the threshold) gains a member; otherwise a fresh
    /// `person_{n}` is founded.
    pub fn match_or_add(&mut self, embedding: Embedding, threshold: f32) -> String {
        let mut best_id: Option<String> = None;
        let mut best_similarity = f32::NEG_INFINITY;

        for id in &self.ids {
            let Some(members) = self.members.get(id) else {
                continue;
            };
            let similarity = embedding.similarity(&Embedding::mean(members));
            if similarity > best_similarity {
                best_similarity = similarity;
                best_id = Some(id.clone());
            }
        }

        if let Some(id) = best_id {
            if best_similarity > threshold {
                if let Some(members) = self.members.get_mut(&id) {
                    members.push(embedding);
                }
                return id;
            }
        }

        self.next_person += 1;
        let id = format!("person_{}", self.next_person);
        self.ids.push(id.clone());
        self.members.insert(id.clone(), vec![embedding]);
        id
    }

    /// Retention rule: persons with fewer members than the minimum are
    /// dropped from the gallery.
    pub fn retain_clusters(&mut self, min_cluster_size: u32) {
        let min = min_cluster_size as usize;
        let keep: HashSet<String> = self
            .members
            .iter()
            .filter(|(_, members)| members.len() >= min)
            .map(|(id, _)| id.clone())
            .collect();
        self.ids.retain(|id| keep.contains(id));
        self.members.retain(|id, _| keep.contains(id));
    }
}
