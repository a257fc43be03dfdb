//! Transitive clustering of perceptual signatures.
//!
//! Every pair of images whose signatures are within the threshold is
//! joined in a union-find forest, so similarity is transitive: if A~B and
//! B~C then A, B and C land in one cluster even when A and C are farther
//! apart than the threshold. Neighbour search uses a BK-tree over the
//! distinct signatures, so only nearby pairs are ever compared.

use std::collections::HashMap;

use crate::scanner::perceptual::{hamming_distance, SimilarityIndex};

/// Union-find forest with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Create `len` singleton sets.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`. Returns false if they were
    /// already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// One cluster of similar images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarCluster {
    /// Indices into the input slice, ascending
    pub members: Vec<usize>,
    /// Largest pairwise Hamming distance inside the cluster
    pub similarity: u32,
}

/// Cluster signatures whose Hamming distance is at most `threshold`.
///
/// Returns clusters of two or more members ordered by their first member.
/// A threshold of 0 disables similarity matching and returns nothing.
#[must_use]
pub fn cluster_signatures(signatures: &[u64], threshold: u32) -> Vec<SimilarCluster> {
    if threshold == 0 || signatures.len() < 2 {
        return Vec::new();
    }

    let mut sets = DisjointSet::new(signatures.len());

    // Files with identical signatures share one tree node.
    let mut first_with: HashMap<u64, usize> = HashMap::new();
    let mut distinct: Vec<u64> = Vec::new();
    for (idx, &signature) in signatures.iter().enumerate() {
        match first_with.get(&signature) {
            Some(&first) => {
                sets.union(first, idx);
            }
            None => {
                first_with.insert(signature, idx);
                distinct.push(signature);
            }
        }
    }

    let mut index = SimilarityIndex::new();
    for &signature in &distinct {
        index.insert(signature);
    }

    for &signature in &distinct {
        let here = first_with[&signature];
        for (_, neighbour) in index.find(signature, threshold) {
            if neighbour != signature {
                sets.union(here, first_with[&neighbour]);
            }
        }
    }

    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots_in_order: Vec<usize> = Vec::new();
    for idx in 0..signatures.len() {
        let root = sets.find(idx);
        let members = by_root.entry(root).or_insert_with(|| {
            roots_in_order.push(root);
            Vec::new()
        });
        members.push(idx);
    }

    roots_in_order
        .into_iter()
        .filter_map(|root| by_root.remove(&root))
        .filter(|members| members.len() >= 2)
        .map(|members| {
            let similarity = worst_pair_distance(signatures, &members);
            SimilarCluster {
                members,
                similarity,
            }
        })
        .collect()
}

fn worst_pair_distance(signatures: &[u64], members: &[usize]) -> u32 {
    let mut worst = 0;
    for (i, &a) in members.iter().enumerate() {
        for &b in &members[i + 1..] {
            worst = worst.max(hamming_distance(signatures[a], signatures[b]));
        }
    }
    worst
}
