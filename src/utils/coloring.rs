//! Element coloring: elements of one color share no node, so they can be
//! processed concurrently (refinement, assembly) without write conflicts.

use std::collections::{HashMap, HashSet};

use crate::config::ColorerOptions;
use crate::error::MgError;

/// A mesh element: its id and the ids of its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: u64,
    pub nodes: Vec<u64>,
}

impl Element {
    pub fn new(id: u64, nodes: Vec<u64>) -> Self {
        Self { id, nodes }
    }
}

/// Elements of one topology, colored together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBucket {
    /// Topology key, matched against [`ColorerOptions::element_type`].
    pub topology: u32,
    pub elements: Vec<Element>,
}

/// Elements grouped by color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coloring {
    colors: Vec<Vec<u64>>,
    color_of: HashMap<u64, usize>,
}

impl Coloring {
    pub fn num_colors(&self) -> usize {
        self.colors.len()
    }

    /// Element ids of color `c`, in visiting order.
    pub fn elements(&self, c: usize) -> &[u64] {
        self.colors.get(c).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn colors(&self) -> &[Vec<u64>] {
        &self.colors
    }

    pub fn color_of(&self, element: u64) -> Option<usize> {
        self.color_of.get(&element).copied()
    }

    pub fn num_colored(&self) -> usize {
        self.color_of.len()
    }

    /// No two elements of one color share a node.
    pub fn is_valid(&self, buckets: &[ElementBucket]) -> bool {
        let mut seen: HashSet<(usize, u64)> = HashSet::new();
        for element in buckets.iter().flat_map(|b| &b.elements) {
            let Some(c) = self.color_of(element.id) else { continue };
            let mut nodes = element.nodes.clone();
            nodes.sort_unstable();
            nodes.dedup();
            if nodes.into_iter().any(|n| !seen.insert((c, n))) {
                return false;
            }
        }
        true
    }
}

/// Greedy node-conflict colorer.
#[derive(Debug, Clone, Default)]
pub struct Colorer {
    options: ColorerOptions,
}

impl Colorer {
    pub fn new(options: ColorerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ColorerOptions {
        &self.options
    }

    /// Color every element of the selected buckets.
    ///
    /// Pass `c` visits the buckets in order and gives color `c` to each
    /// uncolored element none of whose nodes already carries color `c`.
    /// Coloring ends after a pass that colors nothing; an element still
    /// uncolored after `max_colors` passes is a [`MgError::ColoringOverflow`].
    pub fn color(&self, buckets: &[ElementBucket]) -> Result<Coloring, MgError> {
        let selected: Vec<&ElementBucket> = buckets
            .iter()
            .filter(|b| self.options.element_type.is_none_or(|t| t == b.topology))
            .collect();
        let total: HashSet<u64> = selected.iter().flat_map(|b| b.elements.iter().map(|e| e.id)).collect();

        let mut coloring = Coloring::default();
        for c in 0..self.options.max_colors {
            if coloring.num_colored() == total.len() {
                break;
            }
            let mut marked: HashSet<u64> = HashSet::new();
            let mut this_color = Vec::new();
            for element in selected.iter().flat_map(|b| &b.elements) {
                if coloring.color_of.contains_key(&element.id) {
                    continue;
                }
                if element.nodes.iter().any(|n| marked.contains(n)) {
                    continue;
                }
                marked.extend(element.nodes.iter().copied());
                coloring.color_of.insert(element.id, c);
                this_color.push(element.id);
            }
            if this_color.is_empty() {
                break;
            }
            log::trace!("color {}: {} elements", c, this_color.len());
            coloring.colors.push(this_color);
        }

        if coloring.num_colored() < total.len() {
            return Err(MgError::ColoringOverflow { max_colors: self.options.max_colors });
        }
        log::debug!("colored {} elements with {} colors", total.len(), coloring.num_colors());
        Ok(coloring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(topology: u32, elements: Vec<Element>) -> ElementBucket {
        ElementBucket { topology, elements }
    }

    #[test]
    fn shared_node_forces_second_color() {
        let buckets = vec![bucket(3, vec![Element::new(1, vec![0, 1]), Element::new(2, vec![1, 2])])];
        let coloring = Colorer::default().color(&buckets).unwrap();
        assert_eq!(coloring.color_of(1), Some(0));
        assert_eq!(coloring.color_of(2), Some(1));
        assert!(coloring.is_valid(&buckets));
    }

    #[test]
    fn type_filter_skips_other_buckets() {
        let buckets = vec![
            bucket(3, vec![Element::new(1, vec![0, 1, 2])]),
            bucket(4, vec![Element::new(2, vec![0, 1, 2, 3])]),
        ];
        let colorer = Colorer::new(ColorerOptions { element_type: Some(4), ..Default::default() });
        let coloring = colorer.color(&buckets).unwrap();
        assert_eq!(coloring.color_of(1), None);
        assert_eq!(coloring.color_of(2), Some(0));
    }

    #[test]
    fn empty_input_has_no_colors() {
        let coloring = Colorer::default().color(&[]).unwrap();
        assert_eq!(coloring.num_colors(), 0);
        assert!(coloring.elements(0).is_empty());
    }
}
