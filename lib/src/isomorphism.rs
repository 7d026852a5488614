//! Comparing stores up to blank node renaming.
//!
//! Blank node labels mean nothing across stores, so two stores are "the same" when some
//! bijection between their blank nodes turns one triple set into the other. This module
//! decides that by computing a canonical form for each store: a relabelled copy whose
//! blank node labels depend only on the graph's structure.
//!
//! Canonical labels come from colour refinement. Every blank node starts with the same
//! colour; each round, a node's new colour is the hash of its old colour and the sorted
//! multiset of `(direction, predicate, neighbour)` entries of the triples it occurs in,
//! where a neighbour is either a ground term or the neighbour's current colour. Rounds
//! stop once the partition into colour classes no longer splits.
//!
//! Refinement alone cannot separate nodes in symmetric structures (two 2-cycles and one
//! 4-cycle look alike locally). When a colour class still holds several nodes, each
//! member is individualized in turn, refinement is rerun, and the lexicographically
//! smallest resulting triple list wins. Automorphisms found along the way prune members
//! that would lead to the same result.
//!
//! Each connected blank node component is labelled on its own, so a component gets the
//! same labels whatever else the store holds. That is what lets [`diff`] report a blank
//! node triple as shared when the other store contains the same component. Equal
//! components within one store are told apart by a `_<n>` suffix on their repeats.

use crate::store::TripleStore;
use crate::term::{Term, Triple};
use log::debug;
use petgraph::unionfind::UnionFind;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

type Color = [u8; 32];

/// Prefix of the blank node labels produced by [`canonicalize`].
pub const CANONICAL_LABEL_PREFIX: &str = "cb";

fn ground_key(term: &Term) -> Color {
    *blake3::hash(term.to_string().as_bytes()).as_bytes()
}

fn individualize(color: &Color) -> Color {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"individualized");
    hasher.update(color);
    *hasher.finalize().as_bytes()
}

fn distinct(colors: &[Color]) -> usize {
    colors.iter().collect::<BTreeSet<_>>().len()
}

/// One fully refined labelling: the relabelled triples and the colour of each blank node.
struct Leaf {
    triples: Vec<Triple>,
    colors: Vec<Color>,
}

/// Merges the orbits of a permutation.
fn union_perm(orbits: &mut UnionFind<usize>, perm: &[usize]) {
    for (i, &j) in perm.iter().enumerate() {
        orbits.union(i, j);
    }
}

struct Canonicalizer<'a> {
    triples: Vec<&'a Triple>,
    blanks: Vec<&'a Term>,
    index: HashMap<&'a Term, usize>,
    // triples each blank node occurs in
    incident: Vec<Vec<usize>>,
    // precomputed hashes of every ground term
    ground: HashMap<&'a Term, Color>,
}

impl<'a> Canonicalizer<'a> {
    fn new(triples: Vec<&'a Triple>) -> Self {
        let blanks: Vec<&Term> = triples
            .iter()
            .flat_map(|&t| [t.subject(), t.object()])
            .filter(|t| t.is_blank_node())
            .collect::<BTreeSet<&'a Term>>()
            .into_iter()
            .collect();
        let index: HashMap<&Term, usize> = blanks.iter().enumerate().map(|(i, b)| (*b, i)).collect();
        let mut incident = vec![Vec::new(); blanks.len()];
        let mut ground = HashMap::new();
        for (t, &triple) in triples.iter().enumerate() {
            let s = index.get(triple.subject()).copied();
            let o = index.get(triple.object()).copied();
            if let Some(s) = s {
                incident[s].push(t);
            }
            if let Some(o) = o {
                if s != Some(o) {
                    incident[o].push(t);
                }
            }
            for term in [triple.subject(), triple.predicate(), triple.object()] {
                if !term.is_blank_node() {
                    ground.entry(term).or_insert_with(|| ground_key(term));
                }
            }
        }
        Canonicalizer {
            triples,
            blanks,
            index,
            incident,
            ground,
        }
    }

    fn key(&self, term: &Term, colors: &[Color]) -> Color {
        match self.index.get(term) {
            Some(&i) => colors[i],
            None => self.ground.get(term).copied().unwrap_or_else(|| ground_key(term)),
        }
    }

    fn signature(&self, node: usize, colors: &[Color]) -> Color {
        let me = self.blanks[node];
        let mut entries: Vec<Color> = self.incident[node]
            .iter()
            .map(|&t| {
                let triple = self.triples[t];
                let mut h = blake3::Hasher::new();
                h.update(&self.key(triple.predicate(), colors));
                if triple.subject() == me {
                    h.update(b"s");
                    h.update(&self.key(triple.object(), colors));
                }
                if triple.object() == me {
                    h.update(b"o");
                    h.update(&self.key(triple.subject(), colors));
                }
                *h.finalize().as_bytes()
            })
            .collect();
        entries.sort_unstable();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&colors[node]);
        for entry in &entries {
            hasher.update(entry);
        }
        *hasher.finalize().as_bytes()
    }

    /// Refines until the number of colour classes stops growing. The partition can split
    /// at most once per node, which bounds the number of rounds.
    fn refine(&self, colors: &mut Vec<Color>) {
        let mut classes = distinct(colors);
        for round in 0..=self.blanks.len() {
            let next: Vec<Color> = (0..colors.len())
                .map(|i| self.signature(i, colors))
                .collect();
            let next_classes = distinct(&next);
            *colors = next;
            if next_classes == classes {
                debug!("Refinement stable after {} rounds, {} classes", round + 1, classes);
                return;
            }
            classes = next_classes;
        }
    }

    /// Smallest colour class with more than one member, ties broken by colour.
    fn tied_cell(&self, colors: &[Color]) -> Option<Vec<usize>> {
        let mut cells: BTreeMap<&Color, Vec<usize>> = BTreeMap::new();
        for (i, c) in colors.iter().enumerate() {
            cells.entry(c).or_default().push(i);
        }
        cells
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .min_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(b.0)))
            .map(|(_, members)| members)
    }

    fn label(color: &Color) -> String {
        format!("{}{}", CANONICAL_LABEL_PREFIX, blake3::Hash::from(*color).to_hex())
    }

    /// Relabels with discrete colours and sorts the result.
    fn relabel(&self, colors: &[Color]) -> Vec<Triple> {
        let mut out: Vec<Triple> = self
            .triples
            .iter()
            .map(|triple| {
                triple.map_terms(|term| match self.index.get(term) {
                    Some(&i) => Term::BlankNode(Self::label(&colors[i])),
                    None => term.clone(),
                })
            })
            .collect();
        out.sort();
        out
    }

    fn leaf(&self, colors: Vec<Color>) -> Leaf {
        Leaf {
            triples: self.relabel(&colors),
            colors,
        }
    }

    /// Follows the first member of each tied cell down to a single leaf.
    fn first_leaf(&self, mut colors: Vec<Color>) -> Leaf {
        loop {
            self.refine(&mut colors);
            match self.tied_cell(&colors) {
                Some(cell) => colors[cell[0]] = individualize(&colors[cell[0]]),
                None => return self.leaf(colors),
            }
        }
    }

    /// Maps each blank node of `from` to the node of `to` that received the same label.
    /// Only meaningful when both leaves produced the same triples, in which case the
    /// result is an automorphism.
    fn automorphism(from: &Leaf, to: &Leaf) -> Vec<usize> {
        let by_color: HashMap<&Color, usize> =
            to.colors.iter().enumerate().map(|(i, c)| (c, i)).collect();
        from.colors
            .iter()
            .enumerate()
            .map(|(i, c)| by_color.get(c).copied().unwrap_or(i))
            .collect()
    }

    /// Returns the smallest leaf below `colors`, plus automorphisms discovered on the way.
    /// Every returned automorphism fixes the nodes individualized so far.
    fn search(&self, mut colors: Vec<Color>) -> (Leaf, Vec<Vec<usize>>) {
        self.refine(&mut colors);
        let Some(cell) = self.tied_cell(&colors) else {
            return (self.leaf(colors), Vec::new());
        };

        let branch = |member: usize| {
            let mut next = colors.clone();
            next[member] = individualize(&next[member]);
            next
        };

        let mut orbits = UnionFind::<usize>::new(colors.len());
        let (mut best, mut automorphisms) = self.search(branch(cell[0]));
        automorphisms.iter().for_each(|g| union_perm(&mut orbits, g));
        let mut tried = vec![cell[0]];

        for &member in &cell[1..] {
            if tried.iter().any(|&t| orbits.equiv(t, member)) {
                continue;
            }
            tried.push(member);

            // one leaf equal to the best one proves this member lies in the orbit of an
            // explored one, so its whole subtree can be skipped
            let probe = self.first_leaf(branch(member));
            if probe.triples == best.triples {
                let g = Self::automorphism(&probe, &best);
                union_perm(&mut orbits, &g);
                automorphisms.push(g);
                continue;
            }

            let (leaf, found) = self.search(branch(member));
            found.iter().for_each(|g| union_perm(&mut orbits, g));
            automorphisms.extend(found);
            match leaf.triples.cmp(&best.triples) {
                Ordering::Less => best = leaf,
                Ordering::Equal => {
                    let g = Self::automorphism(&leaf, &best);
                    union_perm(&mut orbits, &g);
                    automorphisms.push(g);
                }
                Ordering::Greater => {}
            }
        }
        (best, automorphisms)
    }

    fn canonical_triples(&self) -> Vec<Triple> {
        if self.blanks.is_empty() {
            return self.triples.iter().map(|t| (*t).clone()).collect();
        }
        let initial = vec![[0u8; 32]; self.blanks.len()];
        let (leaf, automorphisms) = self.search(initial);
        debug!(
            "Canonical labelling of {} blank nodes found ({} automorphisms)",
            self.blanks.len(),
            automorphisms.len()
        );
        leaf.triples
    }
}

/// Splits the triples of `store` into those without blank nodes and one group per
/// connected blank node component.
fn components(store: &TripleStore) -> (Vec<&Triple>, Vec<Vec<&Triple>>) {
    let index: HashMap<&Term, usize> = store
        .blank_nodes()
        .into_iter()
        .enumerate()
        .map(|(i, b)| (b, i))
        .collect();
    let mut links = UnionFind::<usize>::new(index.len());
    for triple in store {
        if let (Some(&s), Some(&o)) = (index.get(triple.subject()), index.get(triple.object())) {
            links.union(s, o);
        }
    }
    let mut ground = Vec::new();
    let mut groups: BTreeMap<usize, Vec<&Triple>> = BTreeMap::new();
    for triple in store {
        let node = index
            .get(triple.subject())
            .or_else(|| index.get(triple.object()));
        match node {
            Some(&i) => groups.entry(links.find(i)).or_default().push(triple),
            None => ground.push(triple),
        }
    }
    (ground, groups.into_values().collect())
}

/// Sorted canonical triples of `store`, labelled component by component.
fn canonical_triples(store: &TripleStore) -> Vec<Triple> {
    let (ground, groups) = components(store);
    let mut parts: Vec<Vec<Triple>> = groups
        .into_iter()
        .map(|group| Canonicalizer::new(group).canonical_triples())
        .collect();
    parts.sort();
    debug!("Labelled {} blank node components", parts.len());

    let mut out: Vec<Triple> = ground.into_iter().cloned().collect();
    let mut repeat = 0;
    for (i, part) in parts.iter().enumerate() {
        repeat = if i > 0 && parts[i - 1] == *part { repeat + 1 } else { 0 };
        if repeat == 0 {
            out.extend(part.iter().cloned());
        } else {
            out.extend(part.iter().map(|t| {
                t.map_terms(|term| match term {
                    Term::BlankNode(label) => Term::BlankNode(format!("{}_{}", label, repeat)),
                    other => other.clone(),
                })
            }));
        }
    }
    out.sort();
    out
}

/// Copy of `store` whose blank nodes carry structure-derived labels (`cb<hex>`, with a
/// `_<n>` suffix on repeated components). Isomorphic stores have identical canonical
/// forms. Prefix bindings are kept.
pub fn canonicalize(store: &TripleStore) -> TripleStore {
    let mut out: TripleStore = canonical_triples(store).into_iter().collect();
    for (prefix, ns) in store.namespaces() {
        out.bind(prefix, ns.as_str());
    }
    out
}

/// `true` iff a bijection between the blank nodes of `a` and `b` maps the triples of `a`
/// exactly onto those of `b`. Ground terms must match literally.
pub fn is_isomorphic(a: &TripleStore, b: &TripleStore) -> bool {
    if a.len() != b.len() || a.blank_nodes().len() != b.blank_nodes().len() {
        return false;
    }
    let ground_a = a.iter().filter(|t| !t.has_blank_node());
    let ground_b = b.iter().filter(|t| !t.has_blank_node());
    if !ground_a.eq(ground_b) {
        return false;
    }
    canonical_triples(a) == canonical_triples(b)
}

/// Three-way split of two stores, computed on their canonical forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDiff {
    pub both: TripleStore,
    pub only_first: TripleStore,
    pub only_second: TripleStore,
}

impl GraphDiff {
    /// Checks `|both| + |only_first| = |a|` and `|both| + |only_second| = |b|` against
    /// the stores the diff was computed from.
    pub fn is_consistent_with(&self, a: &TripleStore, b: &TripleStore) -> bool {
        self.both.len() + self.only_first.len() == a.len()
            && self.both.len() + self.only_second.len() == b.len()
    }

    pub fn is_identical(&self) -> bool {
        self.only_first.is_empty() && self.only_second.is_empty()
    }
}

/// Splits the triples of `a` and `b` into shared and exclusive parts. Triples with blank
/// nodes count as shared when their component appears in both stores, whatever the
/// labels used there; results carry canonical labels.
pub fn diff(a: &TripleStore, b: &TripleStore) -> GraphDiff {
    let ca: BTreeSet<Triple> = canonical_triples(a).into_iter().collect();
    let cb: BTreeSet<Triple> = canonical_triples(b).into_iter().collect();
    let diff = GraphDiff {
        both: ca.intersection(&cb).cloned().collect(),
        only_first: ca.difference(&cb).cloned().collect(),
        only_second: cb.difference(&ca).cloned().collect(),
    };
    debug!(
        "Diff: {} shared, {} only in first, {} only in second",
        diff.both.len(),
        diff.only_first.len(),
        diff.only_second.len()
    );
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> Term {
        Term::iri("http://example.org/p")
    }

    fn store(edges: &[(&str, &str)]) -> TripleStore {
        edges
            .iter()
            .map(|(s, o)| Triple::new(Term::blank(*s), p(), Term::blank(*o)).unwrap())
            .collect()
    }

    #[test]
    fn test_labels_do_not_matter() {
        let mut g1 = TripleStore::new();
        g1.insert(Triple::new(Term::blank("a"), p(), Term::literal("1")).unwrap());
        let mut g2 = TripleStore::new();
        g2.insert(Triple::new(Term::blank("x"), p(), Term::literal("1")).unwrap());
        assert_ne!(g1, g2);
        assert!(is_isomorphic(&g1, &g2));
        assert_eq!(canonicalize(&g1), canonicalize(&g2));
    }

    #[test]
    fn test_two_cycles_vs_four_cycle() {
        let two_cycles = store(&[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")]);
        let four_cycle = store(&[("w", "x"), ("x", "y"), ("y", "z"), ("z", "w")]);
        assert!(!is_isomorphic(&two_cycles, &four_cycle));
        let relabelled = store(&[("q", "r"), ("r", "q"), ("s", "t"), ("t", "s")]);
        assert!(is_isomorphic(&two_cycles, &relabelled));
    }

    #[test]
    fn test_self_loop_distinguished() {
        let loops = store(&[("a", "a"), ("b", "b")]);
        let cycle = store(&[("a", "b"), ("b", "a")]);
        assert!(!is_isomorphic(&loops, &cycle));
    }

    #[test]
    fn test_many_identical_components() {
        let edges: Vec<(String, String)> = (0..12)
            .map(|i| (format!("s{}", i), format!("o{}", i)))
            .collect();
        let refs: Vec<(&str, &str)> = edges.iter().map(|(s, o)| (s.as_str(), o.as_str())).collect();
        let g1 = store(&refs);
        let renamed: Vec<(String, String)> = (0..12)
            .rev()
            .map(|i| (format!("x{}", i), format!("y{}", i)))
            .collect();
        let refs2: Vec<(&str, &str)> = renamed.iter().map(|(s, o)| (s.as_str(), o.as_str())).collect();
        let g2 = store(&refs2);
        assert!(is_isomorphic(&g1, &g2));
    }

    #[test]
    fn test_canonical_labels() {
        let g = store(&[("a", "b")]);
        let c = canonicalize(&g);
        assert_eq!(c.len(), 1);
        for term in c.blank_nodes() {
            assert!(term.value().starts_with(CANONICAL_LABEL_PREFIX));
        }
    }

    #[test]
    fn test_repeated_components_stay_distinct() {
        let twice = store(&[("a", "b"), ("c", "d")]);
        let once = store(&[("x", "y")]);
        let c = canonicalize(&twice);
        assert_eq!(c.len(), 2);
        assert_eq!(c.blank_nodes().len(), 4);

        let d = diff(&twice, &once);
        assert_eq!(d.both.len(), 1);
        assert_eq!(d.only_first.len(), 1);
        assert!(d.only_second.is_empty());
        assert!(d.is_consistent_with(&twice, &once));
    }

    #[test]
    fn test_component_labels_ignore_rest_of_store() {
        let edge = store(&[("a", "b")]);
        let bigger = store(&[("x", "y"), ("y", "z"), ("z", "x"), ("m", "n")]);
        let labels = |s: &TripleStore| -> BTreeSet<Triple> { canonicalize(s).iter().cloned().collect() };
        assert!(labels(&edge).is_subset(&labels(&bigger)));
    }

    #[test]
    fn test_diff_partial_overlap() {
        let ex = |s: &str| Term::iri(format!("http://example.org/{}", s));
        let mut a = TripleStore::new();
        a.insert(Triple::new(Term::blank("a"), p(), Term::literal("1")).unwrap());
        a.insert(Triple::new(ex("s"), p(), ex("o")).unwrap());
        let mut b = TripleStore::new();
        b.insert(Triple::new(Term::blank("z"), p(), Term::literal("1")).unwrap());
        b.insert(Triple::new(ex("s"), p(), ex("other")).unwrap());
        let d = diff(&a, &b);
        assert_eq!(d.both.len(), 1);
        assert_eq!(d.only_first.len(), 1);
        assert_eq!(d.only_second.len(), 1);
        assert!(d.is_consistent_with(&a, &b));
        assert!(!d.is_identical());
    }
}
