//! Binary search tree over address bits.

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::{Error, Result};

/// One side of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Empty,
    Node(usize),
    /// Index into the writer's value table
    Data(usize),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    children: [Record; 2],
}

impl Node {
    fn empty() -> Self {
        Self {
            children: [Record::Empty, Record::Empty],
        }
    }
}

/// Search tree keyed by left-aligned 128-bit address prefixes.
///
/// IPv4 trees use the top 32 bits only. Inserting a prefix replaces every
/// record beneath it; inserting inside an existing data record splits the
/// record so only the more specific part changes.
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<Node>,
    bit_count: u8,
}

impl SearchTree {
    pub fn new(bit_count: u8) -> Self {
        Self {
            nodes: vec![Node::empty()],
            bit_count,
        }
    }

    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }

    fn bit(key: u128, depth: u8) -> usize {
        ((key >> (127 - depth as u32)) & 1) as usize
    }

    /// Set the record covering `prefix_len` leading bits of `key`.
    pub fn insert(&mut self, key: u128, prefix_len: u8, record: Record) {
        if prefix_len == 0 {
            self.nodes[0].children = [record, record];
            return;
        }

        let mut node = 0;
        for depth in 0..prefix_len - 1 {
            let bit = Self::bit(key, depth);
            node = match self.nodes[node].children[bit] {
                Record::Node(next) => next,
                other => {
                    // Empty or data: push the existing record down one level
                    let next = self.nodes.len();
                    self.nodes.push(Node {
                        children: [other, other],
                    });
                    self.nodes[node].children[bit] = Record::Node(next);
                    next
                }
            };
        }

        let bit = Self::bit(key, prefix_len - 1);
        self.nodes[node].children[bit] = record;
    }

    /// Walk `prefix_len` bits of `key` and return the record found there,
    /// or the data/empty record that ends the walk early.
    pub fn get(&self, key: u128, prefix_len: u8) -> Record {
        let mut record = Record::Node(0);
        for depth in 0..prefix_len {
            match record {
                Record::Node(node) => {
                    record = self.nodes[node].children[Self::bit(key, depth)];
                }
                _ => break,
            }
        }
        record
    }

    /// Renumber the nodes reachable from the root in breadth-first order.
    ///
    /// Returns the node list in output order with children rewritten to the
    /// new numbering. Unreachable nodes are dropped; nodes reachable through
    /// several paths keep a single copy.
    pub fn compact(&self) -> Vec<[Record; 2]> {
        let mut numbering: AHashMap<usize, usize> = AHashMap::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        numbering.insert(0, 0);
        order.push(0);
        queue.push_back(0);

        while let Some(node) = queue.pop_front() {
            for child in self.nodes[node].children {
                if let Record::Node(next) = child {
                    if !numbering.contains_key(&next) {
                        numbering.insert(next, order.len());
                        order.push(next);
                        queue.push_back(next);
                    }
                }
            }
        }

        order
            .iter()
            .map(|old| {
                self.nodes[*old].children.map(|child| match child {
                    Record::Node(n) => Record::Node(numbering[&n]),
                    other => other,
                })
            })
            .collect()
    }
}

/// Serialize compacted nodes with the given record size.
///
/// `resolve` maps a data record to its absolute record value
/// (`node_count + 16 + data offset`).
pub fn write_nodes<F>(nodes: &[[Record; 2]], record_size: u16, mut resolve: F) -> Result<Vec<u8>>
where
    F: FnMut(usize) -> u32,
{
    let node_count = nodes.len();
    let max_value = (1u64 << record_size) - 1;
    if node_count as u64 + 16 > max_value {
        return Err(Error::TooManyNodes {
            nodes: node_count,
            record_size,
        });
    }

    let node_bytes = record_size as usize / 4;
    let mut out = Vec::with_capacity(node_count * node_bytes);

    for children in nodes {
        let mut values = [0u32; 2];
        for (slot, child) in values.iter_mut().zip(children) {
            let value = match child {
                Record::Empty => node_count as u32,
                Record::Node(n) => *n as u32,
                Record::Data(d) => resolve(*d),
            };
            if value as u64 > max_value {
                return Err(Error::TooManyNodes {
                    nodes: node_count,
                    record_size,
                });
            }
            *slot = value;
        }

        let [left, right] = values;
        match record_size {
            24 => {
                out.extend_from_slice(&left.to_be_bytes()[1..]);
                out.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            28 => {
                out.extend_from_slice(&left.to_be_bytes()[1..]);
                out.push((((left >> 24) & 0x0f) << 4) as u8 | ((right >> 24) & 0x0f) as u8);
                out.extend_from_slice(&right.to_be_bytes()[1..]);
            }
            _ => {
                out.extend_from_slice(&left.to_be_bytes());
                out.extend_from_slice(&right.to_be_bytes());
            }
        }
    }

    Ok(out)
}
