//! Order-statistic AVL tree over [`OrderingKey`]s.
//!
//! Every node carries the size of its subtree, which turns "how many keys
//! come before this one" and "which key sits at position k" into a single
//! root-to-leaf walk.

use std::cmp::Ordering;

use thiserror::Error;

use super::key::OrderingKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("ordering key {0} is already indexed")]
    DuplicateKey(OrderingKey),
    #[error("ordering key {0} is not indexed")]
    MissingKey(OrderingKey),
}

type Link = Option<Box<Node>>;

#[derive(Debug, Clone)]
struct Node {
    key: OrderingKey,
    left: Link,
    right: Link,
    height: u32,
    size: usize,
}

impl Node {
    fn leaf(key: OrderingKey) -> Box<Node> {
        Box::new(Node {
            key,
            left: None,
            right: None,
            height: 1,
            size: 1,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        self.size = 1 + size(&self.left) + size(&self.right);
    }

    fn balance_factor(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

fn height(link: &Link) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn size(link: &Link) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };

    node.left = pivot.right.take();
    node.update();
    pivot.right = Some(node);
    pivot.update();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };

    node.right = pivot.left.take();
    node.update();
    pivot.left = Some(node);
    pivot.update();
    pivot
}

fn balance(mut node: Box<Node>) -> Box<Node> {
    node.update();

    let factor = node.balance_factor();
    if factor > 1 {
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance_factor() < 0 {
                rotate_left(left)
            } else {
                left
            });
        }
        rotate_right(node)
    } else if factor < -1 {
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance_factor() > 0 {
                rotate_right(right)
            } else {
                right
            });
        }
        rotate_left(node)
    } else {
        node
    }
}

fn rebalance(link: &mut Link) {
    if let Some(node) = link.take() {
        *link = Some(balance(node));
    }
}

fn insert(link: &mut Link, key: OrderingKey) -> Result<(), IndexError> {
    let node = match link {
        Some(node) => node,
        None => {
            *link = Some(Node::leaf(key));
            return Ok(());
        }
    };

    match key.cmp(&node.key) {
        Ordering::Less => insert(&mut node.left, key)?,
        Ordering::Greater => insert(&mut node.right, key)?,
        Ordering::Equal => return Err(IndexError::DuplicateKey(key)),
    }

    rebalance(link);
    Ok(())
}

fn delete(link: &mut Link, key: &OrderingKey) -> Option<OrderingKey> {
    let node = link.as_mut()?;

    let removed = match key.cmp(&node.key) {
        Ordering::Less => delete(&mut node.left, key)?,
        Ordering::Greater => delete(&mut node.right, key)?,
        Ordering::Equal => {
            let mut node = link.take()?;

            match (node.left.take(), node.right.take()) {
                (None, None) => {}
                (Some(child), None) | (None, Some(child)) => *link = Some(child),
                (Some(left), Some(right)) => {
                    let mut right = Some(right);
                    if let Some(mut successor) = take_min(&mut right) {
                        successor.left = Some(left);
                        successor.right = right;
                        *link = Some(successor);
                        rebalance(link);
                    }
                }
            }

            let Node { key, .. } = *node;
            return Some(key);
        }
    };

    rebalance(link);
    Some(removed)
}

/// Detaches the smallest node of a subtree, leaving the rest balanced.
fn take_min(link: &mut Link) -> Option<Box<Node>> {
    let node = link.as_mut()?;

    if node.left.is_some() {
        let min = take_min(&mut node.left);
        rebalance(link);
        min
    } else {
        let mut node = link.take()?;
        *link = node.right.take();
        node.update();
        Some(node)
    }
}

/// Balanced search tree over ordering keys with O(log n) rank queries.
#[derive(Debug, Default, Clone)]
pub struct OrderedIndex {
    root: Link,
}

impl OrderedIndex {
    pub fn new() -> Self {
        OrderedIndex::default()
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn insert(&mut self, key: OrderingKey) -> Result<(), IndexError> {
        insert(&mut self.root, key)
    }

    pub fn delete(&mut self, key: &OrderingKey) -> Result<OrderingKey, IndexError> {
        delete(&mut self.root, key).ok_or_else(|| IndexError::MissingKey(key.clone()))
    }

    pub fn contains(&self, key: &OrderingKey) -> bool {
        self.position_of(key).is_some()
    }

    /// 1-based position of an exact key in the total order.
    pub fn position_of(&self, key: &OrderingKey) -> Option<usize> {
        let mut link = &self.root;
        let mut before = 0;

        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Less => link = &node.left,
                Ordering::Greater => {
                    before += size(&node.left) + 1;
                    link = &node.right;
                }
                Ordering::Equal => return Some(before + size(&node.left) + 1),
            }
        }

        None
    }

    /// Competition rank of an indexed key: one more than the number of keys
    /// holding a strictly higher score.
    pub fn rank_of(&self, key: &OrderingKey) -> Option<usize> {
        self.contains(key).then(|| self.rank_of_score(key.score))
    }

    /// Rank a key with this score would receive.
    pub fn rank_of_score(&self, score: i64) -> usize {
        self.count_leading(|s| s > score) + 1
    }

    /// Number of indexed keys whose score lies within `min..=max`.
    pub fn count_in_score_range(&self, min: i64, max: i64) -> usize {
        if min > max {
            return 0;
        }

        self.count_leading(|s| s >= min) - self.count_leading(|s| s > max)
    }

    /// Counts the keys at the front of the order whose score satisfies
    /// `pred`. Scores only decrease along the order, so `pred` must hold for
    /// a prefix of it.
    fn count_leading(&self, pred: impl Fn(i64) -> bool) -> usize {
        let mut link = &self.root;
        let mut count = 0;

        while let Some(node) = link {
            if pred(node.key.score) {
                count += size(&node.left) + 1;
                link = &node.right;
            } else {
                link = &node.left;
            }
        }

        count
    }

    /// Key at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&OrderingKey> {
        let mut remaining = position.checked_sub(1)?;
        let mut link = &self.root;

        while let Some(node) = link {
            let left = size(&node.left);
            match remaining.cmp(&left) {
                Ordering::Less => link = &node.left,
                Ordering::Equal => return Some(&node.key),
                Ordering::Greater => {
                    remaining -= left + 1;
                    link = &node.right;
                }
            }
        }

        None
    }

    /// In-order iterator starting at a 1-based position. Positions below 1
    /// start at the front.
    pub fn iter_from(&self, start: usize) -> Iter<'_> {
        let mut stack = Vec::with_capacity(height(&self.root) as usize);
        let mut skip = start.saturating_sub(1);
        let mut link = &self.root;

        while let Some(node) = link {
            let left = size(&node.left);
            if skip < left {
                stack.push(node.as_ref());
                link = &node.left;
            } else if skip == left {
                stack.push(node.as_ref());
                break;
            } else {
                skip -= left + 1;
                link = &node.right;
            }
        }

        Iter {
            stack,
            remaining: self.len().saturating_sub(start.saturating_sub(1)),
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        self.iter_from(1)
    }

    /// Up to `count` keys beginning at 1-based position `start`, clamped to
    /// the populated range.
    pub fn range_by_position(&self, start: usize, count: usize) -> Vec<&OrderingKey> {
        self.iter_from(start.max(1)).take(count).collect()
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a OrderingKey;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.remaining = self.remaining.saturating_sub(1);

        let mut link = &node.right;
        while let Some(child) = link {
            self.stack.push(child.as_ref());
            link = &child.left;
        }

        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
