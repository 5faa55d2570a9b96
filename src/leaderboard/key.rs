use std::{cmp::Ordering, fmt, sync::Arc};

use super::clock::Attainment;

/// Position of a player in the board's total order.
///
/// Higher scores come first, then earlier attainment, then the identifier.
/// Two keys compare equal only when all three fields match, so distinct
/// players never tie.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct OrderingKey {
    pub score: i64,
    pub attained: Attainment,
    pub id: Arc<str>,
}

impl OrderingKey {
    pub fn new(score: i64, attained: Attainment, id: Arc<str>) -> Self {
        OrderingKey {
            score,
            attained,
            id,
        }
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.attained.cmp(&other.attained))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.score, self.attained, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(score: i64, attained: u64, id: &str) -> OrderingKey {
        OrderingKey::new(score, Attainment::from_ticks(attained), Arc::from(id))
    }

    #[test]
    fn ordering() {
        let mut keys = vec![
            key(100, 3, "carol"),
            key(200, 2, "bob"),
            key(100, 1, "alice"),
            key(-5, 0, "zed"),
            key(100, 1, "aaron"),
        ];
        keys.sort();

        assert_eq!(
            keys,
            vec![
                key(200, 2, "bob"),
                key(100, 1, "aaron"),
                key(100, 1, "alice"),
                key(100, 3, "carol"),
                key(-5, 0, "zed"),
            ]
        );
    }

    #[test]
    fn equal_only_when_identical() {
        assert_eq!(key(1, 1, "a").cmp(&key(1, 1, "a")), Ordering::Equal);
        assert_ne!(key(1, 1, "a").cmp(&key(1, 1, "b")), Ordering::Equal);
        assert_ne!(key(1, 1, "a").cmp(&key(1, 2, "a")), Ordering::Equal);
    }
}
