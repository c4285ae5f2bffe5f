//! Fisher–Yates playlist shuffler.
//!
//! The playlist layer calls [`shuffle`] whenever shuffle mode is switched on or
//! a new playlist is loaded.  The slice is permuted in place: its length and
//! the multiset of its elements never change, only their order.
//!
//! # How Fisher–Yates works (for beginners)
//!
//! Walk the slice from the last index down to 1.  At each index `i`, pick a
//! random index `j` from the *unprocessed* prefix `[0, i]` and swap the two
//! elements.  Everything at positions `> i` is already final.
//!
//! ```text
//! [a b c d e]   i = 4, j ∈ [0, 4]
//! [a b e d c]   i = 3, j ∈ [0, 3]   (c is now fixed)
//! ...
//! ```
//!
//! # The inclusive upper bound
//!
//! The draw MUST include `i` itself (`i + 1` choices).  Drawing from `[0, i)`
//! means an element can never stay where it is (Sattolo's algorithm, which
//! only produces cyclic permutations), and drawing from a fixed `[0, n - 1)`
//! leaves the tail of long playlists visibly under-shuffled.  Both mistakes
//! have shipped in slideshow players before; the tests in
//! `tests/shuffle_distribution.rs` guard against them.

use rand::Rng;

/// Shuffles `items` in place with a uniformly random permutation drawn from `rng`.
///
/// Slices of length 0 or 1 are left untouched.  The result is fully determined
/// by the state of `rng`, so a seeded generator gives reproducible orderings.
///
/// # Example
///
/// ```rust
/// use rand::{rngs::StdRng, SeedableRng};
/// use slideframe_core::shuffle::shuffle;
///
/// let mut playlist = vec!["a.jpg", "b.jpg", "c.mp4"];
/// shuffle(&mut playlist, &mut StdRng::seed_from_u64(7));
/// assert_eq!(playlist.len(), 3);
/// ```
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Shuffles `items` in place and hands the same slice back for chaining.
pub fn shuffled<'a, T, R>(items: &'a mut [T], rng: &mut R) -> &'a mut [T]
where
    R: Rng + ?Sized,
{
    shuffle(items, rng);
    items
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_shuffle_empty_slice_is_noop() {
        // Arrange
        let mut items: Vec<u32> = Vec::new();

        // Act
        shuffle(&mut items, &mut seeded(1));

        // Assert
        assert!(items.is_empty());
    }

    #[test]
    fn test_shuffle_single_element_is_noop() {
        let mut items = vec!["only.jpg"];
        shuffle(&mut items, &mut seeded(1));
        assert_eq!(items, vec!["only.jpg"]);
    }

    #[test]
    fn test_shuffle_preserves_length_and_multiset() {
        // Arrange: duplicates included on purpose
        let original = vec![5, 1, 1, 9, 3, 3, 3, 0, 7, 2];
        let mut items = original.clone();

        // Act
        shuffle(&mut items, &mut seeded(42));

        // Assert
        assert_eq!(items.len(), original.len());
        let mut a = original.clone();
        let mut b = items.clone();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b, "shuffle must be a permutation");
    }

    #[test]
    fn test_shuffle_is_deterministic_for_same_seed() {
        let mut first: Vec<u32> = (0..100).collect();
        let mut second: Vec<u32> = (0..100).collect();

        shuffle(&mut first, &mut seeded(2024));
        shuffle(&mut second, &mut seeded(2024));

        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffle_actually_reorders_long_sequence() {
        let original: Vec<u32> = (0..500).collect();
        let mut items = original.clone();

        shuffle(&mut items, &mut seeded(3));

        assert_ne!(items, original, "500 elements left in order is astronomically unlikely");
    }

    #[test]
    fn test_two_element_slice_keeps_order_about_half_the_time() {
        // With the inclusive bound, [0, 1] stays in order with probability 1/2.
        // An exclusive bound would swap every single time.
        let mut rng = seeded(99);
        let trials = 2_000;
        let mut unchanged = 0;

        for _ in 0..trials {
            let mut items = [0u8, 1u8];
            shuffle(&mut items, &mut rng);
            if items == [0, 1] {
                unchanged += 1;
            }
        }

        assert!(
            (800..=1200).contains(&unchanged),
            "expected ~1000 unchanged orderings, got {unchanged}"
        );
    }

    #[test]
    fn test_shuffled_returns_same_slice() {
        let mut items = vec![1, 2, 3, 4];
        let len = shuffled(&mut items, &mut seeded(5)).len();
        assert_eq!(len, 4);
    }
}
