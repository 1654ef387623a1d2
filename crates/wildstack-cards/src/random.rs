//! The shuffling law: on-demand card generation.
//!
//! There is no finite deck. Every draw — initial deals, voluntary draws,
//! penalty draws — samples a fresh card from the same distribution:
//!
//! - special with probability `special_chance_percent / 100`;
//! - among specials, the kind is uniform; `DrawFour`/`ChangeColor` carry
//!   the wild color, `DrawTwo`/`Reverse` a uniform non-wild color;
//! - among non-specials, color is uniform over the four non-wild colors
//!   and rank uniform over 0–9.
//!
//! Callers pass the RNG in so deals are seedable in tests; game code uses
//! `rand::rng()` at the call site.

use rand::Rng;

use crate::{Card, Color, Special};

/// Draws one card from the shuffling law.
pub fn random_card<R: Rng + ?Sized>(rng: &mut R, special_chance_percent: u8) -> Card {
    let chance = special_chance_percent.min(100);
    let is_special = rng.random_range(0..100) < chance;
    if !is_special {
        let color = Color::CHOOSABLE[rng.random_range(0..Color::CHOOSABLE.len())];
        let rank = rng.random_range(0..=9);
        return Card::number(color, rank);
    }

    let kind = Special::ALL[rng.random_range(0..Special::ALL.len())];
    if kind.is_wild_acting() {
        Card::wild(kind)
    } else {
        let color = Color::CHOOSABLE[rng.random_range(0..Color::CHOOSABLE.len())];
        Card::colored_special(kind, color)
    }
}

/// Draws `count` cards from the shuffling law.
pub fn deal<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    special_chance_percent: u8,
) -> Vec<Card> {
    (0..count)
        .map(|_| random_card(rng, special_chance_percent))
        .collect()
}

/// The very first discard of a game: never special, so the opening turn
/// starts from a plain numbered card.
pub fn first_discard<R: Rng + ?Sized>(rng: &mut R) -> Card {
    random_card(rng, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xCA5CADE)
    }

    #[test]
    fn test_zero_percent_never_yields_specials() {
        let mut rng = rng();
        for _ in 0..500 {
            let card = random_card(&mut rng, 0);
            assert_eq!(card.special(), None, "got special {card}");
            assert!(!card.color.is_wild());
            assert!(card.rank().unwrap() <= 9);
        }
    }

    #[test]
    fn test_hundred_percent_always_yields_specials() {
        let mut rng = rng();
        for _ in 0..500 {
            let card = random_card(&mut rng, 100);
            assert!(card.special().is_some(), "got number {card}");
        }
    }

    #[test]
    fn test_chance_above_hundred_is_clamped() {
        let mut rng = rng();
        for _ in 0..100 {
            let card = random_card(&mut rng, 255);
            assert!(card.special().is_some());
        }
    }

    #[test]
    fn test_wild_acting_specials_carry_wild_color() {
        let mut rng = rng();
        for _ in 0..500 {
            let card = random_card(&mut rng, 100);
            match card.special().unwrap() {
                Special::DrawFour | Special::ChangeColor => {
                    assert_eq!(card.color, Color::Wild)
                }
                Special::DrawTwo | Special::Reverse => {
                    assert!(!card.color.is_wild())
                }
            }
        }
    }

    #[test]
    fn test_all_special_kinds_appear() {
        let mut rng = rng();
        let mut seen = [false; 4];
        for _ in 0..500 {
            let card = random_card(&mut rng, 100);
            let idx = Special::ALL
                .iter()
                .position(|k| Some(*k) == card.special())
                .unwrap();
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s), "missing special kinds: {seen:?}");
    }

    #[test]
    fn test_deal_returns_requested_count() {
        let mut rng = rng();
        assert_eq!(deal(&mut rng, 7, 20).len(), 7);
        assert!(deal(&mut rng, 0, 20).is_empty());
    }

    #[test]
    fn test_first_discard_is_never_special() {
        let mut rng = rng();
        for _ in 0..200 {
            assert_eq!(first_discard(&mut rng).special(), None);
        }
    }
}
