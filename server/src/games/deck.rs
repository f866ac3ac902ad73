//! Multi-deck shoe the card game draws from.

use super::card::{Card, Rank, Suit};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const CARDS_PER_DECK: usize = 52;

/// Pool of `decks × 52` cards. Each draw removes one uniformly chosen card.
/// A stacked shoe (no rng) deals its cards in the order given.
pub struct Shoe {
    cards: Vec<Card>,
    rng: Option<StdRng>,
}

impl Shoe {
    /// Builds a shuffled shoe from `decks` standard 52-card sets.
    pub fn new(decks: usize) -> Self {
        Self::with_rng(decks, StdRng::from_entropy())
    }

    pub fn with_rng(decks: usize, mut rng: StdRng) -> Self {
        let mut cards = Vec::with_capacity(decks * CARDS_PER_DECK);
        for _ in 0..decks {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card::new(suit, rank));
                }
            }
        }
        cards.shuffle(&mut rng);
        Self {
            cards,
            rng: Some(rng),
        }
    }

    /// A stacked shoe dealing exactly `cards`, first card first.
    pub fn from_cards(mut cards: Vec<Card>) -> Self {
        cards.reverse();
        Self { cards, rng: None }
    }

    /// Removes and returns a remaining card, `None` once exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => {
                let index = rng.gen_range(0..self.cards.len());
                Some(self.cards.swap_remove(index))
            }
            None => self.cards.pop(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_shoe_size() {
        assert_eq!(Shoe::new(1).remaining(), 52);
        assert_eq!(Shoe::new(6).remaining(), 312);
        assert_eq!(Shoe::new(0).remaining(), 0);
    }

    #[test]
    fn test_every_card_appears_once_per_deck() {
        let mut shoe = Shoe::with_rng(2, StdRng::seed_from_u64(7));
        let mut counts: HashMap<Card, usize> = HashMap::new();
        while let Some(card) = shoe.draw() {
            *counts.entry(card).or_default() += 1;
        }

        assert_eq!(counts.len(), 52);
        assert!(counts.values().all(|&n| n == 2));
    }

    #[test]
    fn test_draw_until_exhausted() {
        let mut shoe = Shoe::from_cards(vec![
            Card::new(Suit::Heart, Rank::Ace),
            Card::new(Suit::Club, Rank::King),
        ]);

        assert_eq!(shoe.draw(), Some(Card::new(Suit::Heart, Rank::Ace)));
        assert_eq!(shoe.remaining(), 1);
        assert_eq!(shoe.draw(), Some(Card::new(Suit::Club, Rank::King)));
        assert!(shoe.draw().is_none());
        assert_eq!(shoe.remaining(), 0);
    }
}
