//! Playing cards as used by the card game.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Heart,
    Diamond,
    Club,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];
}

/// Card ranks, numbered 1 (Ace) to 13 (King).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Rank {
    Ace = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Ten and the face cards. Ten belongs here so that Ten + Ace is a blackjack.
    pub fn is_picture(self) -> bool {
        matches!(self, Rank::Ten | Rank::Jack | Rank::Queen | Rank::King)
    }

    fn name(self) -> &'static str {
        match self {
            Rank::Ace => "As",
            Rank::Two => "Two",
            Rank::Three => "Three",
            Rank::Four => "Four",
            Rank::Five => "Five",
            Rank::Six => "Six",
            Rank::Seven => "Seven",
            Rank::Eight => "Eight",
            Rank::Nine => "Nine",
            Rank::Ten => "Ten",
            Rank::Jack => "Jack",
            Rank::Queen => "Queen",
            Rank::King => "King",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }

    pub fn is_picture(&self) -> bool {
        self.rank.is_picture()
    }

    /// Points of the card with an Ace counted as 1.
    pub fn face_value(&self) -> u32 {
        if self.is_picture() {
            10
        } else {
            self.rank.number() as u32
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {:?}", self.rank.name(), self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_values() {
        assert_eq!(Card::new(Suit::Heart, Rank::Ace).face_value(), 1);
        assert_eq!(Card::new(Suit::Heart, Rank::Seven).face_value(), 7);
        assert_eq!(Card::new(Suit::Club, Rank::Ten).face_value(), 10);
        assert_eq!(Card::new(Suit::Spade, Rank::Queen).face_value(), 10);
        assert_eq!(Card::new(Suit::Diamond, Rank::King).face_value(), 10);
    }

    #[test]
    fn test_pictures() {
        let pictures: Vec<Rank> = Rank::ALL.into_iter().filter(|r| r.is_picture()).collect();
        assert_eq!(pictures, vec![Rank::Ten, Rank::Jack, Rank::Queen, Rank::King]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Card::new(Suit::Spade, Rank::Ace).to_string(), "As of Spade");
        assert_eq!(Card::new(Suit::Heart, Rank::Nine).to_string(), "Nine of Heart");
    }
}
