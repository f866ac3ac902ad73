//! Blackjack against the house for 2 to 7 players
//!
//! Rounds repeat while every player agrees to continue. A round goes through
//! bets, the deal, each player's turn in table order, the dealer's draw and
//! the settlement of every bet against the dealer's hand.

use super::card::Card;
use super::deck::Shoe;
use super::{GameEnd, Table};
use crate::session::{parse_in_range, NumberInput};
use log::{debug, info};
use std::fmt::Write;

pub const BET_MIN: u32 = 2;
pub const BET_MAX: u32 = 100;
pub const BLACKJACK: u32 = 21;
pub const DEALER_STANDS_AT: u32 = 17;

pub const BAD_BET: &str = "La valeur de la mise est erronnée, veuillez réessayer";
pub const BET_NOT_A_NUMBER: &str = "Ce n'est pas un nombre";
pub const HAS_BLACKJACK: &str = "Vous avez Black-Jack";
pub const ALREADY_DRAWN: &str = "Vous avez déjà draw, vous ne pouvez plus double";
pub const BAD_ACTION: &str = "Action incorrecte, veuillez recommencer";
pub const END_OF_TURN: &str = "Fin de votre tour";
pub const RESULTS: &str = "Résultats : ";
pub const CONTINUE_PROMPT: &str = "Voulez-vous continuer la partie ? (O-N)";
pub const NEW_ROUND: &str = "Une nouvelle partie commence";
pub const GAME_OVER: &str = "Un joueur a quitté la partie, de retour au menu des jeux";
pub const LEFT_NOTICE: &str = "Un autre joueur a quitté";

const SEPARATOR: &str = "----------------------";

/// Cards in the order they were dealt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Points of the hand. Aces are counted after every other card; with
    /// `ace_high` the first of them is worth 11 if the total stays under 22,
    /// every other Ace is worth 1.
    pub fn value(&self, ace_high: bool) -> u32 {
        let mut value: u32 = self
            .cards
            .iter()
            .filter(|card| !card.is_ace())
            .map(Card::face_value)
            .sum();

        let aces = self.cards.iter().filter(|card| card.is_ace()).count();
        for n in 0..aces {
            if ace_high && n == 0 && value + 11 <= BLACKJACK {
                value += 11;
            } else {
                value += 1;
            }
        }
        value
    }

    /// A picture and an Ace as the first two cards.
    pub fn is_blackjack(&self) -> bool {
        match self.cards.as_slice() {
            [a, b, ..] => (a.is_picture() && b.is_ace()) || (a.is_ace() && b.is_picture()),
            _ => false,
        }
    }

    fn write_cards(&self, out: &mut String) {
        for card in &self.cards {
            let _ = write!(out, "\n\t{}", card);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Push,
    Lose,
    Win { blackjack: bool },
}

impl Settlement {
    /// Change to the player's money for a bet of `bet`.
    pub fn net(self, bet: u32) -> f64 {
        let bet = f64::from(bet);
        match self {
            Settlement::Push => 0.0,
            Settlement::Lose => -bet,
            Settlement::Win { blackjack: false } => bet,
            Settlement::Win { blackjack: true } => bet * 1.5,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Settlement::Push => "Egalité, vous récupérez votre mise",
            Settlement::Lose => "Perdu, vous perdez votre mise",
            Settlement::Win { .. } => "Gagné, vous gagnez votre mise",
        }
    }
}

/// Outcome of one player's hand against the dealer's.
pub fn settle(dealer: &Hand, player: &Hand, player_blackjack: bool) -> Settlement {
    if dealer.is_blackjack() {
        return if player_blackjack {
            Settlement::Push
        } else {
            Settlement::Lose
        };
    }

    let dealer = dealer.value(true);
    let player = player.value(true);
    if player <= BLACKJACK && dealer <= BLACKJACK && player == dealer {
        Settlement::Push
    } else if player > BLACKJACK || (dealer <= BLACKJACK && player < dealer) {
        Settlement::Lose
    } else {
        Settlement::Win {
            blackjack: player_blackjack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stand,
    Hit,
    Double,
}

impl Action {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "stand" => Some(Action::Stand),
            "hit" => Some(Action::Hit),
            "double" => Some(Action::Double),
            _ => None,
        }
    }
}

pub fn action_menu(already_drawn: bool) -> String {
    let mut menu = String::from("Quelle action voulez-vous effectuer ? \n\t Stand \n\t Hit \n");
    if !already_drawn {
        menu.push_str("\t Double \n");
    }
    menu
}

#[derive(Debug, Default)]
struct Player {
    hand: Hand,
    bet: u32,
    blackjack: bool,
}

pub struct Blackjack {
    table: Table,
    shoe: Shoe,
    decks: usize,
    dealer: Hand,
    players: Vec<Player>,
}

impl Blackjack {
    pub fn new(table: Table, decks: usize) -> Self {
        Self::with_shoe(table, Shoe::new(decks), decks)
    }

    /// Starts from the given shoe; `decks` sizes the replacement shoe once it
    /// runs out.
    pub fn with_shoe(table: Table, shoe: Shoe, decks: usize) -> Self {
        let players = (0..table.len()).map(|_| Player::default()).collect();
        Self {
            table,
            shoe,
            decks: decks.max(1),
            dealer: Hand::new(),
            players,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub async fn run(mut self) -> GameEnd {
        for seat in 0..self.table.len() {
            self.table
                .send(seat, &format!("Vous êtes le joueur {}", seat + 1));
        }
        self.table.broadcast("Le joueur 1 commence");

        let end = loop {
            self.reset_hands();
            if let Err(end) = self.play_round().await {
                break end;
            }
            if let Err(end) = self.ask_continue().await {
                break end;
            }
            self.table.broadcast(NEW_ROUND);
        };

        self.table.release_all().await;
        end
    }

    fn reset_hands(&mut self) {
        self.dealer.clear();
        for player in &mut self.players {
            player.hand.clear();
            player.bet = 0;
            player.blackjack = false;
        }
    }

    /// One full round. `Err` carries how the engine ends when a player left.
    async fn play_round(&mut self) -> Result<(), GameEnd> {
        self.take_bets().await?;
        self.deal();
        self.table.broadcast(&self.render_table());
        self.check_blackjacks();

        for seat in 0..self.table.len() {
            self.player_turn(seat).await?;
        }

        self.dealer_turn();
        self.settle_bets();
        Ok(())
    }

    /// Next card. An empty shoe is replaced by a freshly shuffled one in the
    /// middle of the engine's life, so a long game never stalls on an
    /// exhausted shoe.
    fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.shoe.draw() {
                return card;
            }
            info!(
                "{}: shoe empty, shuffling {} new decks",
                self.table.label(),
                self.decks
            );
            self.shoe = Shoe::new(self.decks);
        }
    }

    async fn leave(&mut self, seat: usize) -> GameEnd {
        self.table.emergency_shutdown(seat, &[LEFT_NOTICE]).await;
        GameEnd::Error
    }

    async fn take_bets(&mut self) -> Result<(), GameEnd> {
        for seat in 0..self.table.len() {
            self.table.begin_turn(seat);
            let balance = self.table.session(seat).balance();
            self.table.send(
                seat,
                &format!(
                    "Votre argent : {:.1}\n Combien voulez-vous miser ? ({}-{})",
                    balance, BET_MIN, BET_MAX
                ),
            );

            let bet = loop {
                let Some(line) = self.table.read_line(seat).await else {
                    return Err(self.leave(seat).await);
                };
                match parse_in_range(&line, BET_MIN, BET_MAX) {
                    NumberInput::Valid(bet) => break bet,
                    NumberInput::OutOfRange => self.table.send(seat, BAD_BET),
                    NumberInput::NotANumber => self.table.send(seat, BET_NOT_A_NUMBER),
                }
            };
            self.table.end_turn(seat);
            self.players[seat].bet = bet;
        }
        Ok(())
    }

    /// One card to the dealer, then two to each player.
    fn deal(&mut self) {
        let card = self.draw();
        self.dealer.push(card);
        for seat in 0..self.players.len() {
            for _ in 0..2 {
                let card = self.draw();
                self.players[seat].hand.push(card);
            }
        }
    }

    fn check_blackjacks(&mut self) {
        for (seat, player) in self.players.iter_mut().enumerate() {
            if player.hand.is_blackjack() {
                player.blackjack = true;
                self.table.send(seat, HAS_BLACKJACK);
            }
        }
    }

    async fn player_turn(&mut self, seat: usize) -> Result<(), GameEnd> {
        self.show_hand(seat);
        self.table.begin_turn(seat);

        let mut drawn = false;
        while self.players[seat].hand.value(false) < BLACKJACK && !self.players[seat].blackjack {
            self.table.send(seat, &action_menu(drawn));
            let Some(line) = self.table.read_line(seat).await else {
                return Err(self.leave(seat).await);
            };

            match Action::parse(&line) {
                Some(Action::Stand) => break,
                Some(Action::Hit) => {
                    let card = self.draw();
                    self.players[seat].hand.push(card);
                    self.show_hand(seat);
                    drawn = true;
                }
                Some(Action::Double) if drawn => self.table.send(seat, ALREADY_DRAWN),
                Some(Action::Double) => {
                    let card = self.draw();
                    let player = &mut self.players[seat];
                    player.hand.push(card);
                    player.bet *= 2;
                    self.show_hand(seat);
                    break;
                }
                None => self.table.send(seat, BAD_ACTION),
            }
        }

        self.table.end_turn(seat);
        self.table.send(seat, END_OF_TURN);
        Ok(())
    }

    fn dealer_turn(&mut self) {
        while self.dealer.value(true) < DEALER_STANDS_AT {
            let card = self.draw();
            self.dealer.push(card);
        }
        debug!(
            "{}: dealer stands on {}",
            self.table.label(),
            self.dealer.value(true)
        );
    }

    fn settle_bets(&self) {
        self.table.broadcast(RESULTS);
        self.table.broadcast(&self.render_table());

        for (seat, player) in self.players.iter().enumerate() {
            let outcome = settle(&self.dealer, &player.hand, player.blackjack);
            self.table.session(seat).credit(outcome.net(player.bet));
            self.table.send(seat, outcome.message());
        }
    }

    /// Asks every player in turn; the first refusal ends the game for all.
    async fn ask_continue(&mut self) -> Result<(), GameEnd> {
        for seat in 0..self.table.len() {
            self.table.begin_turn(seat);
            self.table.send(seat, CONTINUE_PROMPT);
            loop {
                let Some(line) = self.table.read_line(seat).await else {
                    self.table.emergency_shutdown(seat, &[GAME_OVER]).await;
                    return Err(GameEnd::Error);
                };
                match line.trim().to_uppercase().as_str() {
                    "O" => break,
                    "N" => {
                        self.table.end_turn(seat);
                        self.table.broadcast(GAME_OVER);
                        return Err(GameEnd::Normal);
                    }
                    _ => {}
                }
            }
            self.table.end_turn(seat);
        }
        Ok(())
    }

    fn show_hand(&self, seat: usize) {
        let mut msg = String::from("Votre main : ");
        self.players[seat].hand.write_cards(&mut msg);
        self.table.send(seat, &msg);
    }

    fn render_table(&self) -> String {
        let mut out = format!("Main du croupier : ({} points)", self.dealer.value(true));
        self.dealer.write_cards(&mut out);
        for (seat, player) in self.players.iter().enumerate() {
            let name = self.table.session(seat).name().unwrap_or_default();
            let _ = write!(out, "\nMain du joueur {}: ", name);
            player.hand.write_cards(&mut out);
        }
        out.push('\n');
        out.push_str(SEPARATOR);
        out
    }
}
