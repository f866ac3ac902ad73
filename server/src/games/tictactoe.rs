use super::{GameEnd, Table};
use log::debug;
use rand::Rng;
use std::fmt;

pub const GRID_SIZE: usize = 3;

pub const LEFT_NOTICE: &str = "L'autre joueur a quitté";
pub const COMMUNICATION_ERROR: &str = "Erreur de communication";
pub const CELL_TAKEN: &str = "Case déjà occupée";

const PROMPTS: [&str; 2] = ["Ligne   : ", "Colonne : "];
const BORDER: &str = "+---+---+---+";

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    O,
    X,
}

impl Mark {
    /// Mark of the player in `seat`; the first seat always plays O.
    pub fn for_seat(seat: usize) -> Self {
        if seat == 0 {
            Mark::O
        } else {
            Mark::X
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Mark::O => 0,
            Mark::X => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Mark::O => 'O',
            Mark::X => 'X',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cells: [[Option<Mark>; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Mark> {
        self.cells[row][col]
    }

    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].is_none()
    }

    /// Marks an empty cell. Returns false if the cell was taken.
    pub fn place(&mut self, row: usize, col: usize, mark: Mark) -> bool {
        if !self.is_free(row, col) {
            return false;
        }
        self.cells[row][col] = Some(mark);
        true
    }

    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.map(|(row, col)| self.cells[row][col]);
            match a {
                Some(mark) if b == a && c == a => Some(mark),
                _ => None,
            }
        })
    }

    pub fn marks(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.marks() == GRID_SIZE * GRID_SIZE
    }

    pub fn is_over(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", BORDER)?;
        for row in &self.cells {
            write!(f, "| ")?;
            for cell in row {
                write!(f, "{} | ", cell.map_or(' ', Mark::symbol))?;
            }
            writeln!(f)?;
            writeln!(f, "{}", BORDER)?;
        }
        Ok(())
    }
}

/// A single digit between 1 and 3, turned into a zero-based index.
pub fn parse_coordinate(line: &str) -> Option<usize> {
    match line.trim() {
        "1" => Some(0),
        "2" => Some(1),
        "3" => Some(2),
        _ => None,
    }
}

pub struct TicTacToe {
    table: Table,
    grid: Grid,
    current: usize,
}

impl TicTacToe {
    /// Starts with a player picked at random.
    pub fn new(table: Table) -> Self {
        let first = rand::thread_rng().gen_range(0..2);
        Self::with_first_player(table, first)
    }

    pub fn with_first_player(table: Table, first: usize) -> Self {
        Self {
            table,
            grid: Grid::new(),
            current: first % 2,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub async fn run(mut self) -> GameEnd {
        self.table.send(0, "Vous êtes le joueur 1 (O)");
        self.table.send(1, "Vous êtes le joueur 2 (X)");
        self.table
            .broadcast(&format!("Le joueur {} commence", self.current + 1));

        let end = self.play().await;
        self.finish(end).await;
        end
    }

    async fn play(&mut self) -> GameEnd {
        self.table.broadcast(&self.grid.to_string());
        loop {
            let seat = self.current;
            self.table
                .broadcast(&format!("Au tour du joueur {}", seat + 1));
            self.table.end_turn(1 - seat);
            self.table.begin_turn(seat);
            self.table.send(seat, "Votre tour");

            let Some((row, col)) = self.ask_cell(seat).await else {
                self.table
                    .emergency_shutdown(seat, &[LEFT_NOTICE, COMMUNICATION_ERROR])
                    .await;
                return GameEnd::Error;
            };
            self.table.end_turn(seat);

            self.grid.place(row, col, Mark::for_seat(seat));
            debug!(
                "{}: player {} marked ({}, {})",
                self.table.label(),
                seat + 1,
                row + 1,
                col + 1
            );
            self.current = 1 - seat;
            self.table.broadcast(&self.grid.to_string());

            if self.grid.winner().is_some() {
                return GameEnd::Normal;
            }
            if self.grid.is_full() {
                return GameEnd::Draw;
            }
        }
    }

    /// Asks row then column until they point at a free cell. `None` when the
    /// player is gone.
    async fn ask_cell(&mut self, seat: usize) -> Option<(usize, usize)> {
        loop {
            let mut coords = [0; 2];
            for (coord, prompt) in coords.iter_mut().zip(PROMPTS) {
                *coord = loop {
                    self.table.send(seat, prompt);
                    let line = self.table.read_line(seat).await?;
                    if let Some(index) = parse_coordinate(&line) {
                        break index;
                    }
                };
            }

            let [row, col] = coords;
            if self.grid.is_free(row, col) {
                return Some((row, col));
            }
            self.table.send(seat, CELL_TAKEN);
        }
    }

    async fn finish(&mut self, end: GameEnd) {
        match end {
            GameEnd::Normal => {
                if let Some(mark) = self.grid.winner() {
                    self.table.send(mark.seat(), "Vous avez gagné !");
                    self.table.send(1 - mark.seat(), "Vous avez perdu...");
                }
            }
            GameEnd::Draw => self.table.broadcast("Egalité"),
            GameEnd::Error => {}
        }
        self.table.release_all().await;
    }
}
