use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::piece::Tetromino;

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub enum RandomizerKind {
    #[default]
    SevenBag,
    SinglePiece {
        piece: Tetromino,
    },
}

pub trait Randomizer {
    fn next(&mut self) -> Tetromino;
}

/// Shuffled-without-replacement supply of all seven pieces.
pub struct SevenBag {
    bag: Vec<Tetromino>,
    rng: StdRng,
}

impl Default for SevenBag {
    fn default() -> Self {
        Self::new()
    }
}

impl SevenBag {
    pub fn new() -> Self {
        Self {
            bag: Vec::with_capacity(7),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            bag: Vec::with_capacity(7),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn refill(&mut self) {
        self.bag.clear();
        self.bag.extend(Tetromino::all());
        self.bag.shuffle(&mut self.rng);
    }
}

impl Randomizer for SevenBag {
    fn next(&mut self) -> Tetromino {
        if self.bag.is_empty() {
            self.refill();
        }
        match self.bag.pop() {
            Some(piece) => piece,
            None => unreachable!("bag refilled above"),
        }
    }
}

pub struct SinglePiece {
    piece: Tetromino,
}

impl Randomizer for SinglePiece {
    fn next(&mut self) -> Tetromino {
        self.piece
    }
}

pub fn randomizer_from_kind(kind: RandomizerKind) -> Box<dyn Randomizer> {
    match kind {
        RandomizerKind::SevenBag => Box::new(SevenBag::new()),
        RandomizerKind::SinglePiece { piece } => Box::new(SinglePiece { piece }),
    }
}
