use tracing::debug;

use crate::config::GameConfig;
use crate::context::Context;
use crate::error::{GameError, PersistError, PlayError};
use crate::growing::{GrowReport, GrowingBoard, PostGrowCallback};
use crate::rules::{GameResult, PlacementRules, Rules};
use crate::trial::{Action, Move, SavedMove, SavedTrial};

/// A boardless placement game: rules, engine state and grow controller.
///
/// Site indices in moves and reports are only valid until the next grow.
/// Every `make_move` may re-index the board, so fetch fresh moves from
/// `legal_moves` afterwards.
#[derive(Debug)]
pub struct Game {
    rules: PlacementRules,
    context: Context,
    growing: GrowingBoard,
    history: Vec<SavedMove>,
}

impl Game {
    /// Create a new game and play the scripted setup
    pub fn new(config: GameConfig) -> Result<Self, PlayError> {
        config.validate()?;
        let rules = PlacementRules::new(config);
        let mut context = rules.new_context()?;
        rules.start(&mut context)?;
        context.refresh_legal_moves(&rules);
        Ok(Game {
            rules,
            context,
            growing: GrowingBoard::new(),
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        self.rules.config()
    }

    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn dimension(&self) -> usize {
        self.context.board().dimension()
    }

    pub fn current_player(&self) -> u32 {
        self.context.state().mover()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.rules.result(&self.context)
    }

    pub fn is_game_over(&self) -> bool {
        self.result().is_some()
    }

    /// Decisions played so far, setup excluded.
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Global site of `player`'s hand.
    pub fn hand_site(&self, player: u32) -> Option<usize> {
        self.context.equipment().hand_of(player).map(|h| h.index)
    }

    /// Pieces left in `player`'s hand.
    pub fn pieces_in_hand(&self, player: u32) -> u32 {
        self.context
            .equipment()
            .hand_of(player)
            .and_then(|h| self.context.state().flat(h.id).ok())
            .and_then(|s| s.count(0).ok())
            .unwrap_or(0)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.context.legal_moves(&self.rules)
    }

    pub fn hash(&self) -> u64 {
        self.context.state().hash()
    }

    pub fn last_grow(&self) -> Option<&GrowReport> {
        self.growing.last_report()
    }

    pub fn set_post_grow_callback(&mut self, callback: PostGrowCallback) {
        self.growing.set_post_grow_callback(callback);
    }

    /// Applies `mv`, then grows the board if it landed on the perimeter.
    /// Returns the canonical move in the indices it was played with.
    pub fn make_move(&mut self, mv: &Move) -> Result<Move, PlayError> {
        if self.is_game_over() {
            return Err(GameError::GameOver.into());
        }
        let dimension = self.dimension();
        let done = self.context.apply(&self.rules, mv)?;
        self.history.push(SavedMove {
            dimension,
            mv: done.clone(),
        });

        let grown = self
            .growing
            .check_move_impact_on_board(&self.rules, &mut self.context, &done)?
            .is_some();
        if !grown {
            self.context.refresh_legal_moves(&self.rules);
        }
        debug!(mv = %done, grown, "move applied");
        Ok(done)
    }

    /// Places a piece of the current player on `cell`.
    pub fn place(&mut self, cell: usize) -> Result<Move, PlayError> {
        let mover = self.current_player();
        let what = PlacementRules::kind_of(mover);
        let mv = match self.hand_site(mover) {
            Some(hand) => Move::place(mover, hand, cell, what),
            None => Move::new(mover, vec![Action::add(cell, mover, what, 1)]),
        };
        self.make_move(&mv)
    }

    pub fn save(&self) -> SavedTrial {
        SavedTrial {
            config: self.config().clone(),
            moves: self.history.clone(),
        }
    }

    /// Rebuilds a game by replaying `saved` from a fresh board.
    pub fn load(saved: &SavedTrial) -> Result<Game, PersistError> {
        let mut game = Game::new(saved.config.clone()).map_err(|e| persist_error(e, 0))?;
        for (move_index, saved_move) in saved.moves.iter().enumerate() {
            if saved_move.dimension != game.dimension() {
                return Err(PersistError::Replay {
                    move_index,
                    source: GameError::InvalidMove(format!(
                        "recorded on a {0}x{0} board, replay is at {1}x{1}",
                        saved_move.dimension,
                        game.dimension()
                    )),
                });
            }
            game.make_move(&saved_move.mv)
                .map_err(|e| persist_error(e, move_index))?;
        }
        Ok(game)
    }

    /// Get a string representation of the board
    pub fn display_board(&self) -> String {
        let d = self.dimension();
        let mut result = String::new();
        result.push_str(&format!("[{} {}x{}]\n", self.rules.name(), d, d));

        let board = self.context.state().flat(0).ok();
        for row in (0..d).rev() {
            result.push_str(&format!("{:3} ", row * d));
            for col in 0..d {
                let cell = row * d + col;
                let who = board.and_then(|b| b.who(cell).ok()).unwrap_or(0);
                let playable = board.and_then(|b| b.is_playable(cell).ok()).unwrap_or(false);
                let c = match who {
                    0 if playable => '+',
                    0 => '.',
                    1 => 'X',
                    2 => 'O',
                    n => char::from_digit(n, 10).unwrap_or('?'),
                };
                result.push_str(&format!(" {}", c));
            }
            result.push('\n');
        }

        result.push_str("hands:");
        for player in 1..=self.rules.num_players() {
            result.push_str(&format!(" P{}={}", player, self.pieces_in_hand(player)));
        }
        result.push('\n');
        result
    }
}

fn persist_error(error: PlayError, move_index: usize) -> PersistError {
    match error {
        PlayError::Config(e) => PersistError::Config(e),
        PlayError::Game(source) => PersistError::Replay { move_index, source },
        PlayError::Grow(e) => PersistError::Grow(e),
    }
}
