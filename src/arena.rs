use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::bot::Bot;
use crate::config::MatchConfig;
use crate::error::PlayError;
use crate::game::Game;
use crate::rules::GameResult;
use crate::trial::Move;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Winner {
        winner_name: String,
        player: u32,
        moves: usize,
    },
    Draw {
        moves: usize,
    },
    Timeout {
        violator: String,
        winner: String,
    },
    IllegalMove {
        violator: String,
        winner: String,
    },
    /// The engine failed while growing the board.
    Aborted {
        reason: String,
        moves: usize,
    },
}

impl MatchResult {
    pub fn winner(&self) -> Option<&str> {
        match self {
            MatchResult::Winner { winner_name, .. } => Some(winner_name),
            MatchResult::Timeout { winner, .. } => Some(winner),
            MatchResult::IllegalMove { winner, .. } => Some(winner),
            MatchResult::Draw { .. } | MatchResult::Aborted { .. } => None,
        }
    }
}

/// A two-bot match on a growing board.
pub struct Match {
    config: MatchConfig,
    game: Game,
    first_bot: Box<dyn Bot>,
    second_bot: Box<dyn Bot>,
}

impl Match {
    pub fn new(
        first_bot: Box<dyn Bot>,
        second_bot: Box<dyn Bot>,
        mut config: MatchConfig,
    ) -> Result<Self, PlayError> {
        config.game.players = 2;
        let game = Game::new(config.game.clone())?;
        Ok(Match {
            config,
            game,
            first_bot,
            second_bot,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    fn bot_name(&self, player: u32) -> String {
        match player {
            1 => self.first_bot.name().to_string(),
            _ => self.second_bot.name().to_string(),
        }
    }

    pub fn play(&mut self) -> MatchResult {
        self.first_bot.game_start(1);
        self.second_bot.game_start(2);

        info!(
            first = self.first_bot.name(),
            second = self.second_bot.name(),
            dimension = self.game.dimension(),
            "match starting"
        );
        debug!("initial board\n{}", self.game.display_board());

        while !self.game.is_game_over() && self.game.move_count() < self.config.max_moves {
            if let Some(result) = self.play_move() {
                self.first_bot.game_end();
                self.second_bot.game_end();
                return result;
            }
        }

        self.first_bot.game_end();
        self.second_bot.game_end();

        let moves = self.game.move_count();
        match self.game.result() {
            Some(GameResult::Winner(player)) => {
                let winner_name = self.bot_name(player);
                info!(winner = %winner_name, player, moves, "match won");
                MatchResult::Winner {
                    winner_name,
                    player,
                    moves,
                }
            }
            Some(GameResult::Draw) => {
                info!(moves, "match drawn");
                MatchResult::Draw { moves }
            }
            None => {
                info!(max_moves = self.config.max_moves, "move limit reached, draw");
                MatchResult::Draw { moves }
            }
        }
    }

    fn play_move(&mut self) -> Option<MatchResult> {
        let current_player = self.game.current_player();
        let bot = match current_player {
            1 => &mut self.first_bot,
            _ => &mut self.second_bot,
        };

        debug!(
            move_number = self.game.move_count() + 1,
            bot = bot.name(),
            legal = self.game.legal_moves().len(),
            "to play"
        );

        let start = Instant::now();
        let mv = bot.get_move(&self.game, self.config.time_per_move);
        let elapsed = start.elapsed();

        self.handle_move_result(mv, elapsed, current_player)
    }

    fn handle_move_result(
        &mut self,
        mv: Option<Move>,
        elapsed: Duration,
        current_player: u32,
    ) -> Option<MatchResult> {
        let violator = self.bot_name(current_player);
        let opponent = self.bot_name(3 - current_player);

        if elapsed > self.config.time_per_move {
            warn!(
                bot = %violator,
                ?elapsed,
                limit = ?self.config.time_per_move,
                "timeout"
            );
            return Some(MatchResult::Timeout {
                violator,
                winner: opponent,
            });
        }

        let Some(mv) = mv else {
            info!(bot = %violator, "no move returned");
            return Some(MatchResult::Draw {
                moves: self.game.move_count(),
            });
        };

        let done = match self.game.make_move(&mv) {
            Ok(done) => done,
            Err(PlayError::Grow(e)) => {
                warn!(error = %e, "board growth failed, aborting match");
                return Some(MatchResult::Aborted {
                    reason: e.to_string(),
                    moves: self.game.move_count(),
                });
            }
            Err(e) => {
                warn!(bot = %violator, error = %e, "illegal move");
                return Some(MatchResult::IllegalMove {
                    violator,
                    winner: opponent,
                });
            }
        };

        debug!(bot = %violator, mv = %done, ?elapsed, dimension = self.game.dimension(), "played");
        self.first_bot.notify_move(&done);
        self.second_bot.notify_move(&done);
        debug!("\n{}", self.game.display_board());

        None
    }
}
