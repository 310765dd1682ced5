use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::time::Duration;

use crate::game::Game;
use crate::rules::Rules;
use crate::trial::{ActionKind, Move};

/// Trait that all bots must implement
pub trait Bot: Send {
    /// Get the name of the bot
    fn name(&self) -> &str;

    /// Get the next move for the current game
    /// The bot has a time limit to respond
    fn get_move(&mut self, game: &Game, time_limit: Duration) -> Option<Move>;

    /// Notified when the game starts
    fn game_start(&mut self, _player: u32) {}

    /// Notified when a move is made (by either player)
    fn notify_move(&mut self, _mv: &Move) {}

    /// Notified when the game ends
    fn game_end(&mut self) {}
}

/// Picks uniformly among the legal moves
pub struct RandomBot {
    name: String,
    rng: StdRng,
}

impl RandomBot {
    pub fn new(name: String) -> Self {
        RandomBot {
            name,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible bot for tests and replays
    pub fn seeded(name: String, seed: u64) -> Self {
        RandomBot {
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, game: &Game, _time_limit: Duration) -> Option<Move> {
        game.legal_moves().choose(&mut self.rng).cloned()
    }
}

/// Captures as much as it can, otherwise stays close to the centre so the
/// board grows slowly
pub struct GreedyBot {
    name: String,
}

impl GreedyBot {
    pub fn new(name: String) -> Self {
        GreedyBot { name }
    }

    fn evaluate_move(&self, game: &Game, mv: &Move) -> i64 {
        let mut context = game.context().clone();
        let Ok(done) = game.rules().apply(&mut context, mv) else {
            return i64::MIN;
        };
        let captures = done
            .actions
            .iter()
            .filter(|a| a.kind == ActionKind::Remove)
            .count() as i64;

        let distance = mv
            .to()
            .and_then(|cell| game.context().topology().distances().to_centre.get(cell).copied())
            .unwrap_or(0) as i64;

        captures * 100 - distance
    }
}

impl Bot for GreedyBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_move(&mut self, game: &Game, _time_limit: Duration) -> Option<Move> {
        let moves = game.legal_moves();
        // max_by_key keeps the last maximum, so scan in reverse to prefer
        // the lowest cell on ties
        moves
            .into_iter()
            .rev()
            .max_by_key(|mv| self.evaluate_move(game, mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn test_random_bot_plays_legal_moves() {
        let game = Game::new(GameConfig::default()).unwrap();
        let mut bot = RandomBot::seeded("Random".to_string(), 7);
        let mv = bot.get_move(&game, Duration::from_secs(1)).unwrap();
        assert!(game.legal_moves().contains(&mv));
    }

    #[test]
    fn test_seeded_random_bots_agree() {
        let game = Game::new(GameConfig::default()).unwrap();
        let mut a = RandomBot::seeded("A".to_string(), 11);
        let mut b = RandomBot::seeded("B".to_string(), 11);
        assert_eq!(
            a.get_move(&game, Duration::from_secs(1)),
            b.get_move(&game, Duration::from_secs(1))
        );
    }

    #[test]
    fn test_greedy_prefers_centre_on_empty_board() {
        let game = Game::new(GameConfig::default()).unwrap();
        let mut bot = GreedyBot::new("Greedy".to_string());
        let mv = bot.get_move(&game, Duration::from_secs(1)).unwrap();
        assert_eq!(mv.to(), Some(12));
    }

    #[test]
    fn test_greedy_takes_capture() {
        let mut game = Game::new(GameConfig::default()).unwrap();
        for cell in [12, 13, 7, 8] {
            game.place(cell).unwrap();
        }
        // X at 12 and 7, O at 13 and 8: both 9 and 14 capture, 9 is lower
        let mut bot = GreedyBot::new("Greedy".to_string());
        let mv = bot.get_move(&game, Duration::from_secs(1)).unwrap();
        assert_eq!(mv.to(), Some(9));
    }

    #[test]
    fn test_no_moves_when_game_over() {
        let mut game = Game::new(GameConfig::default()).unwrap();
        for cell in [12, 13, 7, 8, 17, 18] {
            game.place(cell).unwrap();
        }
        let mut bot = GreedyBot::new("Greedy".to_string());
        assert!(bot.get_move(&game, Duration::from_secs(1)).is_none());
    }
}
