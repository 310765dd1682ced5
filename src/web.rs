use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bot::{Bot, GreedyBot, RandomBot};
use crate::config::GameConfig;
use crate::error::PlayError;
use crate::game::Game;
use crate::growing::GrowReport;
use crate::rules::GameResult;
use crate::trial::SavedTrial;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BotType {
    Greedy,
    Random,
}

#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<WebGame>>,
}

struct WebGame {
    game: Game,
    /// Last position known to be consistent, reloaded after a failed grow.
    checkpoint: SavedTrial,
    human: u32,
    bot_type: BotType,
}

#[derive(Serialize, Deserialize, Default)]
pub struct NewGameRequest {
    #[serde(default)]
    config: Option<GameConfig>,
    #[serde(default)]
    player: Option<u32>,
    #[serde(default)]
    bot_type: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct MoveRequest {
    cell: usize,
}

#[derive(Serialize)]
pub struct GameResponse {
    dimension: usize,
    /// Rows top-down, one character per cell.
    board: Vec<String>,
    current_player: u32,
    legal_cells: Vec<usize>,
    hands: Vec<u32>,
    game_over: bool,
    result: Option<GameResult>,
    /// Target of the last move, in current indices.
    last_move: Option<usize>,
    last_grow: Option<GrowReport>,
    message: String,
}

impl AppState {
    pub fn new() -> Result<Self, PlayError> {
        Ok(AppState {
            game: Arc::new(Mutex::new(WebGame::new(GameConfig::default(), 1, BotType::Greedy)?)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebGame> {
        // a panic while holding the lock leaves at worst a stale game
        self.game.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WebGame {
    fn new(config: GameConfig, human: u32, bot_type: BotType) -> Result<Self, PlayError> {
        let game = Game::new(config)?;
        let checkpoint = game.save();
        Ok(WebGame {
            game,
            checkpoint,
            human,
            bot_type,
        })
    }

    /// Plays `cell`, restoring the checkpoint if the grow left the engine
    /// in a bad state.
    fn play(&mut self, cell: usize) -> Result<(), PlayError> {
        match self.game.place(cell) {
            Ok(_) => {
                self.checkpoint = self.game.save();
                Ok(())
            }
            Err(e) if e.is_corrupting() => {
                warn!(error = %e, "grow failed, restoring last checkpoint");
                if let Ok(game) = Game::load(&self.checkpoint) {
                    self.game = game;
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Lets the bot move while it is its turn.
    fn bot_turns(&mut self) -> String {
        let mut messages = Vec::new();
        while !self.game.is_game_over() && self.game.current_player() != self.human {
            let mut bot = bot_instance(self.bot_type);
            let Some(mv) = bot.get_move(&self.game, Duration::from_secs(5)) else {
                messages.push("Bot failed to make a move".to_string());
                break;
            };
            let Some(cell) = mv.to() else {
                break;
            };
            match self.play(cell) {
                Ok(()) => messages.push(format!("Bot played {}", cell)),
                Err(e) => {
                    messages.push(format!("Bot move failed: {}", e));
                    break;
                }
            }
        }
        messages.join("; ")
    }

    /// Rows top-down: `.` empty, `+` playable, otherwise the owner's number.
    fn board_rows(&self) -> Vec<String> {
        let d = self.game.dimension();
        let topology = self.game.context().topology();
        let Ok(board) = self.game.context().state().flat(0) else {
            return Vec::new();
        };
        (0..d)
            .rev()
            .map(|row| {
                (0..d)
                    .filter_map(|col| topology.cell_at(row, col))
                    .map(|cell| match board.who(cell).unwrap_or(0) {
                        0 if board.is_playable(cell).unwrap_or(false) => '+',
                        0 => '.',
                        who => char::from_digit(who, 10).unwrap_or('?'),
                    })
                    .collect()
            })
            .collect()
    }

    fn response(&self, message: String) -> GameResponse {
        let board = self.board_rows();

        let legal_cells = if self.game.current_player() == self.human {
            self.game.legal_moves().iter().filter_map(|m| m.to()).collect()
        } else {
            Vec::new()
        };

        GameResponse {
            dimension: self.game.dimension(),
            board,
            current_player: self.game.current_player(),
            legal_cells,
            hands: (1..=self.game.config().players)
                .map(|p| self.game.pieces_in_hand(p))
                .collect(),
            game_over: self.game.is_game_over(),
            result: self.game.result(),
            last_move: self
                .game
                .context()
                .trial()
                .last_move()
                .and_then(|mv| mv.to()),
            last_grow: self.game.last_grow().cloned(),
            message,
        }
    }
}

fn parse_bot_type(bot_type: Option<&str>) -> BotType {
    match bot_type.map(str::to_lowercase).as_deref() {
        Some("random") => BotType::Random,
        _ => BotType::Greedy,
    }
}

fn bot_instance(bot_type: BotType) -> Box<dyn Bot> {
    match bot_type {
        BotType::Greedy => Box::new(GreedyBot::new("Greedy Bot".to_string())),
        BotType::Random => Box::new(RandomBot::new("Random Bot".to_string())),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

async fn new_game(State(app_state): State<AppState>, Json(req): Json<NewGameRequest>) -> Response {
    let config = req.config.unwrap_or_default();
    let human = req.player.unwrap_or(1);
    if human == 0 || human > config.players {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("player {} is not in a {}-player game", human, config.players),
        );
    }

    let mut web_game = match WebGame::new(config, human, parse_bot_type(req.bot_type.as_deref())) {
        Ok(g) => g,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let message = match web_game.bot_turns() {
        m if m.is_empty() => "Your turn!".to_string(),
        m => m,
    };
    info!(human, dimension = web_game.game.dimension(), "new web game");

    let mut game = app_state.lock();
    *game = web_game;
    Json(game.response(message)).into_response()
}

async fn make_move(State(app_state): State<AppState>, Json(req): Json<MoveRequest>) -> Response {
    let mut game = app_state.lock();

    if game.game.is_game_over() {
        return error_response(StatusCode::BAD_REQUEST, "Game is over".to_string());
    }
    if game.game.current_player() != game.human {
        return error_response(StatusCode::BAD_REQUEST, "Not your turn".to_string());
    }

    if let Err(e) = game.play(req.cell) {
        let status = if e.is_corrupting() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        };
        return error_response(status, e.to_string());
    }

    let message = game.bot_turns();
    Json(game.response(message)).into_response()
}

async fn get_game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let game = app_state.lock();
    Json(game.response(String::new()))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/move", post(make_move))
        .route("/api/game-state", get(get_game_state))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new()?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "web server running");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrowthConfig;

    #[test]
    fn test_board_rows() {
        let web_game = WebGame::new(GameConfig::default(), 1, BotType::Greedy).unwrap();
        let response = web_game.response(String::new());
        assert_eq!(response.board.len(), 5);
        assert!(response.board.iter().all(|row| row == "+++++"));
        assert_eq!(response.legal_cells.len(), 25);
        assert_eq!(response.hands, vec![3, 3]);
    }

    #[test]
    fn test_board_rows_on_a_large_board() {
        let config = GameConfig {
            growth: GrowthConfig {
                initial_dimension: 101,
                step: 2,
            },
            ..GameConfig::default()
        };
        let mut web_game = WebGame::new(config, 1, BotType::Greedy).unwrap();
        let centre = 50 * 101 + 50;
        web_game.play(centre).unwrap();
        let response = web_game.response(String::new());
        assert_eq!(response.board.len(), 101);
        assert!(response.board.iter().all(|row| row.chars().count() == 101));
        assert_eq!(&response.board[50][49..52], "+1+");
        assert_eq!(&response.board[0][..3], "...");
        assert_eq!(response.last_move, Some(centre));
    }

    #[test]
    fn test_last_move_follows_a_grow() {
        let mut web_game = WebGame::new(GameConfig::default(), 1, BotType::Greedy).unwrap();
        web_game.play(10).unwrap();
        let response = web_game.response(String::new());
        assert_eq!(response.dimension, 7);
        assert_eq!(response.last_move, Some(22));
        assert_eq!(response.board[3], "+1+....");
    }

    #[test]
    fn test_bot_replies() {
        let mut web_game = WebGame::new(GameConfig::default(), 1, BotType::Greedy).unwrap();
        web_game.play(12).unwrap();
        let message = web_game.bot_turns();
        assert!(message.starts_with("Bot played"));
        assert_eq!(web_game.game.current_player(), 1);
        assert_eq!(web_game.checkpoint.moves.len(), 2);
    }

    #[test]
    fn test_bot_moves_first_for_second_seat() {
        let mut web_game = WebGame::new(GameConfig::default(), 2, BotType::Greedy).unwrap();
        web_game.bot_turns();
        assert_eq!(web_game.game.move_count(), 1);
        assert_eq!(web_game.game.current_player(), 2);
    }

    #[test]
    fn test_rejected_move_keeps_checkpoint() {
        let mut web_game = WebGame::new(GameConfig::default(), 1, BotType::Random).unwrap();
        web_game.play(12).unwrap();
        assert!(web_game.play(0).is_err());
        assert_eq!(web_game.checkpoint.moves.len(), 1);
    }

    #[test]
    fn test_parse_bot_type() {
        assert_eq!(parse_bot_type(Some("Random")), BotType::Random);
        assert_eq!(parse_bot_type(None), BotType::Greedy);
    }
}
