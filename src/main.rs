use boardless_arena::*;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run_match(save_to: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let bot1 = Box::new(RandomBot::new("RandomBot1".to_string()));
    let bot2 = Box::new(GreedyBot::new("GreedyBot1".to_string()));

    let config = MatchConfig {
        time_per_move: Duration::from_secs(2),
        max_moves: 150,
        game: GameConfig::default(),
    };

    let mut match_game = Match::new(bot1, bot2, config)?;
    let result = match_game.play();

    println!("{}", match_game.game().display_board());
    match result {
        MatchResult::Winner {
            winner_name,
            player,
            moves,
        } => {
            println!("{} wins as player {} in {} moves", winner_name, player, moves);
        }
        MatchResult::Draw { moves } => {
            println!("Draw after {} moves", moves);
        }
        MatchResult::Timeout { violator, winner } => {
            println!("{} wins by timeout (opponent: {})", winner, violator);
        }
        MatchResult::IllegalMove { violator, winner } => {
            println!("{} wins by illegal move (opponent: {})", winner, violator);
        }
        MatchResult::Aborted { reason, moves } => {
            println!("Match aborted after {} moves: {}", moves, reason);
        }
    }

    if let Some(path) = save_to {
        match_game.game().save().save(&path)?;
        info!(%path, "saved trial");
    }
    Ok(())
}

fn show(path: &str) -> Result<(), PersistError> {
    let game = Game::load(&SavedTrial::load(path)?)?;
    println!("{}", game.display_board());
    if let Some(result) = game.result() {
        println!("{:?} after {} moves", result, game.move_count());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "match".to_string());
    match mode.as_str() {
        "serve" => {
            let addr = std::env::args()
                .nth(2)
                .unwrap_or_else(|| "127.0.0.1:3000".to_string());
            if let Err(e) = web::run_server(&addr).await {
                error!(error = %e, "server stopped");
            }
        }
        "match" => {
            info!("boardless arena match");
            if let Err(e) = run_match(std::env::args().nth(2)) {
                error!(error = %e, "match failed");
            }
        }
        "show" => {
            let Some(path) = std::env::args().nth(2) else {
                eprintln!("usage: boardless-arena show <trial.json>");
                std::process::exit(2);
            };
            if let Err(e) = show(&path) {
                error!(error = %e, %path, "could not load trial");
            }
        }
        other => {
            eprintln!("usage: boardless-arena [match [save.json]|serve [addr]|show <trial.json>] (got {})", other);
            std::process::exit(2);
        }
    }
}
