/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::landmark::HandObservation;
use sim::event::GameEvent;
use sim::save::FileScoreStore;
use sim::world::WorldState;
use ui::hand_feed::{self, LandmarkSource};
use ui::input::{Command, InputState};
use ui::renderer::Renderer;

fn main() {
    let (config, warnings) = GameConfig::load();
    init_logging(&config);
    for w in &warnings {
        warn!("{w}");
    }
    info!("pinch2048 v{} starting", env!("CARGO_PKG_VERSION"));

    let store = FileScoreStore::in_save_dir();
    info!("best score file: {}", store.path().display());
    let mut world = WorldState::new(&config, Box::new(store));

    let mut feed = match hand_feed::open_source(&config.landmarks) {
        Ok(Some(source)) => {
            world.set_feed_live();
            Some(source)
        }
        Ok(None) => {
            info!("hand input disabled, keyboard only");
            None
        }
        Err(e) => {
            warn!("{e}; continuing with keyboard only");
            world.message = "Hand feed unavailable: keyboard only".into();
            None
        }
    };

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &mut feed, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        warn!("game loop ended: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Pinch 2048!");
    println!("Final Score: {}   Best: {}", world.score(), world.best_score());
}

/// Log to a file: the terminal belongs to the renderer. `RUST_LOG` overrides
/// the configured filter. Failure leaves logging off.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("could not open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = result {
        eprintln!("logging disabled: {e}");
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    feed: &mut Option<Box<dyn LandmarkSource>>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let start = Instant::now();
    let frame_sleep = Duration::from_millis(config.frame_sleep_ms);
    let stale_ms = config.landmarks.stale_after_ms();
    let mut last_frame_ms: Option<u64> = None;

    loop {
        let now_ms = start.elapsed().as_millis() as u64;

        kb.drain_events();
        for cmd in kb.commands() {
            let events = match cmd {
                Command::Quit => return Ok(()),
                Command::NewGame => world.new_game(),
                Command::Move(dir) => world.handle_key(dir, now_ms),
            };
            log_events(&events);
        }

        if let Some(source) = feed.as_mut() {
            match source.poll(now_ms) {
                Some(obs) => {
                    last_frame_ms = Some(now_ms);
                    log_events(&world.handle_observation(&obs, now_ms));
                }
                None => {
                    if last_frame_ms.is_some_and(|t| now_ms.saturating_sub(t) > stale_ms) {
                        debug!("landmark feed stale, dropping hand");
                        last_frame_ms = None;
                        world.handle_observation(&HandObservation::Absent, now_ms);
                    }
                }
            }
        }

        world.tick(now_ms);
        renderer.render(&world.snapshot())?;
        std::thread::sleep(frame_sleep);
    }
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Moved { dir, source, gained } => {
                info!("move {dir:?} from {source:?}, +{gained}");
            }
            GameEvent::TileSpawned(s) => debug!("spawned {} at {:?}", s.value, s.pos),
            GameEvent::MoveIgnored { dir, source } => debug!("move {dir:?} from {source:?} ignored"),
            GameEvent::BestScore(best) => info!("new best score {best}"),
            GameEvent::GameOver { score } => info!("game over, score {score}"),
            GameEvent::NewGame => info!("new game"),
        }
    }
}
