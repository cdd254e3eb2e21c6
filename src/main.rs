//! Sequencing conveyor - headless runner
//!
//! Plays one level with a scripted player against the headless renderer and
//! prints the level summary as JSON.
//!
//! Usage: `seq-conveyor [LEVELS.json [INDEX]]`
//!
//! Environment:
//! - `RUST_LOG`: log filter (env_logger)
//! - `SEQ_CONVEYOR_SETTINGS`: settings JSON file
//! - `SEQ_CONVEYOR_SEED`: RNG seed for controls and the scripted player

use std::process::ExitCode;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use seq_conveyor::{
    ConveyorError, HeadlessRenderer, LevelConfig, LevelPack, Session, Settings,
};

/// Host frame length (ms)
const FRAME_MS: u64 = 20;
/// Give up after this many frames (about 2.8 hours of game time)
const MAX_FRAMES: u32 = 500_000;
const DEFAULT_SEED: u64 = 0x5EED;
/// Chance the scripted player drops a wrong base
const MISTAKE_RATE: f64 = 0.1;

/// Scripted player: drops the right partner most of the time
struct Autoplayer {
    rng: Pcg32,
    mistake_rate: f64,
}

impl Autoplayer {
    fn new(seed: u64, mistake_rate: f64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            mistake_rate,
        }
    }

    fn act(&mut self, session: &mut Session<HeadlessRenderer>) {
        let conveyor = session.conveyor();
        if conveyor.is_busy() || conveyor.is_complete() {
            return;
        }
        let Some(partner) = conveyor.head_token().and_then(|h| conveyor.valid_match_of(h)) else {
            return;
        };

        let controls = session.controls().controls();
        let blunder = self.rng.random_bool(self.mistake_rate);
        let Some(index) = controls.iter().position(|c| (c.base == partner) != blunder) else {
            return;
        };

        // Tap the control upright before dropping it
        for _ in 0..4 {
            match session.controls().get(index) {
                Some(c) if c.angle % 180.0 != 0.0 => {
                    session.rotate_control(index);
                }
                _ => break,
            }
        }

        if let Some(result) = session.drop_control(index) {
            log::debug!("Dropped control {}: {:?}", index, result);
        }
    }
}

fn load_level(mut args: impl Iterator<Item = String>) -> Result<LevelConfig, ConveyorError> {
    let Some(path) = args.next() else {
        log::info!("No level file given, playing the demo level");
        return Ok(LevelConfig::demo());
    };
    let index = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let pack = LevelPack::load(&path)?;
    pack.get(index).cloned().ok_or(ConveyorError::MissingLevel(index))
}

fn load_settings() -> Result<Settings, ConveyorError> {
    match std::env::var("SEQ_CONVEYOR_SETTINGS") {
        Ok(path) => Settings::load(path),
        Err(_) => Ok(Settings::default()),
    }
}

fn run() -> Result<(), ConveyorError> {
    let level = load_level(std::env::args().skip(1))?;
    let settings = load_settings()?;
    let seed = std::env::var("SEQ_CONVEYOR_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SEED);

    let mut session = Session::new(level, settings, HeadlessRenderer::new(), seed)?;
    let mut player = Autoplayer::new(seed, MISTAKE_RATE);

    let mut frames = 0;
    while !session.is_done() && frames < MAX_FRAMES {
        player.act(&mut session);
        session.update(FRAME_MS);
        for event in session.drain_events() {
            log::debug!("[{} ms] {:?}", session.now_ms(), event);
        }
        frames += 1;
    }
    if !session.is_done() {
        log::warn!("Stopped after {} frames without finishing the level", frames);
    }

    let (summary, renderer) = session.finish();
    log::info!(
        "Renderer: {} drawables created, {} destroyed",
        renderer.created_count(),
        renderer.destroyed_count()
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Sequencing conveyor (native) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
