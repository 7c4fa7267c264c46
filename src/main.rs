//! Aura CLI — play compositions, audition snippets and inspect patterns.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};

use aura::composition::{Composition, InstrumentType, Snippet, Track};
use aura::instrument::{resolve_frequency, semitone_index};
use aura::pattern::{
    euclidean_rhythm, euclidean_snippet, fibonacci, fibonacci_snippet, golden_ratio_points,
    golden_snippet,
};
use aura::sequencer::{measure_period, TransportLoop};
use aura::studio::{load_config, load_config_from, Studio, StudioConfig};

/// Longest the host sleeps between transport polls.
const MAX_SLEEP: Duration = Duration::from_millis(250);

/// Poll interval while drawing the spectrum.
const SPECTRUM_INTERVAL: Duration = Duration::from_millis(100);

const SPECTRUM_COLUMNS: usize = 32;
const SPECTRUM_GLYPHS: &[u8] = b" .:-=+*#%@";

#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "Composition studio core: play, audition and seed patterns", long_about = None)]
struct Cli {
    /// Config file (default: ~/.aura/studio.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loop a composition once per measure until Ctrl-C
    Play {
        /// Composition JSON file
        file: PathBuf,

        /// Global pitch shift in semitones (overrides the file)
        #[arg(long, allow_hyphen_values = true)]
        pitch_shift: Option<i32>,

        /// Stop after this many measures
        #[arg(long)]
        cycles: Option<u64>,

        /// Draw the master bus spectrum while playing
        #[arg(long)]
        spectrum: bool,
    },

    /// Play one snippet of a composition once
    Snippet {
        /// Composition JSON file
        file: PathBuf,

        /// Track index
        #[arg(long, default_value_t = 0)]
        track: usize,

        /// Snippet index within the track
        #[arg(long, default_value_t = 0)]
        snippet: usize,
    },

    /// Print a generated pattern, optionally looping it as a snippet
    Pattern {
        #[command(subcommand)]
        kind: PatternKind,
    },

    /// Resolve a pitch token to its frequency
    Pitch {
        /// Pitch token, e.g. C#4
        token: String,

        /// Semitone shift
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        shift: i32,
    },
}

#[derive(Subcommand)]
enum PatternKind {
    /// First N Fibonacci terms
    Fibonacci {
        length: usize,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// N golden-ratio points in [0, 1)
    Golden {
        length: usize,
        #[command(flatten)]
        play: PlayArgs,
    },
    /// Euclidean rhythm E(K, N)
    Euclid {
        onsets: usize,
        pulses: usize,
        #[command(flatten)]
        play: PlayArgs,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// Seed a snippet from the pattern and loop it
    #[arg(long)]
    play: bool,

    /// Instrument for the seeded snippet
    #[arg(long, default_value = "PLUCK", value_parser = parse_instrument)]
    instrument: InstrumentType,

    /// Comma-separated pitches; euclid uses the first
    #[arg(long, value_delimiter = ',', default_value = "C4,D4,E4,G4,A4")]
    pitches: Vec<String>,

    /// Tempo for playback
    #[arg(long, default_value_t = 120)]
    bpm: u32,

    /// Stop after this many measures
    #[arg(long)]
    cycles: Option<u64>,
}

fn parse_instrument(tag: &str) -> Result<InstrumentType, String> {
    InstrumentType::from_tag(tag).ok_or_else(|| {
        let known: Vec<&str> = InstrumentType::ALL.iter().map(|i| i.tag()).collect();
        format!("unknown instrument {tag:?} (expected one of {})", known.join(", "))
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };

    match cli.command {
        Commands::Play {
            file,
            pitch_shift,
            cycles,
            spectrum,
        } => {
            let composition = read_composition(&file)?;
            let mut studio = Studio::new(config);
            studio.apply_composition(&composition);
            if let Some(shift) = pitch_shift {
                studio.set_pitch_shift(shift);
            }
            run_transport(&mut studio, &composition, cycles, spectrum)
        }
        Commands::Snippet {
            file,
            track,
            snippet,
        } => {
            let composition = read_composition(&file)?;
            let chosen = composition
                .tracks
                .get(track)
                .and_then(|t| t.snippets.get(snippet))
                .ok_or_else(|| format!("no snippet {snippet} on track {track}"))?;

            let mut studio = Studio::new(config);
            studio.apply_composition(&composition);
            audition(&mut studio, chosen, composition.bpm)
        }
        Commands::Pattern { kind } => run_pattern(kind, config),
        Commands::Pitch { token, shift } => {
            let frequency = resolve_frequency(&token, shift);
            match semitone_index(&token) {
                Some(index) => println!("{token} (index {index}, shift {shift}): {frequency:.3} Hz"),
                None => println!("{token}: not a pitch token, falls back to {frequency:.3} Hz"),
            }
            Ok(())
        }
    }
}

fn read_composition(path: &Path) -> Result<Composition, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let composition = Composition::from_json(&json)?;
    log::info!(
        "loaded {:?}: {} bpm, {} track(s)",
        composition.title,
        composition.bpm,
        composition.tracks.len()
    );
    Ok(composition)
}

fn run_pattern(kind: PatternKind, config: StudioConfig) -> Result<(), Box<dyn Error>> {
    let (snippet, args) = match kind {
        PatternKind::Fibonacci { length, play } => {
            println!("{:?}", fibonacci(length));
            let pitches = pitch_refs(&play.pitches);
            let s = fibonacci_snippet("Fibonacci", play.instrument, &pitches, length, 0.8);
            (s, play)
        }
        PatternKind::Golden { length, play } => {
            let points: Vec<String> = golden_ratio_points(length)
                .iter()
                .map(|p| format!("{p:.4}"))
                .collect();
            println!("[{}]", points.join(", "));
            let pitches = pitch_refs(&play.pitches);
            let s = golden_snippet("Golden", play.instrument, &pitches, length, 0.8);
            (s, play)
        }
        PatternKind::Euclid {
            onsets,
            pulses,
            play,
        } => {
            println!("{:?}", euclidean_rhythm(onsets, pulses));
            let pitch = play.pitches.first().map(String::as_str).unwrap_or("C4");
            let s = euclidean_snippet("Euclid", play.instrument, onsets, pulses, pitch, 0.8);
            (s, play)
        }
    };

    if !args.play {
        return Ok(());
    }

    let composition = Composition {
        title: snippet.math_pattern.clone(),
        bpm: args.bpm,
        scale: "Chromatic".to_string(),
        time_signature: "4/4".to_string(),
        global_pitch_shift: 0,
        tracks: vec![Track {
            id: "pattern".to_string(),
            name: "Pattern".to_string(),
            snippets: vec![snippet],
            volume: 1.0,
            muted: false,
        }],
        lyrics: None,
    };
    composition.validate()?;

    let mut studio = Studio::new(config);
    run_transport(&mut studio, &composition, args.cycles, false)
}

fn pitch_refs(pitches: &[String]) -> Vec<&str> {
    pitches.iter().map(String::as_str).collect()
}

fn stop_flag() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst)) {
        log::warn!("Ctrl-C handler not installed: {e}");
    }
    running
}

/// Drive the transport until Ctrl-C, or until `cycles` measures have played out
/// and the last pass has rung out.
fn run_transport(
    studio: &mut Studio,
    composition: &Composition,
    cycles: Option<u64>,
    show_spectrum: bool,
) -> Result<(), Box<dyn Error>> {
    let running = stop_flag();
    let origin = Instant::now();
    let mut transport = TransportLoop::new();

    if !transport.start(studio, composition, origin.elapsed()) {
        return Err("cannot start transport at tempo 0".into());
    }
    if studio.is_unavailable() {
        return Err("no audio output available".into());
    }

    let max_sleep = if show_spectrum {
        SPECTRUM_INTERVAL
    } else {
        MAX_SLEEP
    };

    while running.load(Ordering::SeqCst) {
        let now = origin.elapsed();
        let measure_done = transport
            .time_until_next(now)
            .map_or(true, |left| left.is_zero());
        if measure_done && cycles.is_some_and(|limit| transport.cycles() >= limit) {
            break;
        }

        transport.poll(studio, composition, now);

        if show_spectrum {
            println!("{}", spectrum_line(&studio.spectrum()));
        }

        let wait = transport
            .time_until_next(origin.elapsed())
            .unwrap_or(max_sleep)
            .min(max_sleep);
        thread::sleep(wait);
    }

    transport.stop();
    if running.load(Ordering::SeqCst) {
        ring_out(studio, &running);
    }
    Ok(())
}

/// Wait until the last scheduled voice has stopped, or until Ctrl-C.
fn ring_out(studio: &Studio, running: &AtomicBool) {
    let (Some(now), Some(last_stop)) = (studio.current_time(), studio.last_voice_stop()) else {
        return;
    };
    let remaining = Duration::from_secs_f64((last_stop - now).max(0.0));
    if remaining.is_zero() {
        return;
    }

    log::debug!("letting the last pass ring out for {:.2}s", remaining.as_secs_f64());
    let deadline = Instant::now() + remaining;
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(MAX_SLEEP.min(deadline.saturating_duration_since(Instant::now())));
    }
}

/// Play one snippet and wait until its last voice has finished.
fn audition(studio: &mut Studio, snippet: &Snippet, bpm: u32) -> Result<(), Box<dyn Error>> {
    let voices = studio.play_snippet(snippet, bpm);
    if studio.is_unavailable() {
        return Err("no audio output available".into());
    }

    let now = studio.current_time().unwrap_or(0.0);
    let last_stop = voices.iter().map(|v| v.stop).fold(now, f64::max);
    let measure = measure_period(bpm).unwrap_or_default();
    let wait = Duration::from_secs_f64((last_stop - now).max(0.0)).max(measure);

    log::info!(
        "playing {:?} ({} voice(s)) for {:.2}s",
        snippet.name,
        voices.len(),
        wait.as_secs_f64()
    );

    let running = stop_flag();
    let deadline = Instant::now() + wait;
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(MAX_SLEEP.min(deadline.saturating_duration_since(Instant::now())));
    }
    Ok(())
}

/// Collapse the byte spectrum into a row of glyphs.
fn spectrum_line(bins: &[u8]) -> String {
    if bins.is_empty() {
        return String::new();
    }
    let per_column = bins.len().div_ceil(SPECTRUM_COLUMNS).max(1);
    bins.chunks(per_column)
        .map(|chunk| {
            let peak = chunk.iter().copied().max().unwrap_or(0) as usize;
            SPECTRUM_GLYPHS[peak * (SPECTRUM_GLYPHS.len() - 1) / 255] as char
        })
        .collect()
}
