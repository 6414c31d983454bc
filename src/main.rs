// hexseq - command line front end
// Exports arrangements to sequence files or plays them to MIDI outputs

use hexseq::midi::{MidiDeviceManager, MidiPortManager, OutputSink, TracingSink};
use hexseq::messaging::{PlayerNotification, drain_notifications};
use hexseq::sequencer::MusicalTime;
use hexseq::{Arrangement, MidiEventPlayer, MidiFileBuilder, Sequence};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage:
  hexseq export <arrangement.ron> <out.mid>
  hexseq play <arrangement.ron> [--from <tick>] [--dry-run]
  hexseq ports";

/// Polling period of the notification queue while playing
const POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Command {
    Export {
        arrangement: PathBuf,
        output: PathBuf,
    },
    Play {
        arrangement: PathBuf,
        from: f64,
        dry_run: bool,
    },
    Ports,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        Some("export") => match &args[1..] {
            [arrangement, output] => Ok(Command::Export {
                arrangement: PathBuf::from(arrangement),
                output: PathBuf::from(output),
            }),
            _ => Err("export takes an arrangement and an output path".to_string()),
        },
        Some("play") => {
            let mut arrangement = None;
            let mut from = 0.0;
            let mut dry_run = false;
            let mut rest = args[1..].iter();
            while let Some(arg) = rest.next() {
                match arg.as_str() {
                    "--dry-run" => dry_run = true,
                    "--from" => {
                        let value = rest.next().ok_or("--from needs a tick")?;
                        from = value
                            .parse::<f64>()
                            .ok()
                            .filter(|tick| tick.is_finite() && *tick >= 0.0)
                            .ok_or_else(|| format!("Invalid start tick: {value}"))?;
                    }
                    path if arrangement.is_none() => arrangement = Some(PathBuf::from(path)),
                    other => return Err(format!("Unexpected argument: {other}")),
                }
            }
            let arrangement = arrangement.ok_or("play takes an arrangement path")?;
            Ok(Command::Play {
                arrangement,
                from,
                dry_run,
            })
        }
        Some("ports") => Ok(Command::Ports),
        Some(other) => Err(format!("Unknown command: {other}")),
        None => Err("No command given".to_string()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexseq=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Command::Export {
            arrangement,
            output,
        } => export(&arrangement, &output),
        Command::Play {
            arrangement,
            from,
            dry_run,
        } => play(&arrangement, from, dry_run),
        Command::Ports => {
            list_ports();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<Sequence, Box<dyn std::error::Error>> {
    Ok(Arrangement::load(path)?.build()?)
}

fn export(arrangement: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sequence = load(arrangement)?;
    let events = sequence.events();

    let mut builder = MidiFileBuilder::new();
    builder.set_resolution(sequence.timing.ticks_per_quarter);
    builder.set_tempo(&sequence.tempo, &sequence.time_signature);
    builder.set_min_tracks(sequence.tracks.len());
    builder.set_events(&events);
    builder.write_to_file(output)?;

    tracing::info!(
        events = events.len(),
        tracks = builder.num_tracks(),
        "Export finished"
    );
    Ok(())
}

/// One output per track that names a port; tuning goes where the track allows it
fn open_outputs(sequence: &Sequence) -> MidiPortManager {
    let mut manager = MidiPortManager::new();
    for (index, track) in sequence.tracks.iter().enumerate() {
        let index = index as u8;
        manager.set_sends_tuning(index, track.sends_tuning);
        if let Some(port) = track.output_port {
            if let Err(e) = manager.connect_track(index, port) {
                tracing::warn!(track = index, error = %e, "Track output not opened");
            }
        }
    }
    if manager.open_count() == 0 {
        tracing::warn!("No track output is open, playback will be silent");
    }
    manager
}

fn play(arrangement: &Path, from: f64, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let sequence = load(arrangement)?;
    let events = sequence.events();
    let end_tick = sequence.end_tick();

    let sink: Box<dyn OutputSink> = if dry_run {
        Box::new(TracingSink)
    } else {
        Box::new(open_outputs(&sequence))
    };

    let (mut player, mut notifications) = MidiEventPlayer::new(sink, sequence.timing);
    player.set_tempo(&sequence.tempo, &sequence.time_signature);
    player.set_events(events);
    player.set_end_tick(Some(end_tick));
    player.set_loop_region(sequence.loop_region);
    player.set_tick_position(from);

    tracing::info!(
        tempo = %sequence.tempo,
        time_signature = %sequence.time_signature,
        end_tick,
        looping = sequence.loop_region.is_some(),
        "Playing"
    );
    player.start();

    loop {
        let mut finished = false;
        for notification in drain_notifications(&mut notifications) {
            match notification {
                PlayerNotification::Measure => {
                    let time = MusicalTime::from_ticks(player.position(), &sequence.time_signature);
                    tracing::debug!(%time, "Measure");
                }
                PlayerNotification::Beat => tracing::trace!("Beat"),
                PlayerNotification::GeneratorChanged(cents) => {
                    tracing::debug!(cents, "Generator")
                }
                PlayerNotification::TickPosition(tick) => tracing::trace!(tick, "Position"),
                PlayerNotification::Finished => finished = true,
            }
        }
        if finished {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    player.wait();
    tracing::info!("Playback finished");
    Ok(())
}

fn list_ports() {
    let ports = MidiDeviceManager::new().list_output_ports();
    if ports.is_empty() {
        println!("No MIDI output ports found");
        return;
    }
    for port in ports {
        let marker = if port.is_default { " (default)" } else { "" };
        println!("{}: {}{}", port.index, port.name, marker);
    }
}
