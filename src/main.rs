//! CLI computing contact patches between overlapping balls.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Parser};
use log::{debug, error, info};
use serde::Serialize;
use voronota_contacts::graphics::{contact_graphics, write_pymol_cgo};
use voronota_contacts::input::read_balls;
use voronota_contacts::{
    BatchSummary, Cell, ContactComputation, ContactSummary, PeriodicBox, Settings,
};

/// JSON document written by the CLI.
#[derive(Serialize)]
struct JsonOutput<'a> {
    settings: &'a Settings,
    balls: usize,
    summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_sas_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contacts: Option<&'a [ContactSummary]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cells: Option<&'a [Cell]>,
}

#[derive(Parser)]
#[command(name = "voronota-contacts")]
#[command(about = "Compute radical Voronoi contact patches between overlapping balls")]
#[command(
    long_about = "Computes the contact patch between every pair of overlapping balls, \
    each ball expanded by a solvent probe radius. A patch is the face shared by the two \
    balls' cells in the radical Voronoi tessellation, clipped by all neighboring balls.\n\n\
    Input is plain text with one ball per line; the last four columns are x y z r."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input file with `x y z r` lines. Reads from stdin if not specified
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output JSON file. Writes to stdout if not specified
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with settings; command-line values take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rolling probe radius [default: 1.4]
    #[arg(long)]
    probe: Option<f64>,

    /// Tolerance of geometric comparisons [default: 1e-10]
    #[arg(long)]
    epsilon: Option<f64>,

    /// Cap (positive) or shrink (negative) every intersection circle radius
    #[arg(long, allow_negative_numbers = true)]
    max_circle_radius: Option<f64>,

    /// Periodic box corners: x1 y1 z1 x2 y2 z2
    #[arg(
        long,
        num_args = 6,
        allow_negative_numbers = true,
        value_names = ["X1", "Y1", "Z1", "X2", "Y2", "Z2"]
    )]
    periodic_box_corners: Option<Vec<f64>>,

    /// Fail on invalid balls instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Include per-contact records
    #[arg(long)]
    contacts: bool,

    /// Include per-ball surface areas and volumes
    #[arg(long)]
    cells: bool,

    /// Write a PyMOL CGO script drawing the contacts
    #[arg(long)]
    graphics: Option<PathBuf>,

    /// Arc sampling length for graphics
    #[arg(long, default_value_t = 0.2)]
    graphics_step: f64,

    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Reduce verbosity to warnings only
    #[arg(short, long)]
    quiet: bool,

    /// Maximum number of threads to use (default: all available)
    #[arg(long)]
    processors: Option<usize>,
}

impl Cli {
    fn settings(&self) -> io::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => {
                let reader = BufReader::new(File::open(path)?);
                let settings: Settings = serde_json::from_reader(reader)?;
                info!("Loaded settings from {}", path.display());
                settings
            }
            None => Settings::default(),
        };
        if let Some(probe) = self.probe {
            settings.probe = probe;
        }
        if let Some(epsilon) = self.epsilon {
            settings.epsilon = epsilon;
        }
        if let Some(max_circle_radius) = self.max_circle_radius {
            settings.max_circle_radius = max_circle_radius;
        }
        if let Some(&[x1, y1, z1, x2, y2, z2]) = self.periodic_box_corners.as_deref() {
            settings.periodic_box = Some(PeriodicBox::from_corners([x1, y1, z1], [x2, y2, z2]));
        }
        settings.strict |= self.strict;
        Ok(settings)
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Some(num_threads) = cli.processors {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(io::Error::other)?;
        info!("Using {num_threads} threads");
    }

    let settings = cli.settings()?;
    let balls = read_balls(cli.input.as_deref())?;
    info!("Read {} balls", balls.len());

    let computation = ContactComputation::new(&balls, &settings).map_err(|e| {
        error!("{e}");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let start = Instant::now();
    let descriptors = computation.descriptors();
    let result = computation.collect(&descriptors, cli.cells);
    debug!("Contacts computed in {} ms", start.elapsed().as_millis());

    if let Some(path) = &cli.graphics {
        let faces: Vec<_> = descriptors
            .iter()
            .filter_map(|cd| contact_graphics(cd, cli.graphics_step))
            .collect();
        write_pymol_cgo(BufWriter::new(File::create(path)?), "contacts", &balls, &faces)?;
        info!("Wrote {} faces to {}", faces.len(), path.display());
    }

    let output = JsonOutput {
        settings: computation.settings(),
        balls: balls.len(),
        summary: result.summary,
        total_sas_area: cli.cells.then(|| result.total_sas_area()),
        total_volume: cli.cells.then(|| result.total_volume()),
        contacts: cli.contacts.then_some(result.contacts.as_slice()),
        cells: cli.cells.then_some(result.cells.as_slice()),
    };

    if let Some(path) = &cli.output {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, &output)?;
    } else {
        let stdout = io::stdout().lock();
        serde_json::to_writer_pretty(stdout, &output)?;
        println!();
    }

    Ok(())
}
