#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use voronota_contacts::Ball;

pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Deserialize)]
pub struct Summary {
    pub valid_count: usize,
    pub total_area: f64,
    pub total_complexity: usize,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub id_a: usize,
    pub id_b: usize,
    pub area: f64,
    pub arc_length: f64,
    pub central: bool,
}

#[derive(Debug, Deserialize)]
pub struct Cell {
    pub index: usize,
    pub sas_area: f64,
    pub volume: f64,
}

#[derive(Debug, Deserialize)]
pub struct Output {
    pub balls: usize,
    pub summary: Summary,
    pub total_sas_area: Option<f64>,
    pub total_volume: Option<f64>,
    pub contacts: Option<Vec<Contact>>,
    pub cells: Option<Vec<Cell>>,
}

pub fn binary_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_voronota-contacts"))
}

/// Run the binary with `input` on stdin; returns exit success, stdout and stderr.
pub fn run_with_stdin(args: &[&str], input: &str) -> (bool, String, String) {
    let mut child = binary_command()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn binary");
    child
        .stdin
        .take()
        .expect("stdin was not piped")
        .write_all(input.as_bytes())
        .expect("failed to write stdin");
    let output = child.wait_with_output().expect("failed to wait");
    (
        output.status.success(),
        String::from_utf8(output.stdout).expect("stdout was not UTF-8"),
        String::from_utf8(output.stderr).expect("stderr was not UTF-8"),
    )
}

pub fn run_cli(args: &[&str], input: &str) -> Output {
    let (success, stdout, stderr) = run_with_stdin(args, input);
    assert!(success, "binary failed: {stderr}");
    serde_json::from_str(&stdout).expect("failed to parse JSON output")
}

/// `n` balls with centers uniform in a cube of half-width `extent`, radii in `radii`.
pub fn random_balls(seed: u64, n: usize, extent: f64, radii: (f64, f64)) -> Vec<Ball> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Ball::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(radii.0..radii.1),
            )
        })
        .collect()
}

/// Cubic lattice of `side`³ equal balls, x varying slowest.
pub fn lattice_balls(side: usize, spacing: f64, r: f64) -> Vec<Ball> {
    let coord = |i: usize| spacing * i as f64;
    (0..side)
        .flat_map(|i| (0..side).flat_map(move |j| (0..side).map(move |k| (i, j, k))))
        .map(|(i, j, k)| Ball::new(coord(i), coord(j), coord(k), r))
        .collect()
}

/// Move every center by up to `amount` along each axis.
pub fn jittered(balls: &[Ball], seed: u64, amount: f64) -> Vec<Ball> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    balls
        .iter()
        .map(|b| {
            Ball::new(
                b.x + rng.gen_range(-amount..amount),
                b.y + rng.gen_range(-amount..amount),
                b.z + rng.gen_range(-amount..amount),
                b.r,
            )
        })
        .collect()
}

pub fn to_xyzr(balls: &[Ball]) -> String {
    balls
        .iter()
        .map(|b| format!("{} {} {} {}\n", b.x, b.y, b.z, b.r))
        .collect()
}
