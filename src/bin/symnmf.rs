//! Command-line frontend for the SymNMF pipeline.
//!
//! Reads a comma-delimited points file (one point per line) and prints the
//! requested matrix as comma-separated rows with 4 decimal digits:
//!
//! ```bash
//! symnmf sym points.txt            # Gaussian similarity matrix
//! symnmf ddg points.txt            # diagonal degree matrix
//! symnmf norm points.txt           # normalized similarity matrix
//! symnmf symnmf points.txt --k 3   # optimized factor H
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ndarray::Array2;

use symnmf::factorization::{initial_factor, optimize, FactorizationConfig};
use symnmf::{degree_matrix, normalized_similarity, similarity_matrix};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Goal {
    /// Print the Gaussian similarity matrix A.
    Sym,
    /// Print the diagonal degree matrix D.
    Ddg,
    /// Print the normalized similarity matrix W.
    Norm,
    /// Run the full factorization and print H.
    Symnmf,
}

#[derive(Parser)]
#[command(name = "symnmf", about = "Symmetric NMF clustering pipeline", version)]
struct Args {
    #[arg(value_enum)]
    goal: Goal,

    /// Comma-delimited points file, one point per line.
    file: PathBuf,

    /// Number of clusters (columns of H).
    #[arg(short, long, default_value_t = 2)]
    k: usize,

    /// Seed for the initial factor.
    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Iteration cap for the factorization.
    #[arg(long, default_value_t = 300)]
    max_iter: usize,

    /// Convergence threshold on the squared Frobenius step.
    #[arg(long, default_value_t = 1e-4)]
    eps: f64,

    /// Log per-iteration progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let points = read_points(&args.file)?;
    let a = similarity_matrix(&points)?;

    match args.goal {
        Goal::Sym => print_matrix(&a),
        Goal::Ddg => print_matrix(&degree_matrix(&a)),
        Goal::Norm => {
            let d = degree_matrix(&a);
            print_matrix(&normalized_similarity(&d, &a)?);
        }
        Goal::Symnmf => {
            let d = degree_matrix(&a);
            let w = normalized_similarity(&d, &a)?;
            let h0 = initial_factor(&w, args.k, args.seed)?;
            let cfg = FactorizationConfig {
                max_iter: args.max_iter,
                eps: args.eps,
            };
            let result = optimize(&h0, &w, &cfg)?;
            print_matrix(&result.h);
        }
    }

    Ok(())
}

fn read_points(path: &Path) -> Result<Array2<f64>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut width: Option<usize> = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|tok| {
                tok.trim()
                    .parse::<f64>()
                    .with_context(|| format!("line {}: invalid number {:?}", lineno + 1, tok))
            })
            .collect::<Result<Vec<f64>>>()?;
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                bail!(
                    "line {}: expected {} columns, found {}",
                    lineno + 1,
                    w,
                    row.len()
                );
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    let n = rows.len();
    let d = width.unwrap_or(0);
    if n == 0 || d == 0 {
        bail!("{}: no data points", path.display());
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n, d), flat)?)
}

/// 4 decimal digits, comma-separated, matching the reference output format.
fn print_matrix(m: &Array2<f64>) {
    for row in m.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:.4}")).collect();
        println!("{}", line.join(","));
    }
}
