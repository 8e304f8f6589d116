//! Runs all four solvers on the same small problem.
//!
//! Solves:
//!   maximize    x + y
//!   subject to  x <= 1, y <= 1, x >= 0, y >= 0
//!
//! Optimal solution: x = 1, y = 1, objective = 2.

use lp_core::central_path::CentralPathOptions;
use lp_core::ipm::IpmOptions;
use lp_core::pdhg::PdhgOptions;
use lp_core::simplex::SimplexOptions;
use lp_core::{solve, Line, SolverOptions, SolverOutput};

fn main() {
    env_logger::init();

    // Unit square as `ax + by <= c` rows.
    let lines: Vec<Line> = vec![
        [1.0, 0.0, 1.0],
        [0.0, 1.0, 1.0],
        [-1.0, 0.0, 0.0],
        [0.0, -1.0, 0.0],
    ];
    let objective = vec![1.0, 1.0];

    let methods = [
        ("simplex", SolverOptions::Simplex(SimplexOptions::default())),
        (
            "interior point",
            SolverOptions::InteriorPoint(IpmOptions::default()),
        ),
        ("pdhg", SolverOptions::Pdhg(PdhgOptions::default())),
        (
            "central path",
            SolverOptions::CentralPath(CentralPathOptions::default()),
        ),
    ];

    for (name, options) in methods {
        println!("=== {name} ===");
        match solve(&lines, &objective, &options) {
            Ok(output) => report(&output),
            Err(e) => println!("solve failed: {e}"),
        }
        println!();
    }
}

fn report(output: &SolverOutput) {
    match output {
        SolverOutput::Simplex(r) => {
            let x = r.solution();
            println!("x = ({:.6}, {:.6})", x[0], x[1]);
            println!("objective = {:.6}", r.objective);
            println!(
                "pivots: {} phase 1, {} total",
                r.phase1_pivots,
                r.iterates.len() - 1
            );
        }
        SolverOutput::InteriorPoint(r) => {
            let x = r.solution();
            println!("x = ({:.6}, {:.6})", x[0], x[1]);
            println!("objective = {:.6}", r.objective);
            println!("converged: {} in {} iterations", r.converged, r.steps.len());
        }
        SolverOutput::Pdhg(r) => {
            let x = r.solution();
            println!("x = ({:.6}, {:.6})", x[0], x[1]);
            println!("objective = {:.6}", r.objective);
            println!("converged: {} in {} iterations", r.converged, r.iterates.len() - 1);
        }
        SolverOutput::CentralPath(r) => {
            let x = r.solution();
            println!("x = ({:.6}, {:.6})", x[0], x[1]);
            println!("objective = {:.6}", r.objective);
            println!("barrier weights: {} down to {:.1e}", r.mus.len(), r.mus.last().unwrap());
        }
    }
}
