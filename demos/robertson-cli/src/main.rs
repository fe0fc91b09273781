use anyhow::Context;
use clap::Parser;
use daesolve::ode_solver::test_models::robertson::robertson;
use daesolve::ode_solver::{Bdf, OdeSolverMethod};

#[derive(Parser)]
#[command(name = "robertson-cli", version, about, long_about = None)]
struct Cli {
    /// Final integration time.
    #[arg(short = 't', long, default_value_t = 4.0e6)]
    t1: f64,

    /// Print the state after every accepted step instead of just the end.
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let problem = robertson();
    let mut solver: Bdf<_> = Bdf::new();
    solver.set_problem(problem);

    if cli.trace {
        solver.set_observer(|x, t| {
            println!("t = {t:.6e}  x = [{:.6e}, {:.6e}, {:.6e}]", x[0], x[1], x[2]);
        });
    }

    solver
        .solve(cli.t1)
        .context("integration failed before reaching t1")?;

    let x = solver.state();
    println!("t = {:.6e}", solver.t());
    println!("x = [{:.6e}, {:.6e}, {:.6e}]", x[0], x[1], x[2]);
    println!("conservation residual = {:.3e}", (x[0] + x[1] + x[2] - 1.0).abs());

    let stats = solver.statistics();
    println!(
        "steps = {}, rejected = {}, newton iterations = {}, jacobian evals = {}",
        stats.number_of_steps,
        stats.number_of_rejected_steps,
        stats.number_of_newton_iterations,
        stats.number_of_jacobian_evals,
    );

    Ok(())
}
