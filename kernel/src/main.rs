use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use replan_kernel::test_harness::{run_simulator, SimulatorConfig, TestHarness};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Command::new("replan-kernel")
        .version("0.1.0")
        .about("Service composition planning and repair kernel")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized planning simulator")
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Number of plan/knockout/repair rounds"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Run a stress test over a large catalog")
                .arg(
                    Arg::new("rounds")
                        .long("rounds")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of rounds"),
                )
                .arg(
                    Arg::new("tasks")
                        .long("tasks")
                        .default_value("200")
                        .value_parser(value_parser!(usize))
                        .help("Tasks per generated catalog"),
                ),
        )
        .subcommand(Command::new("certify").about("Run the simulator across multiple seeds"));

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let rounds = *args.get_one::<u64>("rounds").unwrap();
            let seed = *args.get_one::<u64>("seed").unwrap();
            let stop_on_violation = args.get_flag("stop-on-violation");
            let json = args.get_flag("json");

            let config = SimulatorConfig {
                seed,
                rounds,
                stop_on_first_violation: stop_on_violation,
                ..Default::default()
            };

            if !json {
                println!("Running planning simulator...");
                println!("Rounds: {}", rounds);
                println!("Seed: {}", seed);
                println!();
            }

            let report = run_simulator(config);

            if json {
                let summary = serde_json::json!({
                    "config": report.config,
                    "stats": report.stats,
                    "violations": report.violations.len(),
                    "passed": report.passed(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("stress", args)) => {
            let rounds = *args.get_one::<u64>("rounds").unwrap();
            let tasks = *args.get_one::<usize>("tasks").unwrap();

            println!("Running stress test...");
            println!("Rounds: {}", rounds);
            println!("Tasks per catalog: {}", tasks);
            println!();

            let report = TestHarness::run_stress_test(rounds, tasks);

            println!("Stress Test Report:");
            println!("  Rounds: {}", report.rounds);
            println!("  Tasks: {}", report.tasks);
            println!("  Violations: {}", report.violations);
            println!("  Success: {}", report.success);

            std::process::exit(if report.success { 0 } else { 1 });
        }
        Some(("certify", _)) => {
            println!("Running multi-seed certification...");
            println!();

            let report = TestHarness::run_certification();

            println!("Certification Report:");
            println!("  Seeds tested: {}", report.seeds_tested);
            println!("  Violations: {}", report.total_violations);
            println!("  Passed: {}", report.passed);

            std::process::exit(if report.passed { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}
