// Test harness module
// Randomized simulator and stress-test entry points

pub mod simulator;

pub use simulator::*;

/// Test harness for running stress tests over many seeds
pub struct TestHarness;

impl TestHarness {
    /// Run a stress test with the specified parameters
    pub fn run_stress_test(rounds: u64, tasks: usize) -> StressTestReport {
        let config = SimulatorConfig {
            seed: 12345,
            rounds,
            tasks,
            stop_on_first_violation: false,
            ..Default::default()
        };

        let report = run_simulator(config);

        StressTestReport {
            rounds,
            tasks,
            violations: report.violations.len(),
            success: report.passed(),
        }
    }

    /// Run the simulator across several seeds
    pub fn run_certification() -> CertificationReport {
        let mut all_passed = true;
        let mut total_violations = 0;

        for seed in 0..10 {
            let config = SimulatorConfig {
                seed,
                rounds: 500,
                ..Default::default()
            };

            let report = run_simulator(config);
            if !report.passed() {
                all_passed = false;
            }
            total_violations += report.violations.len();
        }

        CertificationReport {
            passed: all_passed && total_violations == 0,
            total_violations,
            seeds_tested: 10,
        }
    }
}

/// Report from a stress test
#[derive(Debug, Clone)]
pub struct StressTestReport {
    pub rounds: u64,
    pub tasks: usize,
    pub violations: usize,
    pub success: bool,
}

/// Report from a multi-seed run
#[derive(Debug, Clone)]
pub struct CertificationReport {
    pub passed: bool,
    pub total_violations: usize,
    pub seeds_tested: u64,
}
