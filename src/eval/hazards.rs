use std::process;

use sim_lib::analyzer::report::Summary;
use sim_lib::cpu::CPUPolicy;
use sim_lib::error::SimulatorError;
use sim_lib::error::SimulatorResult;
use sim_lib::run_wrapper::run;

fn main() {
    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn csv_error(context: &str, e: csv::Error) -> SimulatorError {
    SimulatorError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, e),
    ))
}

fn run_eval() -> SimulatorResult<()> {
    let programs: Vec<String> = std::env::args().skip(1).collect();
    if programs.is_empty() {
        return Err(SimulatorError::ConfigError(
            "You should specify at least one ELF file".to_string(),
        ));
    }

    let output_path = "eval/hazard_eval.csv".to_string();
    let mut writer = csv::Writer::from_path(&output_path).map_err(|e| {
        csv_error(&format!("Failed to create CSV file '{}'", output_path), e)
    })?;

    writer
        .write_record([
            "Program",
            "Forwarding",
            "Instructions",
            "NOPs",
            "Data hazards (5)",
            "Data hazards (7)",
            "Data hazards (13)",
            "Control hazards (5)",
            "Control hazards (7)",
            "Control hazards (13)",
            "Branches",
            "Mispredictions (static)",
            "Mispredictions (saturating)",
            "Mispredictions (two level)",
            "Superscalar pairs",
        ])
        .map_err(|e| csv_error("Failed to write header to CSV", e))?;

    for program in &programs {
        eprintln!("Running program: {}", program);

        for forwarding in [false, true] {
            let policy = CPUPolicy { forwarding, ..Default::default() };
            match run(program, policy) {
                Ok(summary) => {
                    writer
                        .write_record(record(program, &summary))
                        .map_err(|e| {
                            csv_error("Failed to write record to CSV", e)
                        })?;
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to run program '{}': {}",
                        program, e
                    );
                    let mut row = vec![program.clone()];
                    row.extend((0..14).map(|_| "Error".to_string()));
                    writer.write_record(row).map_err(|e| {
                        csv_error("Failed to write record to CSV", e)
                    })?;
                }
            }
        }
    }

    Ok(())
}

fn record(program: &str, summary: &Summary) -> Vec<String> {
    let mut row = vec![
        program.to_string(),
        summary.forwarding.to_string(),
        summary.retired.to_string(),
        summary.nops.to_string(),
    ];
    row.extend(summary.data_hazards.iter().map(|count| count.to_string()));
    row.extend(summary.control_hazards.iter().map(|count| count.to_string()));
    row.push(summary.total_branches.to_string());
    row.push(summary.static_mispreds.to_string());
    row.push(summary.sat_mispreds.to_string());
    row.push(summary.two_lvl_mispreds.to_string());
    row.push(summary.super_pairs.to_string());
    row
}
