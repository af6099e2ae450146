use std::process;

use sim_lib::flags::MipsSimArgs;
use sim_lib::run_wrapper;

fn main() {
    let args = MipsSimArgs::from_env_or_exit();

    let elf_file = args.elf_file.to_string_lossy().into_owned();
    match run_wrapper::run(&elf_file, args.to_policy()) {
        Ok(summary) => summary.print(),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
