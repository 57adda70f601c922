use clap::Parser;
use paging_sim::config::Config;
use paging_sim::{report, run_experiment};
use std::process;

fn init_msg() {
    println!("demand paging replacement policy simulation");
}

fn main() {
    env_logger::init();
    init_msg();
    let config = Config::parse();
    config.display();
    if let Err(reason) = config.validate() {
        eprintln!("{}", reason);
        process::exit(1);
    }
    println!();

    match run_experiment(&config) {
        Ok(experiment) => print!("{}", report(&config, &experiment)),
        Err(e) => {
            eprintln!("simulation aborted: {}", e);
            process::exit(1);
        }
    }
}
