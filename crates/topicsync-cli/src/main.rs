//! # topicsync CLI
//!
//! Command-line utilities for checking topic names and topic settings.

use anyhow::{Context, Result};
use std::env;
use topicsync_core::{resolve, sensor_topic, TopicPolicy};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "resolve" => {
            if args.len() < 4 {
                eprintln!("Usage: topicsync resolve <id> <owner>");
                std::process::exit(1);
            }
            let id: u64 = args[2]
                .parse()
                .with_context(|| format!("Invalid entity id: '{}'", args[2]))?;
            println!("{}", resolve(id, &args[3]));
        }
        "sensor" => {
            if args.len() < 5 {
                eprintln!("Usage: topicsync sensor <company> <system> <sensor>");
                std::process::exit(1);
            }
            let topic = sensor_topic(&args[2], &args[3], &args[4]);
            if topic.is_empty() {
                eprintln!("Topic identifier is empty after sanitization");
                std::process::exit(1);
            }
            println!("{topic}");
        }
        "config" => {
            let mut policy = TopicPolicy::default();
            if let Some(months) = args.get(2) {
                policy.retention_months = months
                    .parse()
                    .with_context(|| format!("Invalid retention months: '{months}'"))?;
            }
            let config = policy.topic_config();
            println!("{}", serde_json::to_string_pretty(&config)?);
            for (key, value) in config.entries() {
                println!("--config {key}={value}");
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"topicsync CLI

USAGE:
    topicsync <COMMAND> [OPTIONS]

COMMANDS:
    resolve <id> <owner>                Print the channel topic of an entity
    sensor <company> <system> <sensor>  Print a sensor topic
    config [months]                     Print the settings applied to new topics
    help                                Show this help message

EXAMPLES:
    topicsync resolve 42 acme
    topicsync sensor "Acme Corp" mill temp
    topicsync config 12
"#
    );
}
