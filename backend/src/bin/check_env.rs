//! Validate the process environment before deploying.
//!
//! Prints the validated keys, or the missing ones and exits with status 1.

use std::process::ExitCode;

use dreamers::config::{EnvConfig, ENABLE_DEBUG_ENDPOINTS, REQUIRED_ENV_KEYS};

fn main() -> ExitCode {
    match EnvConfig::from_env() {
        Ok(config) => {
            println!("Environment variables validated:");
            for key in REQUIRED_ENV_KEYS {
                println!("  - {}", key);
            }
            println!(
                "  - {}={}",
                ENABLE_DEBUG_ENDPOINTS, config.enable_debug_endpoints
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Missing or invalid environment variables:");
            for key in &e.missing_keys {
                eprintln!("  - {}", key);
            }
            ExitCode::FAILURE
        }
    }
}
