//! Trigon triangle viewer
//!
//! Opens a window and draws a single triangle every frame.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p trigon-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--width <N>` / `--height <N>`: Window size (default: 800x600)
//! - `--title <TEXT>`: Window title (default: Vulkan)
//! - `--validation` / `--no-validation`: Force validation layers on or off
//! - `--vsync`: Always use FIFO presentation instead of mailbox
//! - `--resizable`: Allow the window to be resized
//! - `--frames-in-flight <N>`: Frames recorded ahead of the GPU (default: 1)
//! - `--vert <PATH>` / `--frag <PATH>`: Load SPIR-V shaders from disk
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;

use std::process::ExitCode;

use crate::args::{parse_args, Command};

fn main() -> ExitCode {
    let command = match parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e:#}");
            eprintln!("Run with --help for usage.");
            return ExitCode::FAILURE;
        }
    };

    let config = match command {
        Command::Help => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Command::Run(config) => config,
    };

    match trigon_app::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        "Trigon triangle viewer

USAGE:
    cargo run -p trigon-viewer -- [OPTIONS]

WINDOW OPTIONS:
    --width <N>             Window width in pixels (default: 800)
    --height <N>            Window height in pixels (default: 600)
    --title <TEXT>          Window title (default: Vulkan)
    --resizable             Allow the window to be resized

RENDERING OPTIONS:
    --validation            Enable Vulkan validation layers
    --no-validation         Disable Vulkan validation layers
                            Default: enabled in debug builds only
    --vsync                 Always present with FIFO (default: mailbox if available)
    --frames-in-flight <N>  Frames recorded ahead of the GPU (default: 1)
    --vert <PATH>           Vertex shader SPIR-V file (default: embedded)
    --frag <PATH>           Fragment shader SPIR-V file (default: embedded)

OTHER:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
