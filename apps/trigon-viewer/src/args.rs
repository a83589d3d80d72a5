//! Command-line flags.

use anyhow::{anyhow, bail, Context};
use trigon_app::AppConfig;

/// What the viewer was asked to do.
#[derive(Debug)]
pub enum Command {
    Help,
    Run(AppConfig),
}

fn value<I>(flag: &str, args: &mut I) -> anyhow::Result<String>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn number<I, T>(flag: &str, args: &mut I) -> anyhow::Result<T>
where
    I: Iterator<Item = String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value(flag, args)?;
    raw.parse()
        .with_context(|| format!("invalid value for {flag}: {raw:?}"))
}

/// Parse flags (without the program name) into a command.
pub fn parse_args<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut config = AppConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--width" => config.width = number(&arg, &mut args)?,
            "--height" => config.height = number(&arg, &mut args)?,
            "--title" => config.title = value(&arg, &mut args)?,
            "--validation" => config.validation = true,
            "--no-validation" => config.validation = false,
            "--vsync" => config.vsync = true,
            "--resizable" => config.resizable = true,
            "--frames-in-flight" => {
                let frames: usize = number(&arg, &mut args)?;
                if frames == 0 {
                    bail!("--frames-in-flight must be at least 1");
                }
                config.frames_in_flight = frames;
            }
            "--vert" => config.vertex_shader = Some(value(&arg, &mut args)?.into()),
            "--frag" => config.fragment_shader = Some(value(&arg, &mut args)?.into()),
            other => bail!("unknown option: {other}"),
        }
    }

    if config.width == 0 || config.height == 0 {
        bail!("window size must be non-zero");
    }

    Ok(Command::Run(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> anyhow::Result<Command> {
        parse_args(args.iter().map(|s| (*s).to_string()))
    }

    fn config(args: &[&str]) -> AppConfig {
        match parse(args).unwrap() {
            Command::Run(config) => config,
            Command::Help => panic!("expected run command"),
        }
    }

    #[test]
    fn no_flags_gives_defaults() {
        let config = config(&[]);
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.title, "Vulkan");
        assert!(!config.vsync);
    }

    #[test]
    fn flags_override_defaults() {
        let config = config(&[
            "--width",
            "1280",
            "--height",
            "720",
            "--title",
            "Triangle",
            "--no-validation",
            "--vsync",
            "--resizable",
            "--frames-in-flight",
            "2",
            "--vert",
            "shaders/vert.spv",
        ]);
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.title, "Triangle");
        assert!(!config.validation);
        assert!(config.vsync);
        assert!(config.resizable);
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.vertex_shader, Some(PathBuf::from("shaders/vert.spv")));
        assert_eq!(config.fragment_shader, None);
    }

    #[test]
    fn help_short_circuits() {
        assert!(matches!(parse(&["--width", "10", "-h"]).unwrap(), Command::Help));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse(&["--fullscreen"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown option: --fullscreen");
    }

    #[test]
    fn malformed_and_missing_values_are_rejected() {
        assert!(parse(&["--width", "wide"]).is_err());
        assert!(parse(&["--height"]).is_err());
        assert!(parse(&["--frames-in-flight", "0"]).is_err());
        assert!(parse(&["--width", "0"]).is_err());
    }
}
