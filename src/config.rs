// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;

use crate::firework::ShellType;

pub const DEFAULT_PARAMS_USAGE: &str = "DEFAULT PARAMS USAGE:\n  skyburst --count 50 --fps 60 --color-bg black --duration 0";

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn colorize_usage(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for chunk in text.split_inclusive('\n') {
        let (line, nl) = chunk
            .strip_suffix('\n')
            .map(|l| (l, "\n"))
            .unwrap_or((chunk, ""));

        let is_heading =
            !line.starts_with(' ') && line.ends_with(':') && line == line.to_ascii_uppercase();

        if is_heading {
            out.push_str("\x1b[1;36m");
            out.push_str(line);
            out.push_str("\x1b[0m");
        } else if let Some(rest) = line.strip_prefix("  skyburst") {
            out.push_str("  \x1b[1;34mskyburst\x1b[0m");
            out.push_str(rest);
        } else {
            out.push_str(line);
        }
        out.push_str(nl);
    }
    out
}

pub fn default_params_usage_for_help() -> String {
    if color_enabled_stdout() {
        colorize_usage(DEFAULT_PARAMS_USAGE)
    } else {
        DEFAULT_PARAMS_USAGE.to_string()
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBg {
    #[value(name = "black")]
    Black,
    #[value(name = "default-background")]
    DefaultBackground,
    #[value(name = "transparent")]
    Transparent,
}

pub fn require_f64_range(name: &str, v: f64, min: f64, max: f64) -> f64 {
    if !v.is_finite() {
        eprintln!("failed to apply {} {} (must be a finite number)", name, v);
        std::process::exit(1);
    }
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

pub fn require_u16_range(name: &str, v: u16, min: u16, max: u16) -> u16 {
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

#[derive(Parser, Debug, Clone)]
#[command(name = "skyburst", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 'm',
        long = "message",
        help_heading = "GENERAL",
        help = "Message revealed over the display"
    )]
    pub message: Option<String>,

    #[arg(
        long = "message-no-border",
        help_heading = "GENERAL",
        help = "Draw message box without border (use with --message)"
    )]
    pub message_no_border: bool,

    #[arg(
        short = 'I',
        long = "image",
        help_heading = "GENERAL",
        help = "Image file whose dominant colors become the firework palette"
    )]
    pub image: Option<PathBuf>,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        short = 's',
        long = "screensaver",
        help_heading = "GENERAL",
        help = "Screensaver mode (exit on keypress)"
    )]
    pub screensaver: bool,

    #[arg(
        short = 'n',
        long = "count",
        default_value_t = 50,
        help_heading = "ENGINE",
        help = "Max fireworks in flight at once (min 5 max 100)"
    )]
    pub count: u16,

    #[arg(
        long = "single-type",
        help_heading = "ENGINE",
        help = "Launch only peony shells (disable the willow/chrysanthemum mix)"
    )]
    pub single_type: bool,

    #[arg(
        long = "seed",
        help_heading = "ENGINE",
        help = "Random seed for a reproducible display"
    )]
    pub seed: Option<u64>,

    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60.0,
        help_heading = "PERFORMANCE",
        help = "Target FPS (min 1 max 240)"
    )]
    pub fps: f64,

    #[arg(
        long = "color-bg",
        default_value_t = ColorBg::Black,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Background mode (black, default-background, transparent)"
    )]
    pub color_bg: ColorBg,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0,8,24). Default: 24-bit if supported (COLORTERM), else 8-bit (TERM=...256color)"
    )]
    pub colormode: Option<u16>,

    #[arg(
        long = "check-bitcolor",
        help_heading = "HELP",
        help = "Print detected terminal color capability and exit"
    )]
    pub check_bitcolor: bool,

    #[arg(
        long = "list-shells",
        help_heading = "HELP",
        help = "List firework shell types and exit"
    )]
    pub list_shells: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

pub fn print_list_shells() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mSHELL TYPES:\x1b[0m");
    } else {
        println!("SHELL TYPES:");
    }
    println!();
    println!("VALUE          DESCRIPTION");
    for shell in ShellType::ALL {
        let p = shell.physics();
        let desc = match shell {
            ShellType::Peony => "tight radial burst, quick fade",
            ShellType::Willow => "drooping arcs with long falling trails",
            ShellType::Chrysanthemum => "dense burst plus a secondary upward scatter",
        };
        println!("{:<14} {} ({} particles)", shell.label(), desc, p.burst_count);
    }
    println!();
    println!("All three are mixed by default; --single-type pins peony.");
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Args;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
