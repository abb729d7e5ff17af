// Copyright (c) 2026 rezky_nightky

mod config;
mod firework;
mod frame;
mod palette;
mod runtime;
mod scene;
mod scheduler;
mod terminal;

use std::env;
use std::fs;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossterm::event::{Event, KeyCode, KeyEventKind};
use rand::Rng;

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::config::{
    color_enabled_stdout, default_params_usage_for_help, print_list_shells, require_f64_range,
    require_u16_range, Args, ColorBg,
};
use crate::frame::Frame;
use crate::palette::Rgb;
use crate::runtime::ColorMode;
use crate::scene::Scene;
use crate::scheduler::Scheduler;
use crate::terminal::{restore_terminal_best_effort, Terminal};

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

fn build_info() -> &'static str {
    env!("SKYBURST_BUILD")
}

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn detect_color_mode_auto() -> ColorMode {
    let colorterm = env::var("COLORTERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }

    let term = env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }

    ColorMode::Color256
}

fn detect_color_mode(args: &Args) -> ColorMode {
    if let Some(m) = args.colormode {
        return match m {
            0 => ColorMode::Mono,
            8 => ColorMode::Color256,
            24 => ColorMode::TrueColor,
            _ => {
                eprintln!("invalid --colormode: {} (allowed: 0,8,24)", m);
                std::process::exit(1);
            }
        };
    }

    detect_color_mode_auto()
}

fn color_mode_label(m: ColorMode) -> &'static str {
    match m {
        ColorMode::TrueColor => "24-bit truecolor",
        ColorMode::Color256 => "8-bit (256-color)",
        ColorMode::Mono => "mono",
        ColorMode::Color16 => "16-color",
    }
}

/// Decodes the image off the tick loop and hands the palette back over a
/// channel; the loop picks it up between ticks. Until then the display
/// runs on the default palette.
fn spawn_palette_extractor(path: std::path::PathBuf) -> Receiver<Vec<Rgb>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let colors = match fs::read(&path) {
            Ok(bytes) => palette::extract_or_default(&bytes),
            Err(_) => palette::DEFAULT_COLORS.to_vec(),
        };
        let _ = tx.send(colors);
    });
    rx
}

fn main() -> std::io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    #[cfg(unix)]
    {
        if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            thread::spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    restore_terminal_best_effort();
                    std::process::exit(128 + sig);
                }
            });
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            restore_terminal_best_effort();
            std::process::exit(130);
        }) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }

    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    cmd = cmd.before_help(default_params_usage_for_help());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();

    let matches = cmd.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.list_shells {
        print_list_shells();
        return Ok(());
    }

    if args.check_bitcolor {
        let colorterm = env::var("COLORTERM").unwrap_or_default();
        let term = env::var("TERM").unwrap_or_default();
        let auto = detect_color_mode_auto();
        let effective = detect_color_mode(&args);

        println!("BITCOLOR CHECK:");
        println!(
            "  COLORTERM: {}",
            if colorterm.is_empty() {
                "(unset)"
            } else {
                &colorterm
            }
        );
        println!(
            "  TERM: {}",
            if term.is_empty() { "(unset)" } else { &term }
        );
        println!("  auto_detected: {}", color_mode_label(auto));
        if args.colormode.is_some() {
            println!("  forced: {}", color_mode_label(effective));
        }
        println!("  effective: {}", color_mode_label(effective));
        return Ok(());
    }

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    let color_mode = detect_color_mode(&args);
    let count = require_u16_range("--count", args.count, 5, 100);
    let target_fps = require_f64_range("--fps", args.fps, 1.0, 240.0);
    let duration_s = args.duration.map(|s| {
        if !s.is_finite() {
            eprintln!("failed to apply --duration {} (must be a finite number)", s);
            std::process::exit(1);
        }
        if s > 0.0 {
            return require_f64_range("--duration", s, 0.1, 86400.0);
        }
        s
    });

    let default_background = matches!(
        args.color_bg,
        ColorBg::DefaultBackground | ColorBg::Transparent
    );
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());

    let palette_rx = args.image.clone().map(spawn_palette_extractor);

    let mut term = Terminal::new()?;
    let (w, h) = term.size()?;

    let mut scene = Scene::new(
        color_mode,
        default_background,
        count as usize,
        !args.single_type,
        seed,
    );
    scene.reset(w, h);
    if let Some(msg) = &args.message {
        scene.set_message_border(!args.message_no_border);
        scene.set_message(msg);
    }

    let mut frame = Frame::new(w, h, scene.palette.bg);

    let start_time = Instant::now();
    let end_time = duration_s.and_then(|s| {
        if s <= 0.0 {
            return None;
        }
        Some(start_time + Duration::from_secs_f64(s))
    });

    let mut scheduler = Scheduler::new(target_fps);
    if !scheduler.start(start_time, w, h) {
        // Nothing to draw on; leave the terminal untouched.
        return Ok(());
    }

    while scheduler.is_running() {
        if end_time.is_some_and(|end| Instant::now() >= end) {
            scheduler.stop();
            break;
        }

        while Terminal::poll_event(Duration::from_millis(0))? {
            match Terminal::read_event()? {
                Event::Resize(nw, nh) => {
                    scheduler.queue_resize(Instant::now(), nw, nh);
                }
                Event::Key(k) if k.kind == KeyEventKind::Press => {
                    if args.screensaver {
                        scheduler.stop();
                        break;
                    }
                    match k.code {
                        KeyCode::Esc | KeyCode::Char('q') => scheduler.stop(),
                        KeyCode::Char(' ') => scene.reset(frame.width, frame.height),
                        KeyCode::Char('p') => scene.toggle_pause(),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        if !scheduler.is_running() {
            break;
        }

        let now = Instant::now();
        if let Some((nw, nh)) = scheduler.take_resize(now) {
            scene.reset(nw, nh);
            frame = Frame::new(nw, nh, scene.palette.bg);
        }

        if let Some(rx) = &palette_rx {
            if let Ok(colors) = rx.try_recv() {
                scene.set_palette(colors);
            }
        }

        if scheduler.tick_due(now) {
            scene.tick();
            scene.render(&mut frame, now);
            term.draw(&frame)?;
        }

        if let Some(deadline) = scheduler.next_deadline() {
            let now = Instant::now();
            if deadline > now {
                let mut timeout = deadline - now;
                if let Some(end) = end_time {
                    if now >= end {
                        continue;
                    }
                    timeout = timeout.min(end - now);
                }
                let _ = Terminal::poll_event(timeout)?;
            }
        }
    }

    Ok(())
}
