use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use log::info;

use level_painter::app::{build_model, print_final_state, replay_session, session_palette};
use level_painter::{ConflictPolicy, LevelPainter, PainterSettings, SessionDescription};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read session {}", options.path))?;
    let session = SessionDescription::from_xml(&xml).context("failed to parse session XML")?;

    println!(
        "Loaded session with {} surface(s), {} template(s)",
        session.surfaces.len(),
        session.templates.len()
    );
    for template in &session.templates {
        println!(" - {} ({} part(s))", template.id, template.parts.len());
    }

    let mut settings = match &options.settings {
        Some(path) => PainterSettings::load(path)?,
        None => PainterSettings::default(),
    };
    if let Some(policy) = options.policy {
        settings.conflict_policy = policy;
    }
    if options.no_snap {
        settings.snap_to_existing = false;
    }
    info!("painter settings: {settings:?}");

    let model = build_model(&session);
    let mut painter = match options.seed {
        Some(seed) => LevelPainter::seeded(model.clone(), settings, seed),
        None => LevelPainter::new(model.clone(), settings),
    };
    painter.add_palette(session_palette(&session));

    let report = replay_session(&mut painter, &session.script);
    println!(
        "Replayed {} event(s) ({} skipped)",
        report.events, report.skipped
    );

    if let Some(path) = &options.save_palette {
        let palette = painter
            .palette()
            .ok_or_else(|| anyhow!("no palette is active"))?;
        palette.save(path)?;
        println!("Saved palette {} to {path}", palette.id());
    }

    print_final_state(&model);
    Ok(())
}

struct CliOptions {
    path: String,
    settings: Option<String>,
    seed: Option<u64>,
    policy: Option<ConflictPolicy>,
    no_snap: bool,
    save_palette: Option<String>,
}

const USAGE: &str = "Usage: level-painter <session.xml> [--settings <file>] [--seed <n>] \
                     [--policy replace|stack] [--no-snap] [--save-palette <file>]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            path,
            settings: None,
            seed: None,
            policy: None,
            no_snap: false,
            save_palette: None,
        };
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--settings" => options.settings = Some(value("--settings")?),
                "--seed" => {
                    let seed = value("--seed")?;
                    options.seed = Some(
                        seed.parse()
                            .with_context(|| format!("invalid seed `{seed}`"))?,
                    );
                }
                "--policy" => {
                    let name = value("--policy")?;
                    options.policy = Some(
                        ConflictPolicy::from_name(&name)
                            .ok_or_else(|| anyhow!("unknown conflict policy `{name}`"))?,
                    );
                }
                "--no-snap" => options.no_snap = true,
                "--save-palette" => options.save_palette = Some(value("--save-palette")?),
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}
